//! Recurrence rule validation and lesson draft generation.
//!
//! A recurrence rule names the weekdays a lesson repeats on, the first date
//! of the series, and at most one end bound (an occurrence count or a last
//! date). Validation is fail-fast with a field-specific message; generation
//! walks the calendar one day at a time and is fully deterministic.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Limits;
use crate::model::LessonDraft;

const MIN_LESSONS_COUNT: i64 = 1;
const MAX_LESSONS_COUNT: i64 = 300;
const MAX_LAST_DATE_DAYS: i64 = 365;

static DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date shape regex"));

/// Incoming recurrence body. Every field is optional at the wire level so
/// that a missing field maps to its own validation message instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRequest {
    pub teacher_ids: Option<Vec<i64>>,
    pub title: Option<String>,
    pub days: Option<Vec<i64>>,
    pub first_date: Option<String>,
    pub lessons_count: Option<i64>,
    pub last_date: Option<String>,
}

/// A request field that failed validation. Messages are the exact client
/// facing text; the offending field is always named.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid teacherIds")]
    TeacherIds,
    #[error("Invalid title")]
    Title,
    #[error("Invalid days")]
    Days,
    #[error("Invalid firstDate")]
    FirstDate,
    #[error("lessonsCount and lastDate are mutually exclusive")]
    ExclusiveBounds,
    #[error("lessonsCount should be between 1 and 300")]
    LessonsCountRange,
    #[error("Invalid lastDate")]
    LastDate,
}

/// How the series ends. `Unbounded` is permitted but generation then runs
/// under the implicit caps from [`GenerationCaps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Count(i64),
    Until(NaiveDate),
    Unbounded,
}

/// A validated recurrence rule. Construction goes through [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSpec {
    teacher_ids: Vec<i64>,
    title: String,
    /// Weekdays as days-from-Sunday (0 = Sunday .. 6 = Saturday).
    days: Vec<u32>,
    first_date: NaiveDate,
    bound: Bound,
}

/// Caps applied when the rule carries no end bound of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationCaps {
    pub max_occurrences: usize,
    pub max_window_days: i64,
}

impl Default for GenerationCaps {
    fn default() -> Self {
        Self {
            max_occurrences: MAX_LESSONS_COUNT as usize,
            max_window_days: MAX_LAST_DATE_DAYS,
        }
    }
}

impl From<&Limits> for GenerationCaps {
    fn from(limits: &Limits) -> Self {
        Self {
            max_occurrences: limits.max_occurrences,
            max_window_days: limits.max_window_days,
        }
    }
}

/// Validate a raw request into a [`RecurrenceSpec`].
///
/// Checks run in a fixed order and stop at the first failure:
/// teacherIds, title, days, firstDate, bound exclusivity, lessonsCount
/// range, lastDate validity and window.
pub fn validate(req: &RecurrenceRequest) -> Result<RecurrenceSpec, ValidationError> {
    let teacher_ids = match req.teacher_ids.as_deref() {
        Some(ids) if !ids.is_empty() => ids.to_vec(),
        _ => return Err(ValidationError::TeacherIds),
    };

    let title = match req.title.as_deref() {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => return Err(ValidationError::Title),
    };

    let days = match req.days.as_deref() {
        Some(days) if !days.is_empty() && days.iter().all(|&d| (0..=6).contains(&d)) => {
            days.iter().map(|&d| d as u32).collect::<Vec<u32>>()
        }
        _ => return Err(ValidationError::Days),
    };

    let first_date = parse_date(req.first_date.as_deref()).ok_or(ValidationError::FirstDate)?;

    let bound = match (req.lessons_count, req.last_date.as_deref()) {
        (Some(_), Some(_)) => return Err(ValidationError::ExclusiveBounds),
        (Some(count), None) => {
            if !(MIN_LESSONS_COUNT..=MAX_LESSONS_COUNT).contains(&count) {
                return Err(ValidationError::LessonsCountRange);
            }
            Bound::Count(count)
        }
        (None, Some(raw)) => {
            let last_date = parse_date(Some(raw)).ok_or(ValidationError::LastDate)?;
            // Fixed 365-day window, not calendar-year-aware.
            if (last_date - first_date).num_days() > MAX_LAST_DATE_DAYS {
                return Err(ValidationError::LastDate);
            }
            Bound::Until(last_date)
        }
        (None, None) => Bound::Unbounded,
    };

    Ok(RecurrenceSpec {
        teacher_ids,
        title,
        days,
        first_date,
        bound,
    })
}

/// Enumerate the drafts a spec denotes, in ascending date order.
///
/// Walks forward one day at a time from `first_date` inclusive, emitting a
/// draft whenever the weekday matches. A `Count` bound stops after that many
/// drafts; an `Until` bound stops past the last date; an unbounded rule
/// stops at whichever cap in `caps` is hit first.
pub fn generate(spec: &RecurrenceSpec, caps: GenerationCaps) -> Vec<LessonDraft> {
    let mut drafts = Vec::new();
    let mut date = spec.first_date;

    loop {
        let done = match spec.bound {
            Bound::Count(count) => drafts.len() as i64 >= count,
            Bound::Until(last_date) => date > last_date,
            Bound::Unbounded => {
                drafts.len() >= caps.max_occurrences
                    || (date - spec.first_date).num_days() > caps.max_window_days
            }
        };
        if done {
            break;
        }

        if spec.days.contains(&date.weekday().num_days_from_sunday()) {
            drafts.push(LessonDraft {
                teacher_ids: spec.teacher_ids.clone(),
                title: spec.title.clone(),
                date,
            });
        }

        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    drafts
}

/// A date is valid only if it matches the `YYYY-MM-DD` shape and denotes a
/// real calendar day.
fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    if !DATE_SHAPE.is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
