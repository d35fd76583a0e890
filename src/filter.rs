//! Dynamic filter and pagination assembly for the lesson query path.
//!
//! Incoming filters are loose strings from the query string. They are
//! normalized into typed [`Predicate`]s that render to `?` placeholders with
//! an ordered bind list, so raw values never reach the SQL text.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Limits;

/// Raw query-string inputs, all optional and string-typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonFilterParams {
    pub date: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "teacherIds")]
    pub teacher_ids: Option<String>,
    #[serde(rename = "studentsCount")]
    pub students_count: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "lessonsPerPage")]
    pub lessons_per_page: Option<String>,
}

/// A filter input that does not fit its expected shape. Reported to the
/// client as a generic internal failure; the detail only goes to the log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("malformed date in filter: {0:?}")]
    BadDate(String),
    #[error("malformed integer in filter: {0:?}")]
    BadInt(String),
}

/// A value destined for a bound placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Int(i64),
    Date(NaiveDate),
}

/// A single conjunct of the filter. `column` is always a fixed expression
/// over the known schema, never derived from input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals {
        column: &'static str,
        value: BindValue,
    },
    /// Inclusive on both ends, BETWEEN semantics.
    Range {
        column: &'static str,
        lower: BindValue,
        upper: BindValue,
    },
    /// Membership test with one placeholder per value, input order preserved.
    In {
        column: &'static str,
        values: Vec<BindValue>,
    },
}

impl Predicate {
    /// Renders the predicate as SQL, appending its values to `params` in
    /// placeholder order.
    fn render(&self, params: &mut Vec<BindValue>) -> String {
        match self {
            Predicate::Equals { column, value } => {
                params.push(value.clone());
                format!("{column} = ?")
            }
            Predicate::Range {
                column,
                lower,
                upper,
            } => {
                params.push(lower.clone());
                params.push(upper.clone());
                format!("{column} BETWEEN ? AND ?")
            }
            Predicate::In { column, values } => {
                let placeholders = vec!["?"; values.len()].join(", ");
                params.extend(values.iter().cloned());
                format!("{column} IN ({placeholders})")
            }
        }
    }
}

/// The bounded result window computed from `page`/`lessonsPerPage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub offset: i64,
}

/// Pagination guard rails, taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: i64,
    pub max_size: i64,
}

impl From<&Limits> for PageLimits {
    fn from(limits: &Limits) -> Self {
        Self {
            default_size: limits.default_page_size,
            max_size: limits.max_page_size,
        }
    }
}

/// The fully built lesson query: conjunctive predicates split by
/// aggregation stage, plus the result window.
///
/// Row predicates land in the WHERE clause; aggregate predicates (the visit
/// count filter) land in HAVING, after the per-lesson GROUP BY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonQuery {
    pub row_predicates: Vec<Predicate>,
    pub aggregate_predicates: Vec<Predicate>,
    pub window: PageWindow,
}

impl LessonQuery {
    /// Normalize raw filter inputs into a query.
    ///
    /// Absent filters contribute nothing; an empty or whitespace-only value
    /// counts as absent. A `date` or `studentsCount` value with a comma
    /// count other than zero or one is silently ignored; a token that fails
    /// to parse is a [`FilterError`].
    pub fn build(params: &LessonFilterParams, limits: PageLimits) -> Result<Self, FilterError> {
        let mut row_predicates = Vec::new();
        let mut aggregate_predicates = Vec::new();

        if let Some(raw) = present(params.date.as_deref()) {
            let parts: Vec<&str> = raw.split(',').collect();
            match parts.as_slice() {
                [single] => row_predicates.push(Predicate::Equals {
                    column: "lessons.date",
                    value: BindValue::Date(parse_date(single)?),
                }),
                [lower, upper] => row_predicates.push(Predicate::Range {
                    column: "lessons.date",
                    lower: BindValue::Date(parse_date(lower)?),
                    upper: BindValue::Date(parse_date(upper)?),
                }),
                _ => {}
            }
        }

        if let Some(raw) = present(params.status.as_deref()) {
            row_predicates.push(Predicate::Equals {
                column: "lessons.status",
                value: BindValue::Int(parse_int(raw)?),
            });
        }

        if let Some(raw) = present(params.teacher_ids.as_deref()) {
            let values = raw
                .split(',')
                .map(|token| parse_int(token).map(BindValue::Int))
                .collect::<Result<Vec<_>, _>>()?;
            row_predicates.push(Predicate::In {
                column: "lessons.teacher_id",
                values,
            });
        }

        if let Some(raw) = present(params.students_count.as_deref()) {
            let parts: Vec<&str> = raw.split(',').collect();
            match parts.as_slice() {
                [single] => aggregate_predicates.push(Predicate::Equals {
                    column: "COUNT(visits.id)",
                    value: BindValue::Int(parse_int(single)?),
                }),
                [lower, upper] => aggregate_predicates.push(Predicate::Range {
                    column: "COUNT(visits.id)",
                    lower: BindValue::Int(parse_int(lower)?),
                    upper: BindValue::Int(parse_int(upper)?),
                }),
                _ => {}
            }
        }

        Ok(Self {
            row_predicates,
            aggregate_predicates,
            window: page_window(
                params.page.as_deref(),
                params.lessons_per_page.as_deref(),
                limits,
            ),
        })
    }

    /// Render to SQL text plus the ordered bind list. The window's limit and
    /// offset are always the final two parameters.
    pub fn to_sql(&self) -> (String, Vec<BindValue>) {
        let mut params = Vec::new();
        let mut sql = String::from(
            "SELECT lessons.id, lessons.date, lessons.title, lessons.status, \
             COUNT(visits.id) AS visit_count \
             FROM lessons LEFT JOIN visits ON lessons.id = visits.lesson_id",
        );

        if !self.row_predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_conjunction(&self.row_predicates, &mut params));
        }
        sql.push_str(" GROUP BY lessons.id");
        if !self.aggregate_predicates.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&render_conjunction(&self.aggregate_predicates, &mut params));
        }
        sql.push_str(" ORDER BY lessons.date LIMIT ? OFFSET ?");
        params.push(BindValue::Int(self.window.limit));
        params.push(BindValue::Int(self.window.offset));

        (sql, params)
    }
}

fn render_conjunction(predicates: &[Predicate], params: &mut Vec<BindValue>) -> String {
    predicates
        .iter()
        .map(|p| p.render(params))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Values that are missing, non-numeric, or below 1 fall back to the
/// defaults (page 1, configured default size); the size is capped. A page
/// number large enough to overflow the offset also falls back to page 1.
fn page_window(page: Option<&str>, per_page: Option<&str>, limits: PageLimits) -> PageWindow {
    let page = page
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(1);
    let size = per_page
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(limits.default_size)
        .min(limits.max_size);
    PageWindow {
        limit: size,
        offset: (page - 1).checked_mul(size).unwrap_or(0),
    }
}

/// A supplied-but-empty value counts as an absent filter, so `?date=`
/// behaves like no `date` parameter at all.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| FilterError::BadDate(raw.to_string()))
}

fn parse_int(raw: &str) -> Result<i64, FilterError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| FilterError::BadInt(raw.to_string()))
}
