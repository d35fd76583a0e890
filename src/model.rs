use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reference to a student attached to a lesson. The query path does not
/// populate these yet; the field is reserved for relational expansion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentRef {
    pub id: i64,
}

/// Reference to a teacher attached to a lesson. Reserved, same as
/// [`StudentRef`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeacherRef {
    pub id: i64,
}

/// One row of the lesson listing: a lesson joined with its visit count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: i64,
    pub date: NaiveDate,
    pub title: String,
    pub status: i64,
    pub visit_count: i64,
    pub students: Vec<StudentRef>,
    pub teachers: Vec<TeacherRef>,
}

/// An unpersisted lesson produced by recurrence generation. Persistence is
/// a separate write path, not part of this service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    pub teacher_ids: Vec<i64>,
    pub title: String,
    pub date: NaiveDate,
}
