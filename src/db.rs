use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::filter::{BindValue, LessonQuery};
use crate::model::LessonSummary;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/` and make sure the
/// parent directory exists. Non-sqlite and in-memory URLs pass through.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = url["sqlite:".len()..].trim_start_matches("//");
    let (path_part, query_part) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded}");
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Execute a built lesson query and shape the rows into summaries.
#[instrument(skip_all)]
pub async fn fetch_lessons(pool: &Pool, query: &LessonQuery) -> Result<Vec<LessonSummary>> {
    let (sql, binds) = query.to_sql();
    let mut prepared = sqlx::query(&sql);
    for bind in binds {
        prepared = match bind {
            BindValue::Int(value) => prepared.bind(value),
            BindValue::Date(value) => prepared.bind(value),
        };
    }
    let rows = prepared.fetch_all(pool).await?;
    rows.iter().map(map_lesson_row).collect()
}

fn map_lesson_row(row: &SqliteRow) -> Result<LessonSummary> {
    Ok(LessonSummary {
        id: row.try_get("id")?,
        date: row.try_get("date")?,
        title: row.try_get("title")?,
        status: row.try_get("status")?,
        visit_count: row.try_get("visit_count")?,
        // Reserved: relational population happens in a later expansion.
        students: Vec::new(),
        teachers: Vec::new(),
    })
}
