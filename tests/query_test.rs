use chrono::NaiveDate;
use lessons_api::db;
use lessons_api::filter::{LessonFilterParams, LessonQuery, PageLimits};

const LIMITS: PageLimits = PageLimits {
    default_size: 5,
    max_size: 100,
};

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

async fn insert_lesson(
    pool: &sqlx::SqlitePool,
    teacher_id: i64,
    date: &str,
    title: &str,
    status: i64,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO lessons (teacher_id, date, title, status) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(teacher_id)
    .bind(date)
    .bind(title)
    .bind(status)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn add_visits(pool: &sqlx::SqlitePool, lesson_id: i64, count: usize) {
    for _ in 0..count {
        sqlx::query("INSERT INTO visits (lesson_id) VALUES (?)")
            .bind(lesson_id)
            .execute(pool)
            .await
            .unwrap();
    }
}

async fn run(pool: &sqlx::SqlitePool, params: LessonFilterParams) -> Vec<lessons_api::model::LessonSummary> {
    let query = LessonQuery::build(&params, LIMITS).unwrap();
    db::fetch_lessons(pool, &query).await.unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn unfiltered_listing_is_date_ordered_first_page() {
    let pool = setup_pool().await;
    for (day, title) in [
        ("2024-03-05", "c"),
        ("2024-03-01", "a"),
        ("2024-03-03", "b"),
        ("2024-03-09", "e"),
        ("2024-03-07", "d"),
        ("2024-03-11", "f"),
    ] {
        insert_lesson(&pool, 1, day, title, 0).await;
    }

    let lessons = run(&pool, LessonFilterParams::default()).await;
    // default page size is 5, ascending by date
    assert_eq!(lessons.len(), 5);
    let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn zero_visit_lessons_appear_with_count_zero() {
    let pool = setup_pool().await;
    let visited = insert_lesson(&pool, 1, "2024-03-01", "visited", 0).await;
    insert_lesson(&pool, 1, "2024-03-02", "empty", 0).await;
    add_visits(&pool, visited, 2).await;

    let lessons = run(&pool, LessonFilterParams::default()).await;
    assert_eq!(lessons.len(), 2);
    assert_eq!(lessons[0].visit_count, 2);
    assert_eq!(lessons[1].visit_count, 0);
    assert!(lessons.iter().all(|l| l.students.is_empty() && l.teachers.is_empty()));
}

#[tokio::test]
async fn date_equality_filter() {
    let pool = setup_pool().await;
    insert_lesson(&pool, 1, "2024-03-01", "match", 0).await;
    insert_lesson(&pool, 1, "2024-03-02", "other", 0).await;

    let lessons = run(
        &pool,
        LessonFilterParams {
            date: Some("2024-03-01".into()),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].date, date("2024-03-01"));
}

#[tokio::test]
async fn date_range_filter_is_inclusive() {
    let pool = setup_pool().await;
    insert_lesson(&pool, 1, "2024-02-29", "before", 0).await;
    insert_lesson(&pool, 1, "2024-03-01", "lower", 0).await;
    insert_lesson(&pool, 1, "2024-03-15", "inside", 0).await;
    insert_lesson(&pool, 1, "2024-03-31", "upper", 0).await;
    insert_lesson(&pool, 1, "2024-04-01", "after", 0).await;

    let lessons = run(
        &pool,
        LessonFilterParams {
            date: Some("2024-03-01,2024-03-31".into()),
            ..Default::default()
        },
    )
    .await;
    let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["lower", "inside", "upper"]);
}

#[tokio::test]
async fn status_filter() {
    let pool = setup_pool().await;
    insert_lesson(&pool, 1, "2024-03-01", "draft", 0).await;
    insert_lesson(&pool, 1, "2024-03-02", "published", 1).await;

    let lessons = run(
        &pool,
        LessonFilterParams {
            status: Some("1".into()),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].title, "published");
}

#[tokio::test]
async fn teacher_ids_membership_filter() {
    let pool = setup_pool().await;
    insert_lesson(&pool, 7, "2024-03-01", "by-7", 0).await;
    insert_lesson(&pool, 3, "2024-03-02", "by-3", 0).await;
    insert_lesson(&pool, 9, "2024-03-03", "by-9", 0).await;

    let lessons = run(
        &pool,
        LessonFilterParams {
            teacher_ids: Some("7,9".into()),
            ..Default::default()
        },
    )
    .await;
    let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["by-7", "by-9"]);
}

#[tokio::test]
async fn students_count_filters_on_aggregate() {
    let pool = setup_pool().await;
    let two = insert_lesson(&pool, 1, "2024-03-01", "two", 0).await;
    let four = insert_lesson(&pool, 1, "2024-03-02", "four", 0).await;
    insert_lesson(&pool, 1, "2024-03-03", "none", 0).await;
    add_visits(&pool, two, 2).await;
    add_visits(&pool, four, 4).await;

    let exact = run(
        &pool,
        LessonFilterParams {
            students_count: Some("2".into()),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].title, "two");

    let zero = run(
        &pool,
        LessonFilterParams {
            students_count: Some("0".into()),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(zero.len(), 1);
    assert_eq!(zero[0].title, "none");

    let ranged = run(
        &pool,
        LessonFilterParams {
            students_count: Some("1,4".into()),
            ..Default::default()
        },
    )
    .await;
    let titles: Vec<&str> = ranged.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["two", "four"]);
}

#[tokio::test]
async fn pagination_second_page() {
    let pool = setup_pool().await;
    for day in 1..=7 {
        insert_lesson(&pool, 1, &format!("2024-03-{day:02}"), &format!("l{day}"), 0).await;
    }

    let lessons = run(
        &pool,
        LessonFilterParams {
            page: Some("2".into()),
            lessons_per_page: Some("3".into()),
            ..Default::default()
        },
    )
    .await;
    let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["l4", "l5", "l6"]);
}

#[tokio::test]
async fn combined_filters_conjoin() {
    let pool = setup_pool().await;
    let hit = insert_lesson(&pool, 7, "2024-03-01", "hit", 1).await;
    insert_lesson(&pool, 7, "2024-03-01", "wrong-status", 0).await;
    insert_lesson(&pool, 2, "2024-03-01", "wrong-teacher", 1).await;
    add_visits(&pool, hit, 1).await;

    let lessons = run(
        &pool,
        LessonFilterParams {
            date: Some("2024-03-01".into()),
            status: Some("1".into()),
            teacher_ids: Some("7".into()),
            students_count: Some("1".into()),
            ..Default::default()
        },
    )
    .await;
    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].title, "hit");
}
