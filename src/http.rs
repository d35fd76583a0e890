//! HTTP surface: shared state, router, handlers, and API error mapping.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::Config;
use crate::db::{self, Pool};
use crate::filter::{FilterError, LessonFilterParams, LessonQuery, PageLimits};
use crate::model::{LessonDraft, LessonSummary};
use crate::recurrence::{self, GenerationCaps, RecurrenceRequest, ValidationError};

/// State shared by all handlers. The pool is constructed at startup and
/// injected here; nothing in the core reaches for ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub page_limits: PageLimits,
    pub caps: GenerationCaps,
}

impl AppState {
    pub fn new(pool: Pool, cfg: &Config) -> Self {
        Self {
            pool,
            page_limits: PageLimits::from(&cfg.limits),
            caps: GenerationCaps::from(&cfg.limits),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/lessons", get(list_lessons).post(create_lessons))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors a handler can surface. Validation failures carry their message to
/// the client; everything else is reported generically and logged in full.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: err.to_string(),
                }),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!(?err, "lesson query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: "Internal Server Error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

// Malformed filter input induces a query failure, not a client error:
// the detail goes to the log, the caller sees the generic body.
impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::Internal(err.into())
    }
}

async fn health(State(state): State<AppState>) -> Response {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
    {
        Ok(_) => Json(json!({ "status": "ok", "database": "connected" })).into_response(),
        Err(err) => {
            error!(?err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unreachable" })),
            )
                .into_response()
        }
    }
}

/// GET /lessons — filtered, paginated lesson listing.
async fn list_lessons(
    State(state): State<AppState>,
    Query(params): Query<LessonFilterParams>,
) -> Result<Json<Vec<LessonSummary>>, ApiError> {
    let query = LessonQuery::build(&params, state.page_limits)?;
    let lessons = db::fetch_lessons(&state.pool, &query)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(lessons))
}

/// POST /lessons — validate a recurrence rule and return the drafts it
/// denotes. Nothing is persisted here.
async fn create_lessons(
    State(state): State<AppState>,
    Json(req): Json<RecurrenceRequest>,
) -> Result<Json<Vec<LessonDraft>>, ApiError> {
    let spec = recurrence::validate(&req)?;
    Ok(Json(recurrence::generate(&spec, state.caps)))
}
