//! HTTP request handlers.

use std::fmt;
use std::str::FromStr;

use att_core::{AttendanceRecord, EmployeeId, Status, render_csv};
use att_db::AttendanceStats;
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Deserializer, de};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;
use crate::cli::RecordFilters;
use crate::commands::events::{EventRow, event_rows};
use crate::commands::ingest::{self, IngestResponse};
use crate::commands::summary::{SummaryRow, summarize_records};

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/detect", post(detect))
        .route("/api/esp32/detect", post(detect))
        .route("/api/attendance", get(list_attendance))
        .route("/api/attendance/summary", get(attendance_summary))
        .route("/api/attendance/stats", get(attendance_stats))
        .route("/api/attendance/export", get(export_attendance))
        .route("/api/employees/:id/attendance", get(employee_attendance))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Body posted by a beacon scanner.
#[derive(Debug, Deserialize)]
struct DetectRequest {
    #[serde(alias = "hex_value")]
    identifier: String,
    #[serde(default)]
    action: Option<Status>,
}

/// Record filters accepted as query parameters.
///
/// Empty parameters (`?status=`) are treated as absent.
#[derive(Debug, Default, Deserialize)]
struct AttendanceParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    date: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    month: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    employee_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    status: Option<Status>,
    #[serde(default, deserialize_with = "empty_as_none")]
    department: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    role: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    limit: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    annotate: Option<bool>,
}

impl AttendanceParams {
    fn filters(&self) -> RecordFilters {
        RecordFilters {
            date: self.date.clone(),
            month: self.month.clone(),
            employee: self.employee_id,
            status: self.status,
            department: self.department.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LimitParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    limit: Option<u32>,
}

/// Parses a query value, mapping an empty string to `None`.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    Option::<String>::deserialize(deserializer)?
        .filter(|value| !value.is_empty())
        .map(|value| value.parse().map_err(de::Error::custom))
        .transpose()
}

/// Logs a failed request under its correlation id.
fn failed(correlation_id: Uuid, error: impl Into<ApiErrorResponse>) -> ApiErrorResponse {
    let response = error.into();
    warn!(
        correlation_id = %correlation_id,
        status = %response.status,
        code = %response.error.code,
        message = %response.error.message,
        "request failed"
    );
    response
}

fn rejected(correlation_id: Uuid, body_text: String) -> ApiErrorResponse {
    failed(
        correlation_id,
        ApiErrorResponse::bad_request(ApiError::validation_error(body_text)),
    )
}

/// Handler for `POST /api/detect`.
async fn detect(
    State(state): State<AppState>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiErrorResponse> {
    let correlation_id = Uuid::new_v4();
    let Json(request) = payload.map_err(|r| rejected(correlation_id, r.body_text()))?;
    info!(
        correlation_id = %correlation_id,
        identifier = %request.identifier,
        "processing detection"
    );

    let task_state = state.clone();
    let outcome = state
        .with_db(move |db| {
            Ok(ingest::record(
                db,
                task_state.clock(),
                &task_state.config().recorder_policy(),
                &request.identifier,
                request.action,
            )?)
        })
        .await
        .map_err(|e| failed(correlation_id, e))?;

    if outcome.is_deduped() {
        debug!(correlation_id = %correlation_id, "detection deduplicated");
    }
    Ok(Json(outcome.into()))
}

/// Handler for `GET /api/attendance`.
async fn list_attendance(
    State(state): State<AppState>,
    params: Result<Query<AttendanceParams>, QueryRejection>,
) -> Result<Json<Vec<EventRow>>, ApiErrorResponse> {
    let correlation_id = Uuid::new_v4();
    let Query(params) = params.map_err(|r| rejected(correlation_id, r.body_text()))?;
    let limit = params.limit.unwrap_or(state.config().default_query_limit);
    let query = params
        .filters()
        .to_query(Some(limit))
        .map_err(|e| failed(correlation_id, e))?;

    let records = state
        .with_db(move |db| Ok(db.list_attendance(&query)?))
        .await
        .map_err(|e| failed(correlation_id, e))?;
    let policy = state.config().break_policy();
    Ok(Json(event_rows(
        records,
        params.annotate.unwrap_or_default(),
        &policy,
    )))
}

/// Handler for `GET /api/attendance/summary`.
async fn attendance_summary(
    State(state): State<AppState>,
    params: Result<Query<AttendanceParams>, QueryRejection>,
) -> Result<Json<Vec<SummaryRow>>, ApiErrorResponse> {
    let correlation_id = Uuid::new_v4();
    let Query(params) = params.map_err(|r| rejected(correlation_id, r.body_text()))?;
    let query = params
        .filters()
        .to_query(None)
        .map_err(|e| failed(correlation_id, e))?;

    let records = state
        .with_db(move |db| Ok(db.list_attendance(&query)?))
        .await
        .map_err(|e| failed(correlation_id, e))?;
    let now = state.clock().now();
    Ok(Json(summarize_records(
        &records,
        now,
        &state.config().summary_policy(),
    )))
}

/// Handler for `GET /api/attendance/stats`.
async fn attendance_stats(
    State(state): State<AppState>,
) -> Result<Json<AttendanceStats>, ApiErrorResponse> {
    let correlation_id = Uuid::new_v4();
    let today = state.clock().now().date_naive();
    let stats = state
        .with_db(move |db| Ok(db.attendance_stats(today)?))
        .await
        .map_err(|e| failed(correlation_id, e))?;
    Ok(Json(stats))
}

/// Handler for `GET /api/attendance/export`.
async fn export_attendance(
    State(state): State<AppState>,
    params: Result<Query<AttendanceParams>, QueryRejection>,
) -> Result<Response, ApiErrorResponse> {
    let correlation_id = Uuid::new_v4();
    let Query(params) = params.map_err(|r| rejected(correlation_id, r.body_text()))?;
    let filter = params
        .filters()
        .to_export_filter()
        .map_err(|e| failed(correlation_id, e))?;

    let query = filter.to_query();
    let records = state
        .with_db(move |db| Ok(db.list_attendance(&query)?))
        .await
        .map_err(|e| failed(correlation_id, e))?;
    let csv = render_csv(&filter, &records, &state.config().break_policy())
        .map_err(|e| failed(correlation_id, e))?;

    info!(
        correlation_id = %correlation_id,
        rows = csv.lines().count().saturating_sub(1),
        "exported attendance"
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filter.filename()),
            ),
        ],
        csv,
    )
        .into_response())
}

/// Handler for `GET /api/employees/:id/attendance`.
async fn employee_attendance(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiErrorResponse> {
    let correlation_id = Uuid::new_v4();
    let Path(id) = id.map_err(|r| rejected(correlation_id, r.body_text()))?;
    let Query(params) = params.map_err(|r| rejected(correlation_id, r.body_text()))?;
    let limit = params
        .limit
        .unwrap_or(state.config().employee_query_limit);

    let records = state
        .with_db(move |db| Ok(db.list_employee_attendance(EmployeeId(id), limit)?))
        .await
        .map_err(|e| failed(correlation_id, e))?;
    Ok(Json(records))
}
