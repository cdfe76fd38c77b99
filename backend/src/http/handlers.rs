//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;

use super::dto::{
    FileListResponse, HealthResponse, IncidentListResponse, ListSchedulesQuery,
    ScheduleListResponse, UploadFileRequest, WeekKeyQuery, WeekKeyResponse, WeekSchedulesQuery,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::repository::WeekQuery;
use crate::db::services as db_services;
use crate::models::{
    DayOfWeek, InstructorId, IsoWeek, ScheduleCategory, ScheduleEntry, ScheduleEntryDraft,
    ScheduleEntryId, WeekKey,
};
use crate::services::Placement;
use crate::storage::{FileInfo, FileUpload};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn optional_key<T, F>(raw: Option<String>, parse: F) -> Result<Option<T>, AppError>
where
    F: FnOnce(&str) -> Result<T, crate::models::ModelError>,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Ok(Some(parse(value)?)),
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and database is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Week Keys
// =============================================================================

/// GET /v1/week-key?date=YYYY-MM-DD&category=...
pub async fn get_week_key(Query(query): Query<WeekKeyQuery>) -> HandlerResult<WeekKeyResponse> {
    let category = ScheduleCategory::parse(&query.category)?;
    let key = WeekKey::for_date(query.date, category);

    Ok(Json(WeekKeyResponse {
        week_key: key.to_string(),
        category: key.category.into_inner(),
        iso_year: key.week.year(),
        iso_week: key.week.week(),
        week_start: key.week.monday(),
        week_end: key.week.date_of(DayOfWeek::Sunday),
    }))
}

// =============================================================================
// Schedules
// =============================================================================

/// POST /v1/schedules/place
///
/// Create or update the entry for one slot. Every success outcome, including
/// `degraded`, is a 200; the outcome field tells them apart.
pub async fn place_schedule(
    State(state): State<AppState>,
    payload: Result<Json<ScheduleEntryDraft>, JsonRejection>,
) -> HandlerResult<Placement> {
    let Json(draft) = payload?;
    let placement = state
        .reconciler
        .place_schedule_within(&draft, state.settings.placement_timeout())
        .await?;
    Ok(Json(placement))
}

/// GET /v1/schedules?year=&week=&category=&instructor_id=
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ListSchedulesQuery>,
) -> HandlerResult<ScheduleListResponse> {
    let week = IsoWeek::new(query.year, query.week)?;
    let category = optional_key(query.category, |v| ScheduleCategory::parse(v))?;
    let instructor = optional_key(query.instructor_id, |v| InstructorId::parse(v))?;

    let week_key = category.as_ref().map(|c| week.key(c.as_str()));
    let mut filter = WeekQuery::new(week);
    filter.category = category;
    filter.instructor_id = instructor;

    let entries = db_services::list_week(state.repository.as_ref(), &filter).await?;
    let total = entries.len();
    Ok(Json(ScheduleListResponse {
        week_key,
        entries,
        total,
    }))
}

/// GET /v1/weeks/{week_key}/schedules
pub async fn list_week_schedules(
    State(state): State<AppState>,
    Path(week_key): Path<String>,
    Query(query): Query<WeekSchedulesQuery>,
) -> HandlerResult<ScheduleListResponse> {
    let key: WeekKey = week_key.parse()?;
    let instructor = optional_key(query.instructor_id, |v| InstructorId::parse(v))?;

    let mut filter = WeekQuery::new(key.week).with_category(key.category.clone());
    filter.instructor_id = instructor;

    let entries = db_services::list_week(state.repository.as_ref(), &filter).await?;
    let total = entries.len();
    Ok(Json(ScheduleListResponse {
        week_key: Some(key.to_string()),
        entries,
        total,
    }))
}

/// GET /v1/schedules/{id}
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<ScheduleEntry> {
    let entry = db_services::get_entry(state.repository.as_ref(), ScheduleEntryId::new(id)).await?;
    Ok(Json(entry))
}

/// DELETE /v1/schedules/{id}
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    db_services::delete_entry(state.repository.as_ref(), ScheduleEntryId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Incidents
// =============================================================================

/// GET /v1/incidents
pub async fn list_incidents(State(state): State<AppState>) -> HandlerResult<IncidentListResponse> {
    let incidents = state.incidents.list();
    Ok(Json(IncidentListResponse {
        total: incidents.len(),
        capacity: state.incidents.capacity(),
        incidents,
    }))
}

// =============================================================================
// Files
// =============================================================================

/// GET /v1/files
pub async fn list_files(State(state): State<AppState>) -> HandlerResult<FileListResponse> {
    let files = state.files.list_files().await?;
    let total = files.len();
    Ok(Json(FileListResponse { files, total }))
}

/// POST /v1/files
pub async fn upload_file(
    State(state): State<AppState>,
    payload: Result<Json<UploadFileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FileInfo>), AppError> {
    let Json(request) = payload?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(request.content_base64.trim())
        .map_err(|e| AppError::BadRequest(format!("content_base64 is not valid base64: {}", e)))?;
    let upload = FileUpload::new(
        request.name,
        request.mime_type,
        bytes,
        state.settings.max_upload_bytes,
    )?;

    let info = state.files.upload(upload).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// GET /v1/files/{id}/content
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let content = state.files.download(&id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        content.info.name.replace(['"', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, content.info.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content.bytes,
    )
        .into_response())
}

/// DELETE /v1/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.files.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
