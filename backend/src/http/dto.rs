//! Data Transfer Objects for the HTTP API.
//!
//! Domain types that already (de)serialize in their wire shape
//! (`ScheduleEntryDraft`, `ScheduleEntry`, `Placement`, `Incident`,
//! `FileInfo`) are used directly; this module holds the envelopes and query
//! parameter types around them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::ScheduleEntry;
use crate::services::Incident;
use crate::storage::FileInfo;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Query parameters for `GET /v1/week-key`.
#[derive(Debug, Clone, Deserialize)]
pub struct WeekKeyQuery {
    pub date: NaiveDate,
    pub category: String,
}

/// Week key plus the ISO coordinates it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekKeyResponse {
    pub week_key: String,
    pub category: String,
    pub iso_year: i32,
    pub iso_week: u32,
    /// Monday of the week.
    pub week_start: NaiveDate,
    /// Sunday of the week.
    pub week_end: NaiveDate,
}

/// Query parameters for `GET /v1/schedules`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListSchedulesQuery {
    pub year: i32,
    pub week: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub instructor_id: Option<String>,
}

/// Query parameters for `GET /v1/weeks/{week_key}/schedules`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeekSchedulesQuery {
    #[serde(default)]
    pub instructor_id: Option<String>,
}

/// Schedule list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleListResponse {
    /// Week key when the listing is scoped to one category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_key: Option<String>,
    pub entries: Vec<ScheduleEntry>,
    pub total: usize,
}

/// Incident list response, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentListResponse {
    pub incidents: Vec<Incident>,
    pub total: usize,
    pub capacity: usize,
}

/// Request body for `POST /v1/files`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadFileRequest {
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Standard base64 (with padding) of the file content.
    pub content_base64: String,
}

/// File list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<FileInfo>,
    pub total: usize,
}
