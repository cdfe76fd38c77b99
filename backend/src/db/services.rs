//! High-level schedule service layer.
//!
//! Repository-agnostic operations used by the HTTP layer and the binary.
//! Placement (create-or-update) is not here: it lives in
//! [`crate::services::reconciler`], which owns the conflict-handling rules.
//!
//! # Usage
//!
//! ```no_run
//! use schedule_portal::db::{services, repositories::LocalRepository, WeekQuery};
//! use schedule_portal::models::IsoWeek;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let week = IsoWeek::new(2025, 32)?;
//!     let entries = services::list_week(&repo, &WeekQuery::new(week)).await?;
//!     println!("Found {} entries", entries.len());
//!     Ok(())
//! }
//! ```

use log::{debug, info};

use super::repository::{
    ErrorContext, RepositoryError, RepositoryResult, ScheduleRepository, WeekQuery,
};
use crate::models::{ScheduleEntry, ScheduleEntryId};

// ==================== Health & Connection ====================

/// Check if the database connection is healthy.
///
/// This is a simple pass-through to the repository's health check.
pub async fn health_check<R: ScheduleRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Queries ====================

/// List the visible entries of one week, ordered by day, slot, instructor.
pub async fn list_week<R: ScheduleRepository + ?Sized>(
    repo: &R,
    query: &WeekQuery,
) -> RepositoryResult<Vec<ScheduleEntry>> {
    let entries = repo.list_week(query).await?;
    debug!("list_week {} -> {} entries", query.week, entries.len());
    Ok(entries)
}

/// Fetch one entry by id.
///
/// * `Err(RepositoryError::NotFound)` - If the row doesn't exist or isn't visible
pub async fn get_entry<R: ScheduleRepository + ?Sized>(
    repo: &R,
    id: ScheduleEntryId,
) -> RepositoryResult<ScheduleEntry> {
    repo.get_by_id(id).await
}

// ==================== Mutations ====================

/// Delete one entry by id.
///
/// A delete that removes nothing (absent row, or one the delete policy
/// filters out) is reported as `NotFound`.
pub async fn delete_entry<R: ScheduleRepository + ?Sized>(
    repo: &R,
    id: ScheduleEntryId,
) -> RepositoryResult<()> {
    if repo.delete_by_id(id).await? {
        info!("Deleted schedule entry {}", id);
        Ok(())
    } else {
        Err(RepositoryError::not_found_with_context(
            format!("Schedule entry {} not found or not deletable", id),
            ErrorContext::new("delete_entry")
                .with_entity("schedule_entry")
                .with_entity_id(id),
        ))
    }
}
