//! Schedule repository trait for the schedule_entries table.
//!
//! Write operations report failures through the typed taxonomy in
//! [`super::error`]; in particular an update that matches no row is
//! [`RepositoryError::NotFoundOnUpdate`](super::RepositoryError::NotFoundOnUpdate),
//! never a silent no-op.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::RepositoryResult;
use crate::models::{
    InstructorId, IsoWeek, NaturalKey, ScheduleCategory, ScheduleEntry, ScheduleEntryDraft,
    ScheduleEntryId, ScheduleFields,
};

/// Filter for listing the entries of one ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekQuery {
    pub week: IsoWeek,
    #[serde(default)]
    pub category: Option<ScheduleCategory>,
    #[serde(default)]
    pub instructor_id: Option<InstructorId>,
}

impl WeekQuery {
    pub fn new(week: IsoWeek) -> Self {
        Self {
            week,
            category: None,
            instructor_id: None,
        }
    }

    pub fn with_category(mut self, category: ScheduleCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_instructor(mut self, instructor_id: InstructorId) -> Self {
        self.instructor_id = Some(instructor_id);
        self
    }

    /// Whether `entry` falls inside this filter.
    pub fn matches(&self, entry: &ScheduleEntry) -> bool {
        entry.key.week == self.week
            && self
                .category
                .as_ref()
                .map_or(true, |c| *c == entry.key.category)
            && self
                .instructor_id
                .as_ref()
                .map_or(true, |i| *i == entry.key.instructor_id)
    }
}

/// Repository trait for schedule entry operations.
///
/// Read visibility and write permissions are decided by the backend's
/// access policies; an implementation reports what the caller is allowed to
/// see and do, which is not necessarily everything that exists.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the database connection is healthy.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Natural-Key Surface ====================

    /// Select the visible rows whose natural key matches `key` exactly.
    ///
    /// Returns an empty vector when nothing matches; absence is not an error.
    async fn select_by_natural_key(&self, key: &NaturalKey)
        -> RepositoryResult<Vec<ScheduleEntry>>;

    /// Overwrite the mutable fields of row `id`.
    ///
    /// # Returns
    /// * `Ok(ScheduleEntry)` - The row as stored after the update
    /// * `Err(RepositoryError::NotFoundOnUpdate)` - No row was updated
    /// * `Err(RepositoryError::PolicyRejected)` - The write policy refused the new row
    async fn update_by_id(
        &self,
        id: ScheduleEntryId,
        fields: &ScheduleFields,
    ) -> RepositoryResult<ScheduleEntry>;

    /// Insert a new row for `draft`.
    ///
    /// # Returns
    /// * `Ok(ScheduleEntry)` - The inserted row with its assigned id
    /// * `Err(RepositoryError::UniqueViolation)` - A row already occupies the natural key
    async fn insert(&self, draft: &ScheduleEntryDraft) -> RepositoryResult<ScheduleEntry>;

    /// Delete row `id`.
    ///
    /// # Returns
    /// * `Ok(true)` - A row was removed
    /// * `Ok(false)` - Nothing was removed (absent, or filtered out by policy)
    /// * `Err(RepositoryError::PolicyRejected)` - The policy refused the delete outright
    async fn delete_by_id(&self, id: ScheduleEntryId) -> RepositoryResult<bool>;

    // ==================== Queries ====================

    /// Get a single visible row by id.
    ///
    /// * `Err(RepositoryError::NotFound)` - If the row doesn't exist or isn't visible
    async fn get_by_id(&self, id: ScheduleEntryId) -> RepositoryResult<ScheduleEntry>;

    /// List the visible rows of one week, ordered by day, slot, instructor.
    async fn list_week(&self, query: &WeekQuery) -> RepositoryResult<Vec<ScheduleEntry>>;
}
