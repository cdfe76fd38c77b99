//! In-memory local repository implementation.
//!
//! This module provides a local implementation of [`ScheduleRepository`]
//! suitable for unit testing and local development. Rows are kept in a
//! `BTreeMap` keyed by id.
//!
//! Each row carries a [`RowAccess`] describing what the current caller's
//! access policy allows, so the repository can reproduce the hosted
//! database's row-level-security behaviour:
//! - an update of a row the caller cannot update matches nothing and fails
//!   with `NotFoundOnUpdate`;
//! - a delete of a row the caller cannot delete removes nothing (`Ok(false)`);
//! - rows the caller cannot read are invisible to selects, yet still count
//!   for the natural-key uniqueness check on insert.
//!
//! Failures can be injected per operation to exercise transient-error paths.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::{
    NaturalKey, ScheduleEntry, ScheduleEntryDraft, ScheduleEntryId, ScheduleFields,
};

/// What the active access policy lets the caller do with one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAccess {
    pub readable: bool,
    pub updatable: bool,
    pub deletable: bool,
}

impl RowAccess {
    /// Fully accessible row.
    pub const OPEN: RowAccess = RowAccess {
        readable: true,
        updatable: true,
        deletable: true,
    };

    /// Phantom row: visible, but neither updatable nor deletable.
    pub const READ_ONLY: RowAccess = RowAccess {
        readable: true,
        updatable: false,
        deletable: false,
    };

    /// Visible and deletable, but updates are filtered out.
    pub const READ_DELETE: RowAccess = RowAccess {
        readable: true,
        updatable: false,
        deletable: true,
    };

    /// Invisible to the caller; still occupies its natural key.
    pub const HIDDEN: RowAccess = RowAccess {
        readable: false,
        updatable: false,
        deletable: false,
    };
}

/// Repository operations that accept injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOperation {
    Select,
    Update,
    Insert,
    Delete,
}

/// Failure to raise on the next matching operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Connection,
    Timeout,
    NotFoundOnUpdate,
    UniqueViolation,
    PolicyRejected,
}

impl InjectedFailure {
    fn into_error(self, op: LocalOperation) -> RepositoryError {
        let context = ErrorContext::new(format!("{:?}", op).to_lowercase())
            .with_entity("schedule_entry")
            .with_details("injected");
        match self {
            InjectedFailure::Connection => {
                RepositoryError::connection_with_context("connection reset", context)
            }
            InjectedFailure::Timeout => RepositoryError::TimeoutError {
                message: "statement timeout".to_string(),
                context: context.retryable(),
            },
            InjectedFailure::NotFoundOnUpdate => {
                RepositoryError::not_found_on_update("0 rows updated", context)
            }
            InjectedFailure::UniqueViolation => {
                RepositoryError::unique_violation("duplicate natural key", context)
            }
            InjectedFailure::PolicyRejected => {
                RepositoryError::policy_rejected("new row violates row-level security", context)
            }
        }
    }
}

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub selects: usize,
    pub updates: usize,
    pub inserts: usize,
    pub deletes: usize,
}

impl OperationCounts {
    pub fn total_writes(&self) -> usize {
        self.updates + self.inserts + self.deletes
    }
}

/// In-memory local repository.
///
/// Cloning shares the underlying storage.
///
/// # Example
/// ```
/// use schedule_portal::db::repositories::{LocalRepository, RowAccess};
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.row_count(), 0);
/// # let _ = RowAccess::OPEN;
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct StoredRow {
    entry: ScheduleEntry,
    access: RowAccess,
}

struct LocalData {
    rows: BTreeMap<ScheduleEntryId, StoredRow>,
    next_id: i64,
    injected: VecDeque<(LocalOperation, InjectedFailure)>,
    counts: OperationCounts,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            injected: VecDeque::new(),
            counts: OperationCounts::default(),
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn allocate_id(&mut self) -> ScheduleEntryId {
        let id = ScheduleEntryId(self.next_id);
        self.next_id += 1;
        id
    }

    fn occupied(&self, key: &NaturalKey) -> bool {
        self.rows.values().any(|row| row.entry.key == *key)
    }

    /// Pop the first injected failure registered for `op`, if any.
    fn take_failure(&mut self, op: LocalOperation) -> Option<RepositoryError> {
        let pos = self.injected.iter().position(|(o, _)| *o == op)?;
        self.injected
            .remove(pos)
            .map(|(_, failure)| failure.into_error(op))
    }

    fn check(&mut self, op: LocalOperation) -> RepositoryResult<()> {
        match op {
            LocalOperation::Select => self.counts.selects += 1,
            LocalOperation::Update => self.counts.updates += 1,
            LocalOperation::Insert => self.counts.inserts += 1,
            LocalOperation::Delete => self.counts.deletes += 1,
        }
        if !self.is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        match self.take_failure(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Store a row directly with the given access, bypassing policies and the
    /// uniqueness check (useful for legacy duplicates and phantom rows).
    ///
    /// # Returns
    /// The stored row with its assigned id
    pub fn seed_entry(&self, draft: ScheduleEntryDraft, access: RowAccess) -> ScheduleEntry {
        let mut data = self.data.write();
        let id = data.allocate_id();
        let now = Utc::now();
        let entry = ScheduleEntry {
            id,
            key: draft.key,
            fields: draft.fields,
            created_at: now,
            updated_at: now,
        };
        data.rows.insert(
            id,
            StoredRow {
                entry: entry.clone(),
                access,
            },
        );
        entry
    }

    /// Change the access the caller has to row `id`. Returns false if absent.
    pub fn set_access(&self, id: ScheduleEntryId, access: RowAccess) -> bool {
        let mut data = self.data.write();
        match data.rows.get_mut(&id) {
            Some(row) => {
                row.access = access;
                true
            }
            None => false,
        }
    }

    /// Make the next `op` fail with `failure`. Failures queue in order.
    pub fn inject_failure(&self, op: LocalOperation, failure: InjectedFailure) {
        self.data.write().injected.push_back((op, failure));
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all rows, counters and injected failures.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Number of stored rows, including rows the caller cannot see.
    pub fn row_count(&self) -> usize {
        self.data.read().rows.len()
    }

    /// All stored rows matching `key`, regardless of access.
    pub fn raw_rows_for(&self, key: &NaturalKey) -> Vec<ScheduleEntry> {
        self.data
            .read()
            .rows
            .values()
            .filter(|row| row.entry.key == *key)
            .map(|row| row.entry.clone())
            .collect()
    }

    /// Operation counters since creation or the last [`clear`](Self::clear).
    pub fn operation_counts(&self) -> OperationCounts {
        self.data.read().counts
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn select_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> RepositoryResult<Vec<ScheduleEntry>> {
        let mut data = self.data.write();
        data.check(LocalOperation::Select)?;
        Ok(data
            .rows
            .values()
            .filter(|row| row.access.readable && row.entry.key == *key)
            .map(|row| row.entry.clone())
            .collect())
    }

    async fn update_by_id(
        &self,
        id: ScheduleEntryId,
        fields: &ScheduleFields,
    ) -> RepositoryResult<ScheduleEntry> {
        let mut data = self.data.write();
        data.check(LocalOperation::Update)?;
        match data.rows.get_mut(&id) {
            Some(row) if row.access.readable && row.access.updatable => {
                row.entry.fields = fields.clone();
                row.entry.updated_at = Utc::now();
                Ok(row.entry.clone())
            }
            _ => Err(RepositoryError::not_found_on_update(
                format!("0 rows updated for schedule entry {}", id),
                ErrorContext::new("update_by_id")
                    .with_entity("schedule_entry")
                    .with_entity_id(id),
            )),
        }
    }

    async fn insert(&self, draft: &ScheduleEntryDraft) -> RepositoryResult<ScheduleEntry> {
        let mut data = self.data.write();
        data.check(LocalOperation::Insert)?;
        if data.occupied(&draft.key) {
            return Err(RepositoryError::unique_violation(
                format!("natural key {} already taken", draft.key),
                ErrorContext::new("insert")
                    .with_entity("schedule_entry")
                    .with_details("schedule_entries_natural_key"),
            ));
        }
        let id = data.allocate_id();
        let now = Utc::now();
        let entry = ScheduleEntry {
            id,
            key: draft.key.clone(),
            fields: draft.fields.clone(),
            created_at: now,
            updated_at: now,
        };
        data.rows.insert(
            id,
            StoredRow {
                entry: entry.clone(),
                access: RowAccess::OPEN,
            },
        );
        Ok(entry)
    }

    async fn delete_by_id(&self, id: ScheduleEntryId) -> RepositoryResult<bool> {
        let mut data = self.data.write();
        data.check(LocalOperation::Delete)?;
        let removable = data
            .rows
            .get(&id)
            .is_some_and(|row| row.access.readable && row.access.deletable);
        if removable {
            data.rows.remove(&id);
        }
        Ok(removable)
    }

    async fn get_by_id(&self, id: ScheduleEntryId) -> RepositoryResult<ScheduleEntry> {
        let mut data = self.data.write();
        data.check(LocalOperation::Select)?;
        data.rows
            .get(&id)
            .filter(|row| row.access.readable)
            .map(|row| row.entry.clone())
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    format!("Schedule entry {} not found", id),
                    ErrorContext::new("get_by_id")
                        .with_entity("schedule_entry")
                        .with_entity_id(id),
                )
            })
    }

    async fn list_week(&self, query: &WeekQuery) -> RepositoryResult<Vec<ScheduleEntry>> {
        let mut data = self.data.write();
        data.check(LocalOperation::Select)?;
        let mut entries: Vec<ScheduleEntry> = data
            .rows
            .values()
            .filter(|row| row.access.readable && query.matches(&row.entry))
            .map(|row| row.entry.clone())
            .collect();
        entries.sort_by(|a, b| {
            (a.key.day_of_week, a.key.time_slot, &a.key.instructor_id, a.id).cmp(&(
                b.key.day_of_week,
                b.key.time_slot,
                &b.key.instructor_id,
                b.id,
            ))
        });
        Ok(entries)
    }
}
