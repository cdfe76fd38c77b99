//! Operator-visible record of degraded placements.
//!
//! Every placement that reports success without having written the desired
//! row leaves an [`Incident`] here, as does a sweep that deleted a row it
//! could not replace. The log is in-memory and bounded; the
//! oldest incidents are dropped first.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::{NaturalKey, ScheduleEntryId};

/// Default number of incidents retained.
pub const DEFAULT_INCIDENT_CAPACITY: usize = 256;

/// Upper bound on slots reserved up front; larger logs grow on demand.
const PREALLOCATED_INCIDENTS: usize = 1024;

/// Why a placement had to degrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeReason {
    /// The natural key is taken by a row the caller cannot read.
    HiddenConflict,
    /// The conflicting row is visible but could be neither updated nor deleted.
    SweepBlocked,
    /// The stale row was deleted, then another writer took the key first.
    RecreateConflict,
    /// The stale row was deleted and the recreate failed; the placement
    /// returned an error and the key may be empty until it is retried.
    RecreateFailed,
}

/// One degraded placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: u64,
    pub recorded_at: DateTime<Utc>,
    pub natural_key: NaturalKey,
    pub week_key: String,
    pub conflicting_id: Option<ScheduleEntryId>,
    pub reason: DegradeReason,
    pub detail: String,
}

/// Bounded in-memory incident log. Cloning shares the log.
#[derive(Clone)]
pub struct IncidentLog {
    entries: Arc<RwLock<VecDeque<Incident>>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl IncidentLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INCIDENT_CAPACITY)
    }

    /// Log keeping at most `capacity` incidents (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(
                capacity.min(PREALLOCATED_INCIDENTS),
            ))),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity,
        }
    }

    /// Append an incident, evicting the oldest when full.
    pub fn record(
        &self,
        natural_key: &NaturalKey,
        conflicting_id: Option<ScheduleEntryId>,
        reason: DegradeReason,
        detail: impl Into<String>,
    ) -> Incident {
        let incident = Incident {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            recorded_at: Utc::now(),
            natural_key: natural_key.clone(),
            week_key: natural_key.week_key(),
            conflicting_id,
            reason,
            detail: detail.into(),
        };

        let mut entries = self.entries.write();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(incident.clone());
        incident
    }

    /// All retained incidents, newest first.
    pub fn list(&self) -> Vec<Incident> {
        self.entries.read().iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for IncidentLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    fn key(slot: i64) -> NaturalKey {
        NaturalKey {
            week: IsoWeek::new(2025, 32).unwrap(),
            category: ScheduleCategory::parse("regular").unwrap(),
            instructor_id: InstructorId::parse("I1").unwrap(),
            day_of_week: DayOfWeek::Monday,
            time_slot: TimeSlot::from_index(slot).unwrap(),
        }
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let log = IncidentLog::with_capacity(2);
        log.record(&key(0), None, DegradeReason::HiddenConflict, "first");
        log.record(&key(1), Some(ScheduleEntryId(7)), DegradeReason::SweepBlocked, "second");
        log.record(&key(2), None, DegradeReason::HiddenConflict, "third");

        let listed = log.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].detail, "third");
        assert_eq!(listed[1].detail, "second");
        assert_eq!(listed[1].conflicting_id, Some(ScheduleEntryId(7)));
        assert_eq!(listed[0].week_key, "regular_2025_W32");
    }

    #[test]
    fn test_clones_share_entries() {
        let log = IncidentLog::new();
        let shared = log.clone();
        shared.record(&key(3), None, DegradeReason::HiddenConflict, "x");
        assert_eq!(log.len(), 1);
        assert_eq!(log.capacity(), DEFAULT_INCIDENT_CAPACITY);
    }

    #[test]
    fn test_huge_capacity_does_not_preallocate() {
        let log = IncidentLog::with_capacity(usize::MAX);
        assert_eq!(log.capacity(), usize::MAX);
        log.record(&key(4), None, DegradeReason::RecreateConflict, "y");
        assert_eq!(log.len(), 1);
    }
}
