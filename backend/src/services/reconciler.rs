//! Create-or-update of a schedule entry under row-level access policies.
//!
//! A placement converges on "exactly one row holds the desired fields for
//! this natural key" through a fixed sequence of steps:
//!
//! ```text
//! Locate ──found──▶ UpdateExisting ──ok──▶ Updated
//!   │                    │ row unwritable
//!   │ absent             ▼
//!   ▼               CreateAfterMissingUpdate
//! Create ◀───────────────┘
//!   │ ok ─▶ Created
//!   │ unique violation
//!   ▼
//! ConflictResolve ──row not visible──▶ Degraded
//!   │ found
//!   ▼
//! RetryUpdate ──ok──▶ Updated
//!   │ row unwritable
//!   ▼
//! Sweep ──deleted + inserted──▶ Recreated
//!   ├──policy blocked──▶ Degraded
//!   ├──deleted, key taken by another writer──▶ Degraded
//!   └──deleted, insert failed──▶ error (incident recorded)
//! ```
//!
//! Each step runs at most once, so a placement issues a bounded number of
//! repository calls. `Degraded` is reported as success, but always with a
//! `warn` log line and an incident in the [`IncidentLog`]. A sweep whose
//! recreate fails also leaves an incident before its error is returned.
//! Every other repository failure is returned unchanged; transient ones are
//! retryable and the whole placement may be restarted.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::incidents::{DegradeReason, Incident, IncidentLog};
use super::locator::find_slot;
use super::sweeper::{sweep_and_recreate, SweepError};
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult, ScheduleRepository};
use crate::models::{ScheduleEntry, ScheduleEntryDraft, ScheduleEntryId};

/// How a placement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementOutcome {
    Created,
    Updated,
    /// A stale row was deleted and the desired row inserted in its place.
    Recreated,
    /// Nothing was written; see the incident log.
    Degraded,
}

/// Steps visited during a placement, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStep {
    Locate,
    UpdateExisting,
    Create,
    CreateAfterMissingUpdate,
    ConflictResolve,
    RetryUpdate,
    Sweep,
    Degrade,
}

/// Result of [`ScheduleReconciler::place_schedule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub outcome: PlacementOutcome,
    /// The written row; for `Degraded`, the conflicting row if one was seen.
    pub entry: Option<ScheduleEntry>,
    pub week_key: String,
    pub trail: Vec<ReconcileStep>,
    /// Incident recorded for a degraded placement.
    pub incident_id: Option<u64>,
}

/// Places desired schedule entries into a repository.
#[derive(Clone)]
pub struct ScheduleReconciler {
    repo: Arc<dyn ScheduleRepository>,
    incidents: IncidentLog,
}

impl ScheduleReconciler {
    pub fn new(repo: Arc<dyn ScheduleRepository>, incidents: IncidentLog) -> Self {
        Self { repo, incidents }
    }

    pub fn incidents(&self) -> &IncidentLog {
        &self.incidents
    }

    /// Make the row for `desired.key` hold `desired.fields`.
    pub async fn place_schedule(&self, desired: &ScheduleEntryDraft) -> RepositoryResult<Placement> {
        let mut trail = vec![ReconcileStep::Locate];
        let repo = self.repo.as_ref();

        match find_slot(repo, &desired.key).await? {
            Some(existing) => {
                trail.push(ReconcileStep::UpdateExisting);
                match repo.update_by_id(existing.id, &desired.fields).await {
                    Ok(entry) => return Ok(finish(PlacementOutcome::Updated, entry, desired, trail)),
                    Err(e) if e.is_unwritable_row() => {
                        debug!("Row {} for {} not writable: {}", existing.id, desired.key, e);
                        trail.push(ReconcileStep::CreateAfterMissingUpdate);
                    }
                    Err(e) => return Err(e),
                }
            }
            None => trail.push(ReconcileStep::Create),
        }

        match repo.insert(desired).await {
            Ok(entry) => Ok(finish(PlacementOutcome::Created, entry, desired, trail)),
            Err(RepositoryError::UniqueViolation { message, .. }) => {
                debug!("Insert for {} collided: {}", desired.key, message);
                self.resolve_conflict(desired, trail).await
            }
            Err(e) => Err(e),
        }
    }

    /// [`place_schedule`](Self::place_schedule) bounded by `limit`.
    ///
    /// Expiry is a retryable `TimeoutError`; steps already applied stay applied.
    pub async fn place_schedule_within(
        &self,
        desired: &ScheduleEntryDraft,
        limit: Duration,
    ) -> RepositoryResult<Placement> {
        match tokio::time::timeout(limit, self.place_schedule(desired)).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::TimeoutError {
                message: format!("placement of {} exceeded {:?}", desired.key, limit),
                context: ErrorContext::new("place_schedule")
                    .with_entity("schedule_entry")
                    .retryable(),
            }),
        }
    }

    async fn resolve_conflict(
        &self,
        desired: &ScheduleEntryDraft,
        mut trail: Vec<ReconcileStep>,
    ) -> RepositoryResult<Placement> {
        trail.push(ReconcileStep::ConflictResolve);
        let repo = self.repo.as_ref();

        let Some(conflicting) = find_slot(repo, &desired.key).await? else {
            return Ok(self.degrade(
                desired,
                None,
                DegradeReason::HiddenConflict,
                "natural key is occupied by a row that is not visible to this caller",
                trail,
            ));
        };

        trail.push(ReconcileStep::RetryUpdate);
        match repo.update_by_id(conflicting.id, &desired.fields).await {
            Ok(entry) => return Ok(finish(PlacementOutcome::Updated, entry, desired, trail)),
            Err(e) if e.is_unwritable_row() => {
                debug!("Conflicting row {} not writable: {}", conflicting.id, e);
            }
            Err(e) => return Err(e),
        }

        trail.push(ReconcileStep::Sweep);
        match sweep_and_recreate(repo, conflicting.id, desired).await {
            Ok(entry) => Ok(finish(PlacementOutcome::Recreated, entry, desired, trail)),
            Err(SweepError::PolicyBlocked { message, .. }) => Ok(self.degrade(
                desired,
                Some(conflicting),
                DegradeReason::SweepBlocked,
                message,
                trail,
            )),
            Err(SweepError::NotRecreated { id, source }) => match source {
                RepositoryError::UniqueViolation { message, .. } => {
                    trail.push(ReconcileStep::Degrade);
                    let incident = self.report(
                        desired,
                        Some(id),
                        DegradeReason::RecreateConflict,
                        format!("row deleted, key taken by another writer: {}", message),
                    );
                    Ok(Placement {
                        outcome: PlacementOutcome::Degraded,
                        entry: None,
                        week_key: desired.key.week_key(),
                        trail,
                        incident_id: Some(incident.id),
                    })
                }
                source => {
                    self.report(
                        desired,
                        Some(id),
                        DegradeReason::RecreateFailed,
                        format!("row deleted, recreate failed: {}", source),
                    );
                    Err(source)
                }
            },
            Err(SweepError::Repository(e)) => Err(e),
        }
    }

    /// Record an incident and emit the matching `warn` line.
    fn report(
        &self,
        desired: &ScheduleEntryDraft,
        conflicting_id: Option<ScheduleEntryId>,
        reason: DegradeReason,
        detail: impl Into<String>,
    ) -> Incident {
        let incident = self
            .incidents
            .record(&desired.key, conflicting_id, reason, detail);
        warn!(
            "Incident #{} for {} ({:?}, conflicting row {:?}): {}",
            incident.id, desired.key, reason, conflicting_id, incident.detail
        );
        incident
    }

    fn degrade(
        &self,
        desired: &ScheduleEntryDraft,
        conflicting: Option<ScheduleEntry>,
        reason: DegradeReason,
        detail: impl Into<String>,
        mut trail: Vec<ReconcileStep>,
    ) -> Placement {
        trail.push(ReconcileStep::Degrade);
        let incident = self.report(desired, conflicting.as_ref().map(|e| e.id), reason, detail);

        Placement {
            outcome: PlacementOutcome::Degraded,
            entry: conflicting,
            week_key: desired.key.week_key(),
            trail,
            incident_id: Some(incident.id),
        }
    }
}

fn finish(
    outcome: PlacementOutcome,
    entry: ScheduleEntry,
    desired: &ScheduleEntryDraft,
    trail: Vec<ReconcileStep>,
) -> Placement {
    info!("Placement of {} -> {:?} (id {})", desired.key, outcome, entry.id);
    Placement {
        outcome,
        entry: Some(entry),
        week_key: desired.key.week_key(),
        trail,
        incident_id: None,
    }
}
