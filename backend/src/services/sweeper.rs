//! Removal of a conflicting row followed by a single fresh insert.

use log::{info, warn};

use crate::db::repository::{RepositoryError, ScheduleRepository};
use crate::models::{ScheduleEntry, ScheduleEntryDraft, ScheduleEntryId};

/// Why a sweep did not produce a fresh row.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// The delete policy kept the row: the delete was refused or removed nothing.
    #[error("Delete of schedule entry {id} blocked by access policy: {message}")]
    PolicyBlocked { id: ScheduleEntryId, message: String },

    /// The row was deleted but the fresh insert failed; the key is now empty
    /// or held by another writer.
    #[error("Schedule entry {id} deleted but not recreated: {source}")]
    NotRecreated {
        id: ScheduleEntryId,
        #[source]
        source: RepositoryError,
    },

    /// The delete itself failed for a reason other than policy.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Delete `conflicting_id` and, if a row was actually removed, insert `desired`.
///
/// The delete is attempted exactly once.
pub async fn sweep_and_recreate<R: ScheduleRepository + ?Sized>(
    repo: &R,
    conflicting_id: ScheduleEntryId,
    desired: &ScheduleEntryDraft,
) -> Result<ScheduleEntry, SweepError> {
    match repo.delete_by_id(conflicting_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("Delete of schedule entry {} removed nothing", conflicting_id);
            return Err(SweepError::PolicyBlocked {
                id: conflicting_id,
                message: "delete matched no row".to_string(),
            });
        }
        Err(RepositoryError::PolicyRejected { message, .. }) => {
            warn!("Delete of schedule entry {} rejected: {}", conflicting_id, message);
            return Err(SweepError::PolicyBlocked {
                id: conflicting_id,
                message,
            });
        }
        Err(e) => return Err(SweepError::Repository(e)),
    }

    let entry = match repo.insert(desired).await {
        Ok(entry) => entry,
        Err(source) => {
            warn!(
                "Schedule entry {} deleted but recreate for {} failed: {}",
                conflicting_id, desired.key, source
            );
            return Err(SweepError::NotRecreated {
                id: conflicting_id,
                source,
            });
        }
    };
    info!(
        "Replaced stale schedule entry {} with {} for {}",
        conflicting_id, entry.id, desired.key
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{InjectedFailure, LocalOperation, LocalRepository, RowAccess};
    use crate::models::*;

    fn draft(course: &str) -> ScheduleEntryDraft {
        ScheduleEntryDraft::new(
            NaturalKey {
                week: IsoWeek::new(2025, 32).unwrap(),
                category: ScheduleCategory::parse("regular").unwrap(),
                instructor_id: InstructorId::parse("I1").unwrap(),
                day_of_week: DayOfWeek::Wednesday,
                time_slot: TimeSlot::from_index(4).unwrap(),
            },
            ScheduleFields::new(CourseId::parse(course).unwrap(), 45).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_deletable_row_is_replaced() {
        let repo = LocalRepository::new();
        let stale = repo.seed_entry(draft("OLD"), RowAccess::READ_DELETE);

        let fresh = sweep_and_recreate(&repo, stale.id, &draft("NEW")).await.unwrap();
        assert_ne!(fresh.id, stale.id);
        assert_eq!(fresh.fields.course_id.as_str(), "NEW");
        assert_eq!(repo.raw_rows_for(&stale.key).len(), 1);
    }

    #[tokio::test]
    async fn test_filtered_delete_is_policy_blocked() {
        let repo = LocalRepository::new();
        let stale = repo.seed_entry(draft("OLD"), RowAccess::READ_ONLY);

        let err = sweep_and_recreate(&repo, stale.id, &draft("NEW")).await.unwrap_err();
        assert!(matches!(err, SweepError::PolicyBlocked { id, .. } if id == stale.id));
        let counts = repo.operation_counts();
        assert_eq!(counts.deletes, 1);
        assert_eq!(counts.inserts, 0);
    }

    #[tokio::test]
    async fn test_rejected_delete_is_policy_blocked() {
        let repo = LocalRepository::new();
        let stale = repo.seed_entry(draft("OLD"), RowAccess::READ_DELETE);
        repo.inject_failure(LocalOperation::Delete, InjectedFailure::PolicyRejected);

        let err = sweep_and_recreate(&repo, stale.id, &draft("NEW")).await.unwrap_err();
        assert!(matches!(err, SweepError::PolicyBlocked { .. }));
        assert_eq!(repo.row_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let repo = LocalRepository::new();
        let stale = repo.seed_entry(draft("OLD"), RowAccess::READ_DELETE);
        repo.inject_failure(LocalOperation::Delete, InjectedFailure::Connection);

        match sweep_and_recreate(&repo, stale.id, &draft("NEW")).await {
            Err(SweepError::Repository(e)) => assert!(e.is_retryable()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_recreate_reports_deleted_row() {
        let repo = LocalRepository::new();
        let stale = repo.seed_entry(draft("OLD"), RowAccess::READ_DELETE);
        repo.inject_failure(LocalOperation::Insert, InjectedFailure::UniqueViolation);

        match sweep_and_recreate(&repo, stale.id, &draft("NEW")).await {
            Err(SweepError::NotRecreated { id, source }) => {
                assert_eq!(id, stale.id);
                assert!(matches!(source, RepositoryError::UniqueViolation { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(repo.row_count(), 0);
    }
}
