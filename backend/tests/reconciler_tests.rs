//! Placement scenarios for the schedule reconciler against the local repository.

use std::sync::Arc;

use schedule_portal::db::repositories::{
    InjectedFailure, LocalOperation, LocalRepository, RowAccess,
};
use schedule_portal::db::repository::RepositoryError;
use schedule_portal::models::*;
use schedule_portal::services::{
    DegradeReason, IncidentLog, PlacementOutcome, ReconcileStep, ScheduleReconciler,
};

fn key(instructor: &str, day: DayOfWeek, slot: &str) -> NaturalKey {
    NaturalKey {
        week: IsoWeek::new(2025, 32).unwrap(),
        category: ScheduleCategory::parse("regular").unwrap(),
        instructor_id: InstructorId::parse(instructor).unwrap(),
        day_of_week: day,
        time_slot: TimeSlot::from_label(slot).unwrap(),
    }
}

fn draft(course: &str, minutes: u32) -> ScheduleEntryDraft {
    ScheduleEntryDraft::new(
        key("I1", DayOfWeek::Tuesday, "10:00"),
        ScheduleFields::new(CourseId::parse(course).unwrap(), minutes).unwrap(),
    )
}

fn setup() -> (LocalRepository, ScheduleReconciler) {
    let repo = LocalRepository::new();
    let reconciler = ScheduleReconciler::new(Arc::new(repo.clone()), IncidentLog::new());
    (repo, reconciler)
}

#[tokio::test]
async fn test_empty_slot_is_created() {
    let (repo, reconciler) = setup();

    let placement = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();

    assert_eq!(placement.outcome, PlacementOutcome::Created);
    assert_eq!(placement.week_key, "regular_2025_W32");
    assert_eq!(
        placement.trail,
        vec![ReconcileStep::Locate, ReconcileStep::Create]
    );
    let entry = placement.entry.unwrap();
    assert!(entry.matches(&draft("C1", 90)));
    assert_eq!(repo.row_count(), 1);
    assert!(placement.incident_id.is_none());
}

#[tokio::test]
async fn test_replacing_same_draft_is_idempotent() {
    let (repo, reconciler) = setup();

    let first = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();
    let second = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();

    assert_eq!(second.outcome, PlacementOutcome::Updated);
    assert_eq!(
        first.entry.unwrap().id,
        second.entry.as_ref().unwrap().id
    );
    assert_eq!(repo.row_count(), 1);
}

#[tokio::test]
async fn test_changed_fields_update_in_place() {
    let (repo, reconciler) = setup();

    let created = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();
    let updated = reconciler.place_schedule(&draft("C2", 45)).await.unwrap();

    assert_eq!(updated.outcome, PlacementOutcome::Updated);
    assert_eq!(
        updated.trail,
        vec![ReconcileStep::Locate, ReconcileStep::UpdateExisting]
    );
    let entry = updated.entry.unwrap();
    assert_eq!(entry.id, created.entry.unwrap().id);
    assert_eq!(entry.fields.course_id.as_str(), "C2");
    assert_eq!(entry.fields.duration_minutes, 45);

    let rows = repo.raw_rows_for(&draft("C2", 45).key);
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_distinct_slots_do_not_interfere() {
    let (repo, reconciler) = setup();

    let morning = draft("C1", 60);
    let mut evening = draft("C1", 60);
    evening.key = key("I1", DayOfWeek::Tuesday, "18:00");
    let mut other_instructor = draft("C1", 60);
    other_instructor.key = key("I2", DayOfWeek::Tuesday, "10:00");

    for d in [&morning, &evening, &other_instructor] {
        let placement = reconciler.place_schedule(d).await.unwrap();
        assert_eq!(placement.outcome, PlacementOutcome::Created);
    }
    assert_eq!(repo.row_count(), 3);
}

#[tokio::test]
async fn test_phantom_deletable_row_is_recreated() {
    let (repo, reconciler) = setup();
    let stale = repo.seed_entry(draft("OLD", 30), RowAccess::READ_DELETE);

    let placement = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();

    assert_eq!(placement.outcome, PlacementOutcome::Recreated);
    assert_eq!(
        placement.trail,
        vec![
            ReconcileStep::Locate,
            ReconcileStep::UpdateExisting,
            ReconcileStep::CreateAfterMissingUpdate,
            ReconcileStep::ConflictResolve,
            ReconcileStep::RetryUpdate,
            ReconcileStep::Sweep,
        ]
    );
    let entry = placement.entry.unwrap();
    assert_ne!(entry.id, stale.id);
    assert!(entry.matches(&draft("C1", 90)));

    let rows = repo.raw_rows_for(&stale.key);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, entry.id);
}

#[tokio::test]
async fn test_key_taken_after_sweep_degrades_with_incident() {
    let (repo, reconciler) = setup();
    let stale = repo.seed_entry(draft("OLD", 30), RowAccess::READ_DELETE);
    // First insert collides with the stale row; the recreate loses to a
    // concurrent writer.
    repo.inject_failure(LocalOperation::Insert, InjectedFailure::UniqueViolation);
    repo.inject_failure(LocalOperation::Insert, InjectedFailure::UniqueViolation);

    let placement = reconciler.place_schedule(&draft("NEW", 90)).await.unwrap();

    assert_eq!(placement.outcome, PlacementOutcome::Degraded);
    assert_eq!(
        placement.trail[placement.trail.len() - 2..],
        [ReconcileStep::Sweep, ReconcileStep::Degrade]
    );
    assert!(placement.entry.is_none());
    assert!(repo.raw_rows_for(&stale.key).is_empty());

    let incidents = reconciler.incidents().list();
    assert_eq!(incidents.len(), 1);
    assert_eq!(Some(incidents[0].id), placement.incident_id);
    assert_eq!(incidents[0].reason, DegradeReason::RecreateConflict);
    assert_eq!(incidents[0].conflicting_id, Some(stale.id));
}

#[tokio::test]
async fn test_transient_recreate_failure_is_retryable_and_recorded() {
    let (repo, reconciler) = setup();
    let stale = repo.seed_entry(draft("OLD", 30), RowAccess::READ_DELETE);
    repo.inject_failure(LocalOperation::Insert, InjectedFailure::UniqueViolation);
    repo.inject_failure(LocalOperation::Insert, InjectedFailure::Connection);

    let err = reconciler.place_schedule(&draft("NEW", 90)).await.unwrap_err();

    assert!(err.is_retryable());
    assert!(repo.raw_rows_for(&stale.key).is_empty());
    let incidents = reconciler.incidents().list();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].reason, DegradeReason::RecreateFailed);
    assert_eq!(incidents[0].conflicting_id, Some(stale.id));

    // The key is empty now, so a retry creates the row.
    let placement = reconciler.place_schedule(&draft("NEW", 90)).await.unwrap();
    assert_eq!(placement.outcome, PlacementOutcome::Created);
}

#[tokio::test]
async fn test_granting_write_access_turns_degrade_into_update() {
    let (repo, reconciler) = setup();
    let locked = repo.seed_entry(draft("OLD", 30), RowAccess::READ_ONLY);

    let first = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();
    assert_eq!(first.outcome, PlacementOutcome::Degraded);

    assert!(repo.set_access(locked.id, RowAccess::OPEN));
    let second = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();

    assert_eq!(second.outcome, PlacementOutcome::Updated);
    assert_eq!(second.entry.map(|e| e.id), Some(locked.id));
    assert!(!repo.set_access(ScheduleEntryId::new(9_999), RowAccess::OPEN));
}

#[tokio::test]
async fn test_read_only_phantom_degrades_with_incident() {
    let (repo, reconciler) = setup();
    let phantom = repo.seed_entry(draft("OLD", 30), RowAccess::READ_ONLY);

    let placement = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();

    assert_eq!(placement.outcome, PlacementOutcome::Degraded);
    assert_eq!(placement.trail.last(), Some(&ReconcileStep::Degrade));
    assert_eq!(placement.entry.as_ref().map(|e| e.id), Some(phantom.id));

    // Nothing was written.
    let rows = repo.raw_rows_for(&phantom.key);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields.course_id.as_str(), "OLD");

    let incidents = reconciler.incidents().list();
    assert_eq!(incidents.len(), 1);
    assert_eq!(Some(incidents[0].id), placement.incident_id);
    assert_eq!(incidents[0].reason, DegradeReason::SweepBlocked);
    assert_eq!(incidents[0].conflicting_id, Some(phantom.id));
    assert_eq!(incidents[0].week_key, "regular_2025_W32");
}

#[tokio::test]
async fn test_hidden_conflict_degrades_without_entry() {
    let (repo, reconciler) = setup();
    repo.seed_entry(draft("OTHER", 60), RowAccess::HIDDEN);

    let placement = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();

    assert_eq!(placement.outcome, PlacementOutcome::Degraded);
    assert_eq!(
        placement.trail,
        vec![
            ReconcileStep::Locate,
            ReconcileStep::Create,
            ReconcileStep::ConflictResolve,
            ReconcileStep::Degrade,
        ]
    );
    assert!(placement.entry.is_none());
    assert_eq!(repo.row_count(), 1);

    let incidents = reconciler.incidents().list();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].reason, DegradeReason::HiddenConflict);
    assert!(incidents[0].conflicting_id.is_none());
}

#[tokio::test]
async fn test_policy_rejected_update_takes_create_path() {
    let (repo, reconciler) = setup();
    reconciler.place_schedule(&draft("C1", 90)).await.unwrap();
    repo.inject_failure(LocalOperation::Update, InjectedFailure::PolicyRejected);

    let placement = reconciler.place_schedule(&draft("C2", 90)).await.unwrap();

    assert_eq!(placement.outcome, PlacementOutcome::Updated);
    assert!(placement
        .trail
        .contains(&ReconcileStep::CreateAfterMissingUpdate));
    assert_eq!(repo.row_count(), 1);
}

#[tokio::test]
async fn test_connection_failure_is_retryable_and_records_nothing() {
    let (repo, reconciler) = setup();
    repo.inject_failure(LocalOperation::Select, InjectedFailure::Connection);

    let err = reconciler.place_schedule(&draft("C1", 90)).await.unwrap_err();

    assert!(matches!(err, RepositoryError::ConnectionError { .. }));
    assert!(err.is_retryable());
    assert!(reconciler.incidents().is_empty());
    assert_eq!(repo.row_count(), 0);

    // A restart from the top succeeds once the fault clears.
    let placement = reconciler.place_schedule(&draft("C1", 90)).await.unwrap();
    assert_eq!(placement.outcome, PlacementOutcome::Created);
}

#[tokio::test]
async fn test_timeout_during_insert_is_propagated() {
    let (repo, reconciler) = setup();
    repo.inject_failure(LocalOperation::Insert, InjectedFailure::Timeout);

    let err = reconciler.place_schedule(&draft("C1", 90)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::TimeoutError { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unhealthy_repository_fails_fast() {
    let (repo, reconciler) = setup();
    repo.set_healthy(false);

    let err = reconciler.place_schedule(&draft("C1", 90)).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(repo.operation_counts().total_writes(), 0);
}

#[tokio::test]
async fn test_operation_count_is_bounded() {
    let (repo, reconciler) = setup();
    repo.seed_entry(draft("OLD", 30), RowAccess::READ_ONLY);

    reconciler.place_schedule(&draft("C1", 90)).await.unwrap();

    // Worst path: two selects, two updates, one insert, one delete.
    let counts = repo.operation_counts();
    assert_eq!(counts.selects, 2);
    assert_eq!(counts.updates, 2);
    assert_eq!(counts.inserts, 1);
    assert_eq!(counts.deletes, 1);
}

#[tokio::test]
async fn test_legacy_duplicates_update_oldest_row() {
    let (repo, reconciler) = setup();
    let oldest = repo.seed_entry(draft("A", 30), RowAccess::OPEN);
    let newer = repo.seed_entry(draft("B", 30), RowAccess::OPEN);

    let placement = reconciler.place_schedule(&draft("C", 30)).await.unwrap();

    assert_eq!(placement.outcome, PlacementOutcome::Updated);
    assert_eq!(placement.entry.unwrap().id, oldest.id);
    let rows = repo.raw_rows_for(&newer.key);
    let untouched = rows.iter().find(|r| r.id == newer.id).unwrap();
    assert_eq!(untouched.fields.course_id.as_str(), "B");
}

#[tokio::test]
async fn test_incidents_are_listed_newest_first() {
    let (repo, reconciler) = setup();
    repo.seed_entry(draft("X", 30), RowAccess::HIDDEN);

    let first = reconciler.place_schedule(&draft("C1", 30)).await.unwrap();
    let second = reconciler.place_schedule(&draft("C2", 30)).await.unwrap();

    let incidents = reconciler.incidents().list();
    assert_eq!(incidents.len(), 2);
    assert_eq!(Some(incidents[0].id), second.incident_id);
    assert_eq!(Some(incidents[1].id), first.incident_id);
}
