//! Natural-key lookup of an existing schedule row.

use log::warn;

use crate::db::repository::{RepositoryResult, ScheduleRepository};
use crate::models::{NaturalKey, ScheduleEntry};

/// Find the visible row occupying `key`, if any.
///
/// Absence is `Ok(None)`. Rows written before the unique constraint existed
/// can still produce several matches; the oldest (smallest id) wins and the
/// duplicates are logged.
pub async fn find_slot<R: ScheduleRepository + ?Sized>(
    repo: &R,
    key: &NaturalKey,
) -> RepositoryResult<Option<ScheduleEntry>> {
    let rows = repo.select_by_natural_key(key).await?;
    if rows.len() > 1 {
        let ids: Vec<String> = rows.iter().map(|r| r.id.to_string()).collect();
        warn!(
            "{} rows share natural key {} (ids: {}); using the oldest",
            rows.len(),
            key,
            ids.join(", ")
        );
    }
    Ok(rows.into_iter().min_by_key(|row| row.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{LocalRepository, RowAccess};
    use crate::models::*;

    fn draft(course: &str) -> ScheduleEntryDraft {
        ScheduleEntryDraft::new(
            NaturalKey {
                week: IsoWeek::new(2025, 32).unwrap(),
                category: ScheduleCategory::parse("regular").unwrap(),
                instructor_id: InstructorId::parse("I1").unwrap(),
                day_of_week: DayOfWeek::Tuesday,
                time_slot: TimeSlot::from_label("10:00").unwrap(),
            },
            ScheduleFields::new(CourseId::parse(course).unwrap(), 60).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_absent_slot_is_none() {
        let repo = LocalRepository::new();
        assert!(find_slot(&repo, &draft("C1").key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicates_resolve_to_smallest_id() {
        let repo = LocalRepository::new();
        let first = repo.seed_entry(draft("C1"), RowAccess::OPEN);
        repo.seed_entry(draft("C2"), RowAccess::OPEN);

        let found = find_slot(&repo, &first.key).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(repo.operation_counts().total_writes(), 0);
    }

    #[tokio::test]
    async fn test_hidden_rows_are_not_found() {
        let repo = LocalRepository::new();
        let hidden = repo.seed_entry(draft("C1"), RowAccess::HIDDEN);
        assert!(find_slot(&repo, &hidden.key).await.unwrap().is_none());
    }
}
