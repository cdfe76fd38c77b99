use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::schedule_entries;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{
    CourseId, DayOfWeek, InstructorId, IsoWeek, NaturalKey, ScheduleCategory, ScheduleEntry,
    ScheduleEntryDraft, ScheduleEntryId, ScheduleFields, TimeSlot,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = schedule_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScheduleEntryRow {
    pub id: i64,
    pub week_year: i32,
    pub week_number: i16,
    pub category: String,
    pub instructor_id: String,
    pub day_of_week: i16,
    pub slot_index: i16,
    pub course_id: String,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schedule_entries)]
pub struct NewScheduleEntryRow {
    pub week_year: i32,
    pub week_number: i16,
    pub category: String,
    pub instructor_id: String,
    pub day_of_week: i16,
    pub slot_index: i16,
    pub course_id: String,
    pub duration_minutes: i32,
}

impl From<&ScheduleEntryDraft> for NewScheduleEntryRow {
    fn from(draft: &ScheduleEntryDraft) -> Self {
        let key = &draft.key;
        Self {
            week_year: key.week.year(),
            week_number: key.week.week() as i16,
            category: key.category.as_str().to_string(),
            instructor_id: key.instructor_id.as_str().to_string(),
            day_of_week: i16::from(key.day_of_week.index()),
            slot_index: i16::from(key.time_slot.index()),
            course_id: draft.fields.course_id.as_str().to_string(),
            duration_minutes: draft.fields.duration_minutes as i32,
        }
    }
}

impl TryFrom<ScheduleEntryRow> for ScheduleEntry {
    type Error = RepositoryError;

    fn try_from(row: ScheduleEntryRow) -> RepositoryResult<Self> {
        let corrupt = |e: crate::models::ModelError| {
            RepositoryError::internal_with_context(
                format!("Stored row violates domain invariants: {}", e),
                ErrorContext::new("decode_row")
                    .with_entity("schedule_entry")
                    .with_entity_id(row.id),
            )
        };

        let week = IsoWeek::new(row.week_year, u32::try_from(row.week_number).unwrap_or(0))
            .map_err(corrupt)?;
        let key = NaturalKey {
            week,
            category: ScheduleCategory::parse(&row.category).map_err(corrupt)?,
            instructor_id: InstructorId::parse(&row.instructor_id).map_err(corrupt)?,
            day_of_week: DayOfWeek::from_index(i64::from(row.day_of_week)).map_err(corrupt)?,
            time_slot: TimeSlot::from_index(i64::from(row.slot_index)).map_err(corrupt)?,
        };
        let fields = ScheduleFields::new(
            CourseId::parse(&row.course_id).map_err(corrupt)?,
            u32::try_from(row.duration_minutes).unwrap_or(0),
        )
        .map_err(corrupt)?;

        Ok(ScheduleEntry {
            id: ScheduleEntryId::new(row.id),
            key,
            fields,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
