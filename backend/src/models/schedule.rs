//! Schedule entry domain types.
//!
//! A [`ScheduleEntry`] places one course for one instructor into one slot of
//! one ISO week. The slot is identified by its [`NaturalKey`]; at most one
//! entry may exist per natural key.
//!
//! Day and slot encodings are fixed here and enforced on every input path:
//! - `day_of_week`: 0 = Monday … 6 = Sunday (ISO order)
//! - `time_slot`: hourly grid index 0..=12, slot 0 starting at 08:00 and
//!   slot 12 at 20:00; accepted as the index or as `"HH:MM"`, emitted as
//!   `"HH:MM"`

use std::fmt;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::week::IsoWeek;

crate::define_id_type!(i64, ScheduleEntryId);
crate::define_key_type!(ScheduleCategory, "category");
crate::define_key_type!(InstructorId, "instructor_id");
crate::define_key_type!(CourseId, "course_id");

/// Longest lesson the portal accepts, in minutes.
pub const MAX_DURATION_MINUTES: u32 = 720;

/// Day of the week, Monday-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// Decode the canonical 0 = Monday index.
    pub fn from_index(index: i64) -> Result<Self, ModelError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(ModelError::InvalidDay(index))
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

impl Serialize for DayOfWeek {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.index())
    }
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        DayOfWeek::from_index(raw).map_err(serde::de::Error::custom)
    }
}

/// Hourly teaching slot on the 08:00–20:00 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSlot(u8);

impl TimeSlot {
    pub const FIRST_HOUR: u8 = 8;
    pub const MAX_INDEX: u8 = 12;

    pub fn from_index(index: i64) -> Result<Self, ModelError> {
        if (0..=Self::MAX_INDEX as i64).contains(&index) {
            Ok(Self(index as u8))
        } else {
            Err(ModelError::InvalidSlot(index.to_string()))
        }
    }

    /// Parse an on-the-hour `"HH:MM"` (or `"H:MM"`) start time.
    pub fn from_label(label: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidSlot(label.to_string());
        let (hour, minute) = label.trim().split_once(':').ok_or_else(invalid)?;
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        if minute != 0 || hour < Self::FIRST_HOUR || hour > Self::FIRST_HOUR + Self::MAX_INDEX {
            return Err(invalid());
        }
        Ok(Self(hour - Self::FIRST_HOUR))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn start_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(Self::FIRST_HOUR + self.0), 0, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", Self::FIRST_HOUR + self.0)
    }
}

impl Serialize for TimeSlot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotVisitor;

        impl serde::de::Visitor<'_> for SlotVisitor {
            type Value = TimeSlot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a slot index 0..=12 or an \"HH:00\" time between 08:00 and 20:00")
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<TimeSlot, E> {
                TimeSlot::from_index(v).map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<TimeSlot, E> {
                let v = i64::try_from(v).map_err(|_| E::custom(ModelError::InvalidSlot(v.to_string())))?;
                TimeSlot::from_index(v).map_err(E::custom)
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<TimeSlot, E> {
                TimeSlot::from_label(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SlotVisitor)
    }
}

/// Business fields that uniquely identify a schedule slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawNaturalKey", into = "RawNaturalKey")]
pub struct NaturalKey {
    pub week: IsoWeek,
    pub category: ScheduleCategory,
    pub instructor_id: InstructorId,
    pub day_of_week: DayOfWeek,
    pub time_slot: TimeSlot,
}

#[derive(Serialize, Deserialize)]
struct RawNaturalKey {
    week_year: i32,
    week_number: u32,
    category: ScheduleCategory,
    instructor_id: InstructorId,
    day_of_week: DayOfWeek,
    time_slot: TimeSlot,
}

impl TryFrom<RawNaturalKey> for NaturalKey {
    type Error = ModelError;

    fn try_from(raw: RawNaturalKey) -> Result<Self, Self::Error> {
        Ok(Self {
            week: IsoWeek::new(raw.week_year, raw.week_number)?,
            category: raw.category,
            instructor_id: raw.instructor_id,
            day_of_week: raw.day_of_week,
            time_slot: raw.time_slot,
        })
    }
}

impl From<NaturalKey> for RawNaturalKey {
    fn from(key: NaturalKey) -> Self {
        Self {
            week_year: key.week.year(),
            week_number: key.week.week(),
            category: key.category,
            instructor_id: key.instructor_id,
            day_of_week: key.day_of_week,
            time_slot: key.time_slot,
        }
    }
}

impl NaturalKey {
    /// Week key of the bucket this slot belongs to.
    pub fn week_key(&self) -> String {
        self.week.key(self.category.as_str())
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/day{}/{}",
            self.week_key(),
            self.instructor_id,
            self.day_of_week.index(),
            self.time_slot
        )
    }
}

/// Mutable fields of a schedule entry (the update payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScheduleFields")]
pub struct ScheduleFields {
    pub course_id: CourseId,
    pub duration_minutes: u32,
}

#[derive(Deserialize)]
struct RawScheduleFields {
    course_id: CourseId,
    duration_minutes: u32,
}

impl TryFrom<RawScheduleFields> for ScheduleFields {
    type Error = ModelError;

    fn try_from(raw: RawScheduleFields) -> Result<Self, Self::Error> {
        ScheduleFields::new(raw.course_id, raw.duration_minutes)
    }
}

impl ScheduleFields {
    pub fn new(course_id: CourseId, duration_minutes: u32) -> Result<Self, ModelError> {
        if duration_minutes == 0 || duration_minutes > MAX_DURATION_MINUTES {
            return Err(ModelError::InvalidDuration(duration_minutes));
        }
        Ok(Self {
            course_id,
            duration_minutes,
        })
    }
}

/// A desired placement: slot plus the fields it should hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntryDraft {
    #[serde(flatten)]
    pub key: NaturalKey,
    #[serde(flatten)]
    pub fields: ScheduleFields,
}

impl ScheduleEntryDraft {
    pub fn new(key: NaturalKey, fields: ScheduleFields) -> Self {
        Self { key, fields }
    }
}

/// A persisted schedule row.
///
/// `id` is assigned by the backend and may change when a row is swept and
/// recreated; do not hold on to it across a placement retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: ScheduleEntryId,
    #[serde(flatten)]
    pub key: NaturalKey,
    #[serde(flatten)]
    pub fields: ScheduleFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleEntry {
    /// Whether the row already holds the fields of `draft`.
    pub fn matches(&self, draft: &ScheduleEntryDraft) -> bool {
        self.key == draft.key && self.fields == draft.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_of_week_is_monday_first() {
        assert_eq!(DayOfWeek::from_index(0).unwrap(), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::from_index(6).unwrap(), DayOfWeek::Sunday);
        assert!(DayOfWeek::from_index(7).is_err());
        assert!(DayOfWeek::from_index(-1).is_err());
    }

    #[test]
    fn test_time_slot_labels() {
        assert_eq!(TimeSlot::from_label("08:00").unwrap().index(), 0);
        assert_eq!(TimeSlot::from_label("10:00").unwrap().index(), 2);
        assert_eq!(TimeSlot::from_label("9:00").unwrap().index(), 1);
        assert_eq!(TimeSlot::from_label("20:00").unwrap().index(), 12);
        assert_eq!(TimeSlot::from_index(2).unwrap().to_string(), "10:00");
        for bad in ["07:00", "21:00", "10:30", "10", "ab:00", "10:0"] {
            assert!(TimeSlot::from_label(bad).is_err(), "accepted {:?}", bad);
        }
        assert!(TimeSlot::from_index(13).is_err());
    }

    #[test]
    fn test_draft_json_shape() {
        let json = r#"{
            "week_year": 2025, "week_number": 32, "category": "regular",
            "instructor_id": "I1", "day_of_week": 1, "time_slot": "10:00",
            "course_id": "C1", "duration_minutes": 90
        }"#;
        let draft: ScheduleEntryDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.key.week, IsoWeek::new(2025, 32).unwrap());
        assert_eq!(draft.key.day_of_week, DayOfWeek::Tuesday);
        assert_eq!(draft.key.time_slot.index(), 2);
        assert_eq!(draft.fields.course_id.as_str(), "C1");

        let back = serde_json::to_value(&draft).unwrap();
        assert_eq!(back["time_slot"], "10:00");
        assert_eq!(back["day_of_week"], 1);
        assert_eq!(back["week_number"], 32);
    }

    #[test]
    fn test_draft_accepts_slot_index() {
        let json = r#"{
            "week_year": 2025, "week_number": 32, "category": "regular",
            "instructor_id": "I1", "day_of_week": 0, "time_slot": 12,
            "course_id": "C1", "duration_minutes": 60
        }"#;
        let draft: ScheduleEntryDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.key.time_slot.to_string(), "20:00");
    }

    #[test]
    fn test_draft_rejects_out_of_range_fields() {
        let base = |day: &str, slot: &str, duration: &str, instructor: &str| {
            format!(
                r#"{{"week_year":2025,"week_number":32,"category":"regular","instructor_id":{},"day_of_week":{},"time_slot":{},"course_id":"C1","duration_minutes":{}}}"#,
                instructor, day, slot, duration
            )
        };
        assert!(serde_json::from_str::<ScheduleEntryDraft>(&base("7", "\"10:00\"", "60", "\"I1\"")).is_err());
        assert!(serde_json::from_str::<ScheduleEntryDraft>(&base("1", "13", "60", "\"I1\"")).is_err());
        assert!(serde_json::from_str::<ScheduleEntryDraft>(&base("1", "\"10:00\"", "0", "\"I1\"")).is_err());
        assert!(serde_json::from_str::<ScheduleEntryDraft>(&base("1", "\"10:00\"", "60", "\"  \"")).is_err());
        assert!(serde_json::from_str::<ScheduleEntryDraft>(&base("1", "\"10:00\"", "60", "\"I1\"")).is_ok());
    }

    #[test]
    fn test_key_types_trim() {
        let id = InstructorId::parse("  I1 ").unwrap();
        assert_eq!(id.as_str(), "I1");
        assert!(CourseId::parse("").is_err());
    }
}
