//! ISO-8601 week coordinates and week-key derivation.
//!
//! Schedule entries are bucketed by ISO week: weeks run Monday to Sunday and
//! week 1 is the week containing the year's first Thursday. The ISO week-year
//! differs from the calendar year for a few days around New Year, so every
//! key is built from [`IsoWeek`] rather than from `date.year()`.
//!
//! The persisted key format is `<category>_<isoWeekYear>_W<NN>`, e.g.
//! `regular_2025_W32`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::schedule::{DayOfWeek, ScheduleCategory};

/// Derive the week key for `date` within `category`.
///
/// Total over every representable calendar date; the category is used
/// verbatim.
pub fn derive_week_key(date: NaiveDate, category: &str) -> String {
    let week = IsoWeek::from_date(date);
    format_week_key(category, week)
}

fn format_week_key(category: &str, week: IsoWeek) -> String {
    format!("{}_{}_W{:02}", category, week.year, week.week)
}

/// An ISO-8601 (week-year, week-number) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIsoWeek")]
pub struct IsoWeek {
    year: i32,
    week: u32,
}

#[derive(Deserialize)]
struct RawIsoWeek {
    year: i32,
    week: u32,
}

impl TryFrom<RawIsoWeek> for IsoWeek {
    type Error = ModelError;

    fn try_from(raw: RawIsoWeek) -> Result<Self, Self::Error> {
        IsoWeek::new(raw.year, raw.week)
    }
}

impl IsoWeek {
    /// Build a week, rejecting week numbers the ISO year does not have.
    pub fn new(year: i32, week: u32) -> Result<Self, ModelError> {
        if week == 0 || week > 53 {
            return Err(ModelError::InvalidWeek { year, week });
        }
        match weeks_in_year(year) {
            Some(max) if week <= max => Ok(Self { year, week }),
            _ => Err(ModelError::InvalidWeek { year, week }),
        }
    }

    /// The ISO week containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// ISO week-year (may differ from the calendar year of some member days).
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Week number, 1..=53.
    pub fn week(&self) -> u32 {
        self.week
    }

    /// Monday of this week.
    pub fn monday(&self) -> NaiveDate {
        self.date_of(DayOfWeek::Monday)
    }

    /// Calendar date of `day` within this week.
    pub fn date_of(&self, day: DayOfWeek) -> NaiveDate {
        // `new` and `from_date` only admit weeks chrono can represent.
        NaiveDate::from_isoywd_opt(self.year, self.week, day.to_weekday())
            .unwrap_or(NaiveDate::MIN)
    }

    /// Monday..Sunday dates of this week.
    pub fn days(&self) -> [NaiveDate; 7] {
        let monday = self.monday();
        std::array::from_fn(|offset| monday + chrono::Duration::days(offset as i64))
    }

    /// The following ISO week.
    pub fn next(&self) -> Self {
        Self::from_date(self.monday() + chrono::Duration::days(7))
    }

    /// The preceding ISO week.
    pub fn previous(&self) -> Self {
        Self::from_date(self.monday() - chrono::Duration::days(7))
    }

    /// Week key for this week within `category`.
    pub fn key(&self, category: &str) -> String {
        format_week_key(category, *self)
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Number of ISO weeks (52 or 53) in `year`, `None` outside chrono's range.
pub fn weeks_in_year(year: i32) -> Option<u32> {
    // Dec 28 always falls in the last ISO week of its year.
    NaiveDate::from_ymd_opt(year, 12, 28).map(|d| d.iso_week().week())
}

/// Parsed form of a week key: category plus ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeekKey {
    pub category: ScheduleCategory,
    pub week: IsoWeek,
}

impl WeekKey {
    pub fn new(category: ScheduleCategory, week: IsoWeek) -> Self {
        Self { category, week }
    }

    /// Key of the week containing `date`.
    pub fn for_date(date: NaiveDate, category: ScheduleCategory) -> Self {
        Self {
            category,
            week: IsoWeek::from_date(date),
        }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_week_key(self.category.as_str(), self.week))
    }
}

impl FromStr for WeekKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ModelError::InvalidWeekKey(s.to_string());

        // Split from the right so categories may themselves contain '_'.
        let (rest, week_part) = s.rsplit_once('_').ok_or_else(malformed)?;
        let (category, year_part) = rest.rsplit_once('_').ok_or_else(malformed)?;

        let digits = week_part.strip_prefix('W').ok_or_else(malformed)?;
        if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let week: u32 = digits.parse().map_err(|_| malformed())?;
        let year: i32 = year_part.parse().map_err(|_| malformed())?;

        let category = ScheduleCategory::parse(category).map_err(|_| malformed())?;
        let week = IsoWeek::new(year, week)?;
        Ok(Self { category, week })
    }
}

impl Serialize for WeekKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl DayOfWeek {
    fn to_weekday(self) -> Weekday {
        match self {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }

    /// Day of week of a calendar date.
    pub fn of_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}
