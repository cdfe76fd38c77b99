//! Validation errors raised while building domain values at the boundary.

/// Error produced when raw input cannot be turned into a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("{0} must not be empty")]
    EmptyKey(&'static str),

    #[error("ISO year {year} has no week {week}")]
    InvalidWeek { year: i32, week: u32 },

    #[error("day_of_week must be in 0..=6 (0 = Monday), got {0}")]
    InvalidDay(i64),

    #[error("time slot must be an index in 0..=12 or an on-the-hour time between 08:00 and 20:00, got {0:?}")]
    InvalidSlot(String),

    #[error("duration_minutes must be in 1..=720, got {0}")]
    InvalidDuration(u32),

    #[error("malformed week key {0:?}, expected <category>_<year>_W<NN>")]
    InvalidWeekKey(String),
}
