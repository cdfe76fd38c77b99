//! Domain model: ISO week coordinates and schedule entries.

pub mod macros;

pub mod error;
pub mod schedule;
pub mod week;

pub use error::ModelError;
pub use schedule::*;
pub use week::{derive_week_key, weeks_in_year, IsoWeek, WeekKey};
