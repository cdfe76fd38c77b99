//! Repository trait definitions for database operations.
//!
//! The portal talks to its hosted database through a deliberately small
//! surface: exact-match select on the natural key, update by id, insert,
//! delete by id, plus the read queries behind the week views.
//!
//! # Module Organization
//!
//! - [`error`]: Error taxonomy for repository operations
//! - [`schedule`]: The [`ScheduleRepository`] trait and query types
//!
//! Implementations live in [`crate::db::repositories`].

pub mod error;
pub mod schedule;

// Re-export error types
pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use schedule::{ScheduleRepository, WeekQuery};
