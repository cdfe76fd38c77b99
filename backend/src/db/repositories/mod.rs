//! Repository implementations module.
//!
//! This module contains the implementations of the `ScheduleRepository` trait:
//! - `postgres`: hosted PostgreSQL implementation with Diesel ORM
//! - `local`: In-memory implementation with simulated row-level security,
//!   for unit testing and local development
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

pub use local::{InjectedFailure, LocalOperation, LocalRepository, OperationCounts, RowAccess};
#[cfg(feature = "postgres-repo")]
pub use postgres::{PostgresConfig, PostgresRepository};
