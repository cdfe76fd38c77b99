//! # Schedule Portal Backend
//!
//! Weekly course scheduling for instructors: entries are keyed by ISO week,
//! category, instructor, weekday and hourly slot, and written through a
//! create-or-update reconciler that copes with row-level access policies.
//!
//! ## Architecture
//!
//! - [`models`]: Week keys, slots and schedule entry types
//! - [`db`]: Repository trait, local and PostgreSQL backends, configuration
//! - [`services`]: Slot lookup, placement reconciler, stale-row sweeper, incident log
//! - [`storage`]: Course material file store (in-memory or Drive-backed)
//! - [`config`]: Application configuration file and environment overrides
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;

#[cfg(feature = "http-server")]
pub mod http;
