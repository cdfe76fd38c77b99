//! Service layer for schedule placement.
//!
//! This module contains the orchestration that sits between the HTTP layer
//! and the repository: locating a slot, reconciling a desired entry against
//! what the backend lets the caller see and write, sweeping stale rows, and
//! recording degraded placements.

pub mod incidents;
pub mod locator;
pub mod reconciler;
pub mod sweeper;

pub use incidents::{DegradeReason, Incident, IncidentLog, DEFAULT_INCIDENT_CAPACITY};
pub use locator::find_slot;
pub use reconciler::{Placement, PlacementOutcome, ReconcileStep, ScheduleReconciler};
pub use sweeper::{sweep_and_recreate, SweepError};
