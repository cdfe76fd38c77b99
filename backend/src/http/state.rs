//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::ServerSettings;
use crate::db::repository::ScheduleRepository;
use crate::services::{IncidentLog, ScheduleReconciler};
use crate::storage::FileStore;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn ScheduleRepository>,
    /// Placement orchestration over the same repository
    pub reconciler: ScheduleReconciler,
    /// Degraded placements, shared with the reconciler
    pub incidents: IncidentLog,
    /// Course material file proxy
    pub files: Arc<dyn FileStore>,
    pub settings: Arc<ServerSettings>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn ScheduleRepository>,
        files: Arc<dyn FileStore>,
        settings: ServerSettings,
    ) -> Self {
        let incidents = IncidentLog::with_capacity(settings.incident_capacity);
        let reconciler = ScheduleReconciler::new(repository.clone(), incidents.clone());
        Self {
            repository,
            reconciler,
            incidents,
            files,
            settings: Arc::new(settings),
        }
    }
}
