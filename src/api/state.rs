//! Application state for the API server

use crate::IngestConfig;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// Base ingestion options; each route picks its own storage mode
    pub config: Arc<IngestConfig>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(config: Arc<IngestConfig>) -> Self {
        Self { config }
    }
}
