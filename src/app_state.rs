//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::Store;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Storage gateway shared with the ingestion jobs.
    pub store: Arc<dyn Store>,
    /// Window within which a machine counts as online.
    pub liveness: chrono::Duration,
}
