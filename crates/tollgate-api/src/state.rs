//! Application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tollgate_core::{AccountService, SessionManager};

/// Handle used to render the Prometheus scrape output
pub type MetricsHandle = PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub accounts: AccountService,
}

impl AppState {
    pub fn new(sessions: Arc<SessionManager>, accounts: AccountService) -> Self {
        Self { sessions, accounts }
    }
}
