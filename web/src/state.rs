//! Application state for Axum handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use order_confirmation_runtime::coordinator::JoinCoordinator;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Join engine every webhook hands its report to
    pub coordinator: JoinCoordinator,
    /// Prometheus handle, present when this process installed the recorder
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create application state without metrics rendering.
    #[must_use]
    pub const fn new(coordinator: JoinCoordinator) -> Self {
        Self {
            coordinator,
            metrics: None,
        }
    }

    /// Attach the handle used to render `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}
