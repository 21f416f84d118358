//! Prometheus metrics for the join pipeline.
//!
//! Covers:
//! - Inbound reports by dimension and merge outcome
//! - Completed orders by status and their processing time
//! - Orders currently held in the correlation store
//! - Delivery attempts and final delivery outcomes
//!
//! # Example
//!
//! ```rust,no_run
//! use order_confirmation_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // Text exposition for a `/metrics` route
//! let body = exporter.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use order_confirmation_core::order::{Dimension, MergeOutcome, OrderStatus};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder installed once per process.
///
/// Rendering goes through the handle so the web crate can serve the text
/// from its own router.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter with no recorder installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe all metrics and install the global Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by an earlier test), this
    /// logs a warning and succeeds without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                    60.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "order_reports_total",
        "Inbound reports merged, by dimension and outcome"
    );
    describe_counter!(
        "orders_completed_total",
        "Orders finalized, by terminal status"
    );
    describe_gauge!(
        "orders_tracked",
        "Orders currently held in the correlation store"
    );
    describe_histogram!(
        "order_processing_duration_seconds",
        "Time from first report to finalization"
    );
    describe_counter!(
        "order_delivery_attempts_total",
        "Delivery requests sent downstream, retries included"
    );
    describe_counter!(
        "order_deliveries_total",
        "Finished delivery attempt-chains, by outcome"
    );
}

/// Inbound report metrics recorder.
pub struct ReportMetrics;

impl ReportMetrics {
    /// Record one merged report.
    pub fn record(dimension: Dimension, outcome: MergeOutcome) {
        counter!(
            "order_reports_total",
            "dimension" => dimension.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }
}

/// Join completion metrics recorder.
pub struct JoinMetrics;

impl JoinMetrics {
    /// Record a finalized order.
    pub fn record_completed(status: OrderStatus, processing: Duration) {
        counter!("orders_completed_total", "status" => status.as_str()).increment(1);
        histogram!("order_processing_duration_seconds").record(processing.as_secs_f64());
    }
}

/// Correlation store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record the number of tracked orders.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_tracked(count: usize) {
        gauge!("orders_tracked").set(count as f64);
    }
}

/// Delivery metrics recorder.
pub struct DeliveryMetrics;

impl DeliveryMetrics {
    /// Record one request sent downstream.
    pub fn record_attempt() {
        counter!("order_delivery_attempts_total").increment(1);
    }

    /// Record the end of an attempt-chain.
    pub fn record_outcome(outcome: &'static str) {
        counter!("order_deliveries_total", "outcome" => outcome).increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn test_exporter_creation() {
        let exporter = MetricsExporter::new();
        assert!(exporter.handle().is_none());
        assert!(exporter.render().is_none());
    }

    #[test]
    fn test_exporter_install_and_render() {
        let mut exporter = MetricsExporter::new();
        exporter.install().unwrap();

        ReportMetrics::record(Dimension::Fraud, MergeOutcome::Failed);
        JoinMetrics::record_completed(OrderStatus::Errored, Duration::from_millis(12));
        StoreMetrics::record_tracked(3);
        DeliveryMetrics::record_attempt();
        DeliveryMetrics::record_outcome("delivered");

        // Another test binary thread may have installed the recorder first.
        // Metrics are still recorded globally in that case.
        if let Some(rendered) = exporter.render() {
            assert!(rendered.contains("order_reports_total"));
            assert!(rendered.contains("dimension=\"fraud\""));
            assert!(rendered.contains("orders_completed_total"));
            assert!(rendered.contains("orders_tracked"));
            assert!(rendered.contains("order_deliveries_total"));
        }
    }
}
