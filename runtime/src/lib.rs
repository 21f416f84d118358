//! # Order Confirmation Runtime
//!
//! Concurrent machinery around the pure rules in `order-confirmation-core`.
//!
//! ## Core Components
//!
//! - **Correlation Store**: one lock-protected record per order, created on first touch
//! - **Join Coordinator**: merges each report and fires exactly one notification per order
//! - **Notifier**: HTTP delivery with exponential backoff for transport failures
//! - **Metrics**: Prometheus counters for reports, completions and deliveries
//!
//! ## Example
//!
//! ```no_run
//! use order_confirmation_core::environment::SystemClock;
//! use order_confirmation_core::report::Report;
//! use order_confirmation_core::order::Dimension;
//! use order_confirmation_runtime::coordinator::{JoinCoordinator, JoinEnvironment};
//! use order_confirmation_runtime::notifier::HttpNotifier;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let notifier = HttpNotifier::new("http://localhost:9000/delivery/{order_id}", Duration::from_secs(10))?;
//! let coordinator = JoinCoordinator::new(JoinEnvironment {
//!     clock: Arc::new(SystemClock),
//!     notifier: Arc::new(notifier),
//! });
//!
//! let body = br#"{"reference_id":"de-ber-76898","risk_points":10}"#;
//! let submission = coordinator.submit(Report::decode(Dimension::Fraud, body)?).await;
//! assert!(submission.delivery.is_none());
//! # Ok(())
//! # }
//! ```

/// Join coordinator and the exactly-once readiness transition
pub mod coordinator;

/// Prometheus metrics for observability
pub mod metrics;

/// HTTP delivery and the retrying attempt-chain
pub mod notifier;

/// Retry logic with exponential backoff
pub mod retry;

/// Keyed store of order records
pub mod store;

pub use coordinator::{JoinCoordinator, JoinEnvironment, MergeReceipt, Submission};
pub use notifier::{DeliveryOutcome, HttpNotifier, NotifierError, deliver_with_retry};
pub use retry::{Attempted, RetryPolicy};
pub use store::{CorrelationStore, OrderEntry};
