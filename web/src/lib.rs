//! HTTP shell for the order confirmation join.
//!
//! Routes the three inbound webhooks to the join coordinator and owns no
//! business rules of its own.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON decoding
//! │  - Webhook routing                      │  ← Request ids, tracing
//! │  - Configuration, metrics endpoint      │
//! ├─────────────────────────────────────────┤
//! │         Join Engine                     │
//! │  - Correlation store, merge rules       │  ← Per-order locking
//! │  - Exactly-once completion              │  ← Atomic guard
//! │  - Retrying delivery                    │  ← Detached task
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at one of the webhook handlers
//! 2. **Decode** the body as the handler's report type (400 on failure)
//! 3. **Submit** the report to the `JoinCoordinator`
//! 4. **Acknowledge** with `"success"` once the merge is done
//! 5. **Deliver** in the background if the report completed the order

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use config::{ConfigError, ServiceConfig};
pub use error::AppError;
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
