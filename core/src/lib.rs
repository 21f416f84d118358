//! # Order Confirmation Core
//!
//! Domain types and pure rules for joining three independently delivered
//! reports (payment, fraud check, vendor confirmation) into one order outcome.
//!
//! ## Core Concepts
//!
//! - **Report**: one decoded inbound message for a single [`Dimension`]
//! - **Order Record**: the per-order join state every report is folded into
//! - **Readiness**: all three dimensions have reported in
//! - **Outcome**: the immutable snapshot produced when a record is finalized
//! - **Environment**: injected dependencies (`Clock`, `Notifier`)
//!
//! Nothing in this crate performs I/O or locking. The runtime crate owns the
//! concurrent store, the join coordinator and the HTTP notifier.
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use order_confirmation_core::order::{DuplicatePolicy, OrderId, OrderRecord, OrderStatus};
//! use order_confirmation_core::report::{FraudCheck, PaymentConfirmation, Report, VendorConfirmation};
//!
//! let order_id = OrderId::new("de-ber-76898");
//! let mut record = OrderRecord::new(order_id.clone(), Utc::now());
//!
//! let reports: [Report; 3] = [
//!     PaymentConfirmation::new(order_id.clone(), 2000, "confirmed").into(),
//!     FraudCheck::new(order_id.clone(), 10).into(),
//!     VendorConfirmation::new(order_id, "confirmed").into(),
//! ];
//! for report in &reports {
//!     record.apply(report, DuplicatePolicy::Reapply);
//! }
//!
//! assert!(record.is_ready());
//! let outcome = record.finalize(Utc::now()).unwrap();
//! assert_eq!(outcome.status, OrderStatus::Confirmed);
//! ```

pub mod environment;
pub mod notification;
pub mod order;
pub mod report;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, DeliveryError, Notifier, SystemClock};
pub use notification::DeliveryNotification;
pub use order::{
    Dimension, DuplicatePolicy, FinalizeError, MergeOutcome, OrderId, OrderOutcome, OrderRecord,
    OrderStatus,
};
pub use report::{DecodeError, FraudCheck, PaymentConfirmation, Report, VendorConfirmation};
