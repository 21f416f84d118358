//! HTTP request handlers.

pub mod health;
pub mod webhooks;

pub use health::{health_check, metrics};
pub use webhooks::{fraud_check, payment_confirmation, vendor_confirmation};
