//! Outbound delivery notification sent once per completed order.

use crate::order::{Dimension, OrderId, OrderOutcome, OrderStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON body delivered to the downstream confirmation endpoint.
///
/// The order id travels alongside the body (it fills the endpoint's
/// `{order_id}` placeholder) and is not serialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNotification {
    /// Order being reported
    #[serde(skip)]
    pub order_id: OrderId,
    /// `confirmed` or `errored`
    pub status: OrderStatus,
    /// Amount from the payment report
    pub amount: i64,
    /// Failure tags; an empty array when nothing failed
    #[serde(default)]
    pub confirmations_failed: Vec<Dimension>,
    /// Processing time as whole milliseconds, e.g. `"12ms"`
    pub processing_time_ms: String,
}

impl DeliveryNotification {
    /// Serializes the body.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<&OrderOutcome> for DeliveryNotification {
    fn from(outcome: &OrderOutcome) -> Self {
        Self {
            order_id: outcome.order_id.clone(),
            status: outcome.status,
            amount: outcome.amount,
            confirmations_failed: outcome.failure_reasons.clone(),
            processing_time_ms: format_millis(outcome.processing_duration),
        }
    }
}

fn format_millis(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}
