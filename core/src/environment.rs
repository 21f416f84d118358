//! Environment traits injected into the join coordinator.
//!
//! All external dependencies are abstracted behind traits so tests can swap
//! in fixed clocks and scripted notifiers.

use crate::notification::DeliveryNotification;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Errors from a single delivery attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The request never completed (connection refused, timeout, DNS)
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("delivery rejected with status {status}")]
    Rejected {
        /// HTTP status code returned by the endpoint
        status: u16,
    },

    /// The request could not be built for this notification
    #[error("unsendable notification: {0}")]
    Unsendable(String),
}

impl DeliveryError {
    /// Whether another attempt may succeed.
    ///
    /// Only transport failures are retried. A rejection is a terminal answer
    /// and an unsendable notification fails the same way on every attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Future returned by [`Notifier::deliver`].
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;

/// Sends one delivery notification to the downstream endpoint.
///
/// Implementations perform exactly one attempt per call; retrying is the
/// caller's concern.
///
/// # Dyn Compatibility
///
/// Uses an explicit `Pin<Box<dyn Future>>` return instead of `async fn` so
/// the coordinator can hold an `Arc<dyn Notifier>`.
pub trait Notifier: Send + Sync {
    /// Attempts one delivery.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::Transport`] if the request did not complete
    /// - [`DeliveryError::Rejected`] if the endpoint returned a non-2xx status
    /// - [`DeliveryError::Unsendable`] if no request can be built for it
    fn deliver<'a>(&'a self, notification: &'a DeliveryNotification) -> DeliveryFuture<'a>;
}
