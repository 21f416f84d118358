//! Downstream delivery over HTTP and the retrying attempt-chain around it.

use crate::metrics::DeliveryMetrics;
use crate::retry::{Attempted, RetryPolicy, retry_with_predicate};
use order_confirmation_core::environment::{DeliveryError, DeliveryFuture, Notifier};
use order_confirmation_core::notification::DeliveryNotification;
use std::time::Duration;
use thiserror::Error;

/// Placeholder substituted with the order id in the endpoint URL.
pub const ORDER_ID_PLACEHOLDER: &str = "{order_id}";

/// Errors constructing an [`HttpNotifier`].
#[derive(Error, Debug)]
pub enum NotifierError {
    /// The endpoint is not a usable URL
    #[error("invalid delivery endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Delivers notifications with an HTTP `PUT` of the JSON body.
///
/// A 2xx response is success. Any other status is a [`DeliveryError::Rejected`];
/// connection failures and timeouts are [`DeliveryError::Transport`]. A
/// notification that cannot be turned into a request is
/// [`DeliveryError::Unsendable`] and never reaches the network.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    /// Creates a notifier for `endpoint` with a per-request `timeout`.
    ///
    /// The endpoint may contain `{order_id}`, replaced on every delivery.
    ///
    /// # Errors
    ///
    /// - [`NotifierError::InvalidEndpoint`] if the endpoint is not an
    ///   `http` or `https` URL
    /// - [`NotifierError::Client`] if the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotifierError> {
        let endpoint = endpoint.into();
        let probe = endpoint.replace(ORDER_ID_PLACEHOLDER, "probe");
        let url = reqwest::Url::parse(&probe).map_err(|e| NotifierError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NotifierError::InvalidEndpoint {
                endpoint,
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// URL a notification for `order_id` is sent to.
    ///
    /// The id is percent-encoded as a single path segment, so it cannot
    /// add segments, a query or a fragment to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Unsendable`] for `.` and `..`, which URL
    /// normalization would resolve as path navigation even when encoded.
    pub fn url_for(&self, order_id: &str) -> Result<String, DeliveryError> {
        if !self.endpoint.contains(ORDER_ID_PLACEHOLDER) {
            return Ok(self.endpoint.clone());
        }
        if matches!(order_id, "." | "..") {
            return Err(DeliveryError::Unsendable(format!(
                "order id '{order_id}' cannot be used as a path segment"
            )));
        }
        Ok(self
            .endpoint
            .replace(ORDER_ID_PLACEHOLDER, &urlencoding::encode(order_id)))
    }
}

impl Notifier for HttpNotifier {
    fn deliver<'a>(&'a self, notification: &'a DeliveryNotification) -> DeliveryFuture<'a> {
        Box::pin(async move {
            let url = self.url_for(notification.order_id.as_str())?;
            let body = notification
                .to_json()
                .map_err(|e| DeliveryError::Unsendable(format!("failed to encode body: {e}")))?;

            let response = self
                .client
                .put(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| DeliveryError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(DeliveryError::Rejected {
                    status: status.as_u16(),
                })
            }
        })
    }
}

/// How an attempt-chain for one notification ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint accepted the notification
    Delivered {
        /// Attempts made, first try included
        attempts: usize,
    },
    /// The endpoint answered with a non-success status; not retried
    Rejected {
        /// HTTP status returned
        status: u16,
        /// Attempts made, first try included
        attempts: usize,
    },
    /// Every attempt failed at the transport level
    Exhausted {
        /// Attempts made, first try included
        attempts: usize,
        /// Error from the final attempt
        last_error: DeliveryError,
    },
    /// No request could be built; not retried
    Failed {
        /// Attempts made, first try included
        attempts: usize,
        /// Why the notification could not be sent
        error: DeliveryError,
    },
}

impl DeliveryOutcome {
    /// Attempts made, whatever the outcome.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        match self {
            Self::Delivered { attempts }
            | Self::Rejected { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Failed { attempts, .. } => *attempts,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Rejected { .. } => "rejected",
            Self::Exhausted { .. } => "exhausted",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Delivers `notification`, retrying transport failures under `policy`.
///
/// Rejections end the chain immediately. The outcome is logged and counted;
/// nothing is escalated further.
pub async fn deliver_with_retry(
    notifier: &dyn Notifier,
    policy: &RetryPolicy,
    notification: &DeliveryNotification,
) -> DeliveryOutcome {
    let result = retry_with_predicate(
        policy,
        || {
            DeliveryMetrics::record_attempt();
            notifier.deliver(notification)
        },
        DeliveryError::is_transient,
    )
    .await;

    let outcome = match result {
        Ok(Attempted { attempts, .. }) => DeliveryOutcome::Delivered { attempts },
        Err(Attempted {
            value: DeliveryError::Rejected { status },
            attempts,
        }) => DeliveryOutcome::Rejected { status, attempts },
        Err(Attempted {
            value: error @ DeliveryError::Unsendable(_),
            attempts,
        }) => DeliveryOutcome::Failed { attempts, error },
        Err(Attempted {
            value: last_error,
            attempts,
        }) => DeliveryOutcome::Exhausted {
            attempts,
            last_error,
        },
    };

    let order_id = notification.order_id.as_str();
    match &outcome {
        DeliveryOutcome::Delivered { attempts } => {
            tracing::info!(order_id, attempts, status = %notification.status, "Delivery confirmed");
        },
        DeliveryOutcome::Rejected { status, attempts } => {
            tracing::warn!(
                order_id,
                attempts,
                http_status = status,
                "Delivery rejected by endpoint, not retrying"
            );
        },
        DeliveryOutcome::Exhausted {
            attempts,
            last_error,
        } => {
            tracing::error!(
                order_id,
                attempts,
                error = %last_error,
                "Delivery failed after max retries"
            );
        },
        DeliveryOutcome::Failed { error, .. } => {
            tracing::error!(order_id, error = %error, "Delivery abandoned, notification unsendable");
        },
    }
    DeliveryMetrics::record_outcome(outcome.as_str());

    outcome
}
