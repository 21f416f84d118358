//! Join coordinator: merges each report and fires the single notification.
//!
//! Every inbound report goes through [`JoinCoordinator::submit`]. The merge
//! happens under the record's lock. When the merge completes the join, the
//! caller that wins the entry's atomic guard finalizes the record and hands
//! the outcome to a detached delivery task, so the inbound caller is
//! acknowledged without waiting on the network.

use crate::metrics::{JoinMetrics, ReportMetrics};
use crate::notifier::{DeliveryOutcome, deliver_with_retry};
use crate::retry::RetryPolicy;
use crate::store::CorrelationStore;
use order_confirmation_core::environment::{Clock, Notifier};
use order_confirmation_core::notification::DeliveryNotification;
use order_confirmation_core::order::{
    Dimension, DuplicatePolicy, MergeOutcome, OrderId, OrderOutcome, OrderStatus,
};
use order_confirmation_core::report::Report;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What happened to one submitted report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReceipt {
    /// Order the report belongs to
    pub order_id: OrderId,
    /// Dimension the report filled in
    pub dimension: Dimension,
    /// Result of the merge
    pub outcome: MergeOutcome,
    /// Terminal status if this report completed the join
    pub completed: Option<OrderStatus>,
}

/// Receipt plus the delivery task, when this report completed the join.
#[derive(Debug)]
pub struct Submission {
    /// Merge result
    pub receipt: MergeReceipt,
    /// Delivery task; dropping the handle leaves it running detached
    pub delivery: Option<JoinHandle<DeliveryOutcome>>,
}

/// Dependencies injected into the coordinator.
#[derive(Clone)]
pub struct JoinEnvironment {
    /// Time source for start and finish timestamps
    pub clock: Arc<dyn Clock>,
    /// Downstream delivery
    pub notifier: Arc<dyn Notifier>,
}

/// Coordinates merges and the exactly-once readiness transition.
#[derive(Clone)]
pub struct JoinCoordinator {
    store: Arc<CorrelationStore>,
    environment: JoinEnvironment,
    retry_policy: RetryPolicy,
    duplicate_policy: DuplicatePolicy,
}

impl JoinCoordinator {
    /// Creates a coordinator over an empty store.
    #[must_use]
    pub fn new(environment: JoinEnvironment) -> Self {
        Self {
            store: Arc::new(CorrelationStore::new()),
            environment,
            retry_policy: RetryPolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    /// Sets the retry policy used for deliveries.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets how redelivered reports are treated.
    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// The underlying store, for inspection.
    #[must_use]
    pub fn store(&self) -> &Arc<CorrelationStore> {
        &self.store
    }

    /// Merges `report` and, if it completes the join, starts delivery.
    #[tracing::instrument(skip(self, report), fields(order_id = %report.order_id(), dimension = %report.dimension()))]
    pub async fn submit(&self, report: Report) -> Submission {
        let order_id = report.order_id().clone();
        let dimension = report.dimension();

        let entry = self
            .store
            .get_or_create(&order_id, self.environment.clock.now())
            .await;

        let (outcome, finalized) = {
            let mut record = entry.lock().await;
            let outcome = record.apply(&report, self.duplicate_policy);

            let finalized = if record.is_ready() && entry.try_claim_notification() {
                match record.finalize(self.environment.clock.now()) {
                    Ok(finalized) => Some(finalized),
                    Err(err) => {
                        tracing::error!(error = %err, "Join guard claimed but finalization failed");
                        None
                    },
                }
            } else {
                None
            };
            (outcome, finalized)
        };

        ReportMetrics::record(dimension, outcome);
        tracing::debug!(outcome = outcome.as_str(), "Report merged");

        let completed = finalized.as_ref().map(|finalized| finalized.status);
        let delivery = finalized.map(|finalized| self.spawn_delivery(finalized));

        Submission {
            receipt: MergeReceipt {
                order_id,
                dimension,
                outcome,
                completed,
            },
            delivery,
        }
    }

    fn spawn_delivery(&self, outcome: OrderOutcome) -> JoinHandle<DeliveryOutcome> {
        tracing::info!(
            status = %outcome.status,
            amount = outcome.amount,
            confirmations_failed = outcome.failure_reasons.len(),
            processing_time_ms = outcome.processing_duration.as_millis(),
            "Order complete, delivering confirmation"
        );
        JoinMetrics::record_completed(outcome.status, outcome.processing_duration);

        let notifier = Arc::clone(&self.environment.notifier);
        let policy = self.retry_policy.clone();
        let notification = DeliveryNotification::from(&outcome);

        tokio::spawn(async move { deliver_with_retry(notifier.as_ref(), &policy, &notification).await })
    }
}
