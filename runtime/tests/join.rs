//! Integration tests for the join coordinator
//!
//! Drives complete orders through `JoinCoordinator::submit` with a recording
//! notifier and checks the single consolidated notification per order.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use order_confirmation_core::environment::Notifier;
use order_confirmation_core::notification::DeliveryNotification;
use order_confirmation_core::order::{Dimension, DuplicatePolicy, MergeOutcome, OrderId, OrderStatus};
use order_confirmation_core::report::Report;
use order_confirmation_runtime::{DeliveryOutcome, JoinCoordinator, JoinEnvironment};
use order_confirmation_testing::mocks::FixedClock;
use order_confirmation_testing::properties::{arrival_order, failure_flags};
use order_confirmation_testing::{RecordingNotifier, fraud, order_reports, payment, test_clock, vendor};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

fn coordinator_with(clock: Arc<FixedClock>, notifier: &Arc<RecordingNotifier>) -> JoinCoordinator {
    JoinCoordinator::new(JoinEnvironment {
        clock,
        notifier: Arc::clone(notifier) as Arc<dyn Notifier>,
    })
}

fn coordinator(notifier: &Arc<RecordingNotifier>) -> JoinCoordinator {
    coordinator_with(Arc::new(test_clock()), notifier)
}

/// Submits every report and waits for the delivery, if any report started one.
async fn run(coordinator: &JoinCoordinator, reports: impl IntoIterator<Item = Report>) -> Option<DeliveryOutcome> {
    let mut outcome = None;
    for report in reports {
        if let Some(delivery) = coordinator.submit(report).await.delivery {
            assert!(outcome.is_none(), "join completed twice");
            outcome = Some(delivery.await.unwrap());
        }
    }
    outcome
}

fn wire(notification: &DeliveryNotification) -> serde_json::Value {
    serde_json::from_slice(&notification.to_json().unwrap()).unwrap()
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn scenario_all_confirmed() {
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = coordinator(&notifier);

    let outcome = run(
        &coordinator,
        [
            payment("de-ber-76898", 2000, "confirmed"),
            fraud("de-ber-76898", 10),
            vendor("de-ber-76898", "confirmed"),
        ],
    )
    .await;

    assert_eq!(outcome, Some(DeliveryOutcome::Delivered { attempts: 1 }));
    let delivered = notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(
        wire(&delivered[0]),
        json!({
            "status": "confirmed",
            "amount": 2000,
            "confirmations_failed": [],
            "processing_time_ms": "0ms",
        })
    );
}

#[tokio::test]
async fn scenario_payment_failed() {
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = coordinator(&notifier);

    run(
        &coordinator,
        [
            payment("de-ber-76898", 2000, "failed"),
            fraud("de-ber-76898", 10),
            vendor("de-ber-76898", "confirmed"),
        ],
    )
    .await;

    let value = wire(&notifier.delivered()[0]);
    assert_eq!(value["amount"], 2000);
    assert_eq!(value["status"], "errored");
    assert_eq!(value["confirmations_failed"], json!(["payment"]));
}

#[tokio::test]
async fn scenario_everything_failed() {
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = coordinator(&notifier);

    run(
        &coordinator,
        [
            payment("de-ber-76898", 2000, "failed"),
            fraud("de-ber-76898", 70),
            vendor("de-ber-76898", "rejected"),
        ],
    )
    .await;

    let value = wire(&notifier.delivered()[0]);
    assert_eq!(value["amount"], 2000);
    assert_eq!(value["status"], "errored");
    assert_eq!(
        value["confirmations_failed"],
        json!(["payment", "fraud", "vendor"])
    );
}

#[tokio::test]
async fn failure_tags_follow_merge_order() {
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = coordinator(&notifier);

    run(
        &coordinator,
        [
            vendor("a", "rejected"),
            fraud("a", 70),
            payment("a", 5, "failed"),
        ],
    )
    .await;

    assert_eq!(
        notifier.delivered()[0].confirmations_failed,
        vec![Dimension::Vendor, Dimension::Fraud, Dimension::Payment]
    );
}

#[tokio::test]
async fn processing_time_spans_first_report_to_completion() {
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(test_clock());
    let coordinator = coordinator_with(Arc::clone(&clock), &notifier);

    coordinator.submit(fraud("a", 10)).await;
    clock.advance(Duration::from_millis(20));
    coordinator.submit(payment("a", 1, "confirmed")).await;
    clock.advance(Duration::from_millis(5));
    let last = coordinator.submit(vendor("a", "confirmed")).await;
    last.delivery.unwrap().await.unwrap();

    assert_eq!(notifier.delivered()[0].processing_time_ms, "25ms");
    let record = coordinator.store().snapshot(&OrderId::new("a")).await.unwrap();
    assert_eq!(record.processing_duration(), Some(Duration::from_millis(25)));
}

// ============================================================================
// Duplicate and late reports
// ============================================================================

#[tokio::test]
async fn reapply_policy_records_redelivered_failure_twice() {
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = coordinator(&notifier);

    run(
        &coordinator,
        [
            payment("a", 1, "failed"),
            payment("a", 1, "failed"),
            fraud("a", 10),
            vendor("a", "confirmed"),
        ],
    )
    .await;

    assert_eq!(
        notifier.delivered()[0].confirmations_failed,
        vec![Dimension::Payment, Dimension::Payment]
    );
}

#[tokio::test]
async fn ignore_policy_drops_redelivered_report() {
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = coordinator(&notifier).with_duplicate_policy(DuplicatePolicy::Ignore);

    coordinator.submit(payment("a", 1, "failed")).await;
    let duplicate = coordinator.submit(payment("a", 1, "failed")).await;
    assert_eq!(duplicate.receipt.outcome, MergeOutcome::Duplicate);

    run(&coordinator, [fraud("a", 10), vendor("a", "confirmed")]).await;

    assert_eq!(
        notifier.delivered()[0].confirmations_failed,
        vec![Dimension::Payment]
    );
}

#[tokio::test]
async fn reports_after_completion_change_nothing() {
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = coordinator(&notifier);

    run(&coordinator, order_reports("a", 10, [false, false, false])).await;
    let late = run(&coordinator, order_reports("a", 10, [true, true, true])).await;

    assert!(late.is_none());
    assert_eq!(notifier.count_for("a"), 1);
    let record = coordinator.store().snapshot(&OrderId::new("a")).await.unwrap();
    assert_eq!(record.status(), OrderStatus::Confirmed);
    assert!(record.failure_reasons().is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reports_notify_exactly_once_per_order() {
    const ORDERS: usize = 200;

    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = coordinator(&notifier);

    let mut handles = Vec::new();
    for n in 0..ORDERS {
        let order_id = format!("order-{n}");
        for report in order_reports(&order_id, 100, [false, n % 3 == 0, false]) {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move { coordinator.submit(report).await }));
        }
    }

    let mut deliveries = Vec::new();
    for handle in handles {
        if let Some(delivery) = handle.await.unwrap().delivery {
            deliveries.push(delivery);
        }
    }
    for delivery in deliveries.drain(..) {
        assert_eq!(delivery.await.unwrap(), DeliveryOutcome::Delivered { attempts: 1 });
    }

    assert_eq!(notifier.delivered().len(), ORDERS);
    for n in 0..ORDERS {
        let order_id = format!("order-{n}");
        assert_eq!(notifier.count_for(&order_id), 1, "{order_id} notified more than once");

        let record = coordinator.store().snapshot(&OrderId::new(&*order_id)).await.unwrap();
        let expected = if n % 3 == 0 {
            OrderStatus::Errored
        } else {
            OrderStatus::Confirmed
        };
        assert_eq!(record.status(), expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_final_reports_deliver_once() {
    for round in 0..50 {
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = coordinator(&notifier);
        let order_id = format!("race-{round}");

        coordinator.submit(payment(&order_id, 1, "confirmed")).await;

        // Fraud and vendor land at the same time; both may see readiness
        let fraud_task = {
            let coordinator = coordinator.clone();
            let report = fraud(&order_id, 10);
            tokio::spawn(async move { coordinator.submit(report).await })
        };
        let vendor_task = {
            let coordinator = coordinator.clone();
            let report = vendor(&order_id, "confirmed");
            tokio::spawn(async move { coordinator.submit(report).await })
        };

        let submissions = [fraud_task.await.unwrap(), vendor_task.await.unwrap()];
        let completions = submissions
            .iter()
            .filter(|s| s.receipt.completed.is_some())
            .count();
        assert_eq!(completions, 1);

        for submission in submissions {
            if let Some(delivery) = submission.delivery {
                delivery.await.unwrap();
            }
        }
        assert_eq!(notifier.count_for(&order_id), 1);
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn arrival_order_does_not_change_notification(
        fails in failure_flags(),
        order in arrival_order(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let in_order = Arc::new(RecordingNotifier::new());
            run(&coordinator(&in_order), order_reports("a", 2000, fails)).await;

            let shuffled = Arc::new(RecordingNotifier::new());
            let reports = order_reports("a", 2000, fails);
            run(&coordinator(&shuffled), order.iter().map(|&i| reports[i].clone())).await;

            let expected = &in_order.delivered()[0];
            let actual = &shuffled.delivered()[0];

            assert_eq!(expected.status, actual.status);
            assert_eq!(expected.amount, actual.amount);

            let mut expected_tags = expected.confirmations_failed.clone();
            let mut actual_tags = actual.confirmations_failed.clone();
            expected_tags.sort_by_key(|d| d.as_str());
            actual_tags.sort_by_key(|d| d.as_str());
            assert_eq!(expected_tags, actual_tags);

            let all_passed = fails.iter().all(|failed| !failed);
            assert_eq!(actual.status == OrderStatus::Confirmed, all_passed);
        });
    }
}
