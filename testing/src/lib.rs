//! # Order Confirmation Testing
//!
//! Testing utilities for the order confirmation join.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (`FixedClock`, notifiers)
//! - Report builders for common test scenarios
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use order_confirmation_testing::{fraud, payment, test_clock, vendor};
//! use order_confirmation_core::environment::Clock;
//! use order_confirmation_core::order::{DuplicatePolicy, OrderId, OrderRecord};
//!
//! let mut record = OrderRecord::new(OrderId::new("a"), test_clock().now());
//! for report in [payment("a", 2000, "confirmed"), fraud("a", 10), vendor("a", "confirmed")] {
//!     record.apply(&report, DuplicatePolicy::Reapply);
//! }
//! assert!(record.is_ready());
//! ```

use chrono::{DateTime, Utc};
use order_confirmation_core::environment::{Clock, DeliveryError, DeliveryFuture, Notifier};
use order_confirmation_core::notification::DeliveryNotification;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, DeliveryError, DeliveryFuture, DeliveryNotification, Notifier, Utc};
    use std::collections::VecDeque;
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until explicitly advanced, making tests
    /// reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use order_confirmation_testing::mocks::FixedClock;
    /// use order_confirmation_core::environment::Clock;
    /// use chrono::Utc;
    /// use std::time::Duration;
    ///
    /// let start = Utc::now();
    /// let clock = FixedClock::new(start);
    /// assert_eq!(clock.now(), clock.now());
    ///
    /// clock.advance(Duration::from_millis(12));
    /// assert_eq!((clock.now() - start).num_milliseconds(), 12);
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Moves the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut time = lock(&self.time);
            if let Some(next) = chrono::Duration::from_std(by)
                .ok()
                .and_then(|by| time.checked_add_signed(by))
            {
                *time = next;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *lock(&self.time)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Notifier that accepts everything and remembers what it was sent.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        delivered: Mutex<Vec<DeliveryNotification>>,
    }

    impl RecordingNotifier {
        /// Create an empty recording notifier
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every notification received, in arrival order.
        #[must_use]
        pub fn delivered(&self) -> Vec<DeliveryNotification> {
            lock(&self.delivered).clone()
        }

        /// How many notifications were received for `order_id`.
        #[must_use]
        pub fn count_for(&self, order_id: &str) -> usize {
            lock(&self.delivered)
                .iter()
                .filter(|n| n.order_id.as_str() == order_id)
                .count()
        }
    }

    impl Notifier for RecordingNotifier {
        fn deliver<'a>(&'a self, notification: &'a DeliveryNotification) -> DeliveryFuture<'a> {
            Box::pin(async move {
                lock(&self.delivered).push(notification.clone());
                Ok(())
            })
        }
    }

    /// Notifier that replays a script of results, one per attempt.
    ///
    /// Once the script runs out every attempt gets the fallback result.
    /// Attempt times are taken from `tokio::time::Instant`, so they follow a
    /// paused test clock.
    #[derive(Debug)]
    pub struct ScriptedNotifier {
        script: Mutex<VecDeque<Result<(), DeliveryError>>>,
        fallback: Result<(), DeliveryError>,
        attempts: Mutex<Vec<tokio::time::Instant>>,
    }

    impl ScriptedNotifier {
        /// Create a notifier that replays `script`, then returns `fallback`.
        #[must_use]
        pub fn new(
            script: impl IntoIterator<Item = Result<(), DeliveryError>>,
            fallback: Result<(), DeliveryError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                fallback,
                attempts: Mutex::new(Vec::new()),
            }
        }

        /// Notifier whose every attempt fails at the transport level.
        #[must_use]
        pub fn unreachable() -> Self {
            Self::new([], Err(DeliveryError::Transport("connection refused".to_string())))
        }

        /// Notifier whose every attempt is answered with `status`.
        #[must_use]
        pub fn rejecting(status: u16) -> Self {
            Self::new([], Err(DeliveryError::Rejected { status }))
        }

        /// Number of attempts made so far.
        #[must_use]
        pub fn attempt_count(&self) -> usize {
            lock(&self.attempts).len()
        }

        /// Gaps between consecutive attempts.
        #[must_use]
        pub fn gaps(&self) -> Vec<Duration> {
            lock(&self.attempts)
                .windows(2)
                .map(|pair| pair[1].duration_since(pair[0]))
                .collect()
        }
    }

    impl Notifier for ScriptedNotifier {
        fn deliver<'a>(&'a self, _notification: &'a DeliveryNotification) -> DeliveryFuture<'a> {
            Box::pin(async move {
                lock(&self.attempts).push(tokio::time::Instant::now());
                lock(&self.script)
                    .pop_front()
                    .unwrap_or_else(|| self.fallback.clone())
            })
        }
    }
}

/// Report builders for common test scenarios.
pub mod builders {
    use order_confirmation_core::order::OrderId;
    use order_confirmation_core::report::{FraudCheck, PaymentConfirmation, Report, VendorConfirmation};

    /// Payment report for `order_id`.
    #[must_use]
    pub fn payment(order_id: &str, amount: i64, payment_status: &str) -> Report {
        PaymentConfirmation::new(OrderId::new(order_id), amount, payment_status).into()
    }

    /// Fraud report for `order_id`.
    #[must_use]
    pub fn fraud(order_id: &str, risk_points: i64) -> Report {
        FraudCheck::new(OrderId::new(order_id), risk_points).into()
    }

    /// Vendor report for `order_id`.
    #[must_use]
    pub fn vendor(order_id: &str, status: &str) -> Report {
        VendorConfirmation::new(OrderId::new(order_id), status).into()
    }

    /// The three reports of one order, passing or failing per dimension.
    #[must_use]
    pub fn order_reports(order_id: &str, amount: i64, fails: [bool; 3]) -> [Report; 3] {
        let [payment_fails, fraud_fails, vendor_fails] = fails;
        [
            payment(
                order_id,
                amount,
                if payment_fails { "failed" } else { "confirmed" },
            ),
            fraud(order_id, if fraud_fails { 70 } else { 10 }),
            vendor(
                order_id,
                if vendor_fails { "rejected" } else { "confirmed" },
            ),
        ]
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Arrival orders of the three dimensions: a permutation of `0..3`.
    pub fn arrival_order() -> impl Strategy<Value = Vec<usize>> {
        Just(vec![0, 1, 2]).prop_shuffle()
    }

    /// Pass/fail flags for payment, fraud and vendor.
    pub fn failure_flags() -> impl Strategy<Value = [bool; 3]> {
        proptest::array::uniform3(any::<bool>())
    }
}

// Re-export commonly used items
pub use builders::{fraud, order_reports, payment, vendor};
pub use mocks::{FixedClock, RecordingNotifier, ScriptedNotifier, test_clock};

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use order_confirmation_core::order::{OrderId, OrderStatus};
    use std::time::Duration;

    fn notification(order_id: &str) -> DeliveryNotification {
        DeliveryNotification {
            order_id: OrderId::new(order_id),
            status: OrderStatus::Confirmed,
            amount: 1,
            confirmations_failed: vec![],
            processing_time_ms: "0ms".to_string(),
        }
    }

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = test_clock();
        let before = clock.now();
        clock.advance(Duration::from_secs(2));
        assert_eq!((clock.now() - before).num_seconds(), 2);
    }

    #[tokio::test]
    async fn recording_notifier_counts_per_order() {
        let notifier = RecordingNotifier::new();
        notifier.deliver(&notification("a")).await.unwrap();
        notifier.deliver(&notification("a")).await.unwrap();
        notifier.deliver(&notification("b")).await.unwrap();

        assert_eq!(notifier.count_for("a"), 2);
        assert_eq!(notifier.count_for("b"), 1);
        assert_eq!(notifier.delivered().len(), 3);
    }

    #[tokio::test]
    async fn scripted_notifier_replays_then_falls_back() {
        let notifier = ScriptedNotifier::new(
            [Err(DeliveryError::Transport("reset".into()))],
            Ok(()),
        );

        assert!(notifier.deliver(&notification("a")).await.is_err());
        assert!(notifier.deliver(&notification("a")).await.is_ok());
        assert!(notifier.deliver(&notification("a")).await.is_ok());
        assert_eq!(notifier.attempt_count(), 3);
    }
}
