//! Keyed correlation store holding one [`OrderEntry`] per order.
//!
//! The map lock guards only lookup and insertion. Each entry carries its own
//! mutex for field mutation and a separate atomic guard for the one-time
//! readiness transition, so different orders never contend.

use crate::metrics::StoreMetrics;
use chrono::{DateTime, Utc};
use order_confirmation_core::order::{OrderId, OrderRecord};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Per-order slot in the store.
#[derive(Debug)]
pub struct OrderEntry {
    record: Mutex<OrderRecord>,
    notified: AtomicBool,
}

impl OrderEntry {
    fn new(record: OrderRecord) -> Self {
        Self {
            record: Mutex::new(record),
            notified: AtomicBool::new(false),
        }
    }

    /// Locks the record for exclusive access.
    pub async fn lock(&self) -> MutexGuard<'_, OrderRecord> {
        self.record.lock().await
    }

    /// Atomically flips `notified` from `false` to `true`.
    ///
    /// Returns `true` for exactly one caller over the entry's lifetime.
    pub fn try_claim_notification(&self) -> bool {
        self.notified
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether a caller has already claimed the notification.
    pub fn is_notified(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }
}

/// Concurrency-safe map from correlation key to order entry.
///
/// Entries are never removed; memory grows with the number of distinct
/// orders seen by the process.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    entries: RwLock<HashMap<OrderId, Arc<OrderEntry>>>,
}

impl CorrelationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `order_id`, creating it with `start_time` if
    /// this is the first report seen for the order.
    ///
    /// Concurrent first-touch calls for the same key converge on one entry.
    pub async fn get_or_create(&self, order_id: &OrderId, start_time: DateTime<Utc>) -> Arc<OrderEntry> {
        if let Some(entry) = self.entries.read().await.get(order_id) {
            return Arc::clone(entry);
        }

        let mut entries = self.entries.write().await;
        let entry = match entries.entry(order_id.clone()) {
            // Another caller created it between our read and write locks
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => {
                tracing::debug!(order_id = %order_id, "Tracking new order");
                let record = OrderRecord::new(order_id.clone(), start_time);
                Arc::clone(vacant.insert(Arc::new(OrderEntry::new(record))))
            },
        };
        StoreMetrics::record_tracked(entries.len());
        entry
    }

    /// Looks up an existing entry.
    pub async fn get(&self, order_id: &OrderId) -> Option<Arc<OrderEntry>> {
        self.entries.read().await.get(order_id).cloned()
    }

    /// Copy of the current record for inspection.
    pub async fn snapshot(&self, order_id: &OrderId) -> Option<OrderRecord> {
        let entry = self.get(order_id).await?;
        let record = entry.lock().await;
        Some(record.clone())
    }

    /// Number of orders tracked.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no order has been seen yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use order_confirmation_core::order::OrderStatus;

    fn order(id: &str) -> OrderId {
        OrderId::new(id)
    }

    #[tokio::test]
    async fn creates_record_on_first_touch() {
        let store = CorrelationStore::new();
        assert!(store.is_empty().await);

        let now = Utc::now();
        let entry = store.get_or_create(&order("a"), now).await;

        let record = entry.lock().await;
        assert_eq!(record.order_id(), &order("a"));
        assert_eq!(record.start_time(), now);
        assert_eq!(record.status(), OrderStatus::Pending);
        drop(record);

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn second_touch_keeps_original_start_time() {
        let store = CorrelationStore::new();
        let first = Utc::now();
        store.get_or_create(&order("a"), first).await;
        store
            .get_or_create(&order("a"), first + chrono::TimeDelta::seconds(5))
            .await;

        let snapshot = store.snapshot(&order("a")).await.unwrap();
        assert_eq!(snapshot.start_time(), first);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_order_has_no_entry() {
        let store = CorrelationStore::new();
        assert!(store.get(&order("missing")).await.is_none());
        assert!(store.snapshot(&order("missing")).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_touch_converges_on_one_entry() {
        let store = Arc::new(CorrelationStore::new());
        let now = Utc::now();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_or_create(&order("shared"), now).await })
            })
            .collect();

        let mut entries = Vec::new();
        for handle in handles {
            entries.push(handle.await.unwrap());
        }

        assert_eq!(store.len().await, 1);
        assert!(entries.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn notification_can_be_claimed_once() {
        let entry = OrderEntry::new(OrderRecord::new(order("a"), Utc::now()));

        assert!(!entry.is_notified());
        assert!(entry.try_claim_notification());
        assert!(!entry.try_claim_notification());
        assert!(entry.is_notified());
    }

    #[test]
    fn concurrent_claims_have_a_single_winner() {
        let entry = Arc::new(OrderEntry::new(OrderRecord::new(order("a"), Utc::now())));

        let winners: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| usize::from(entry.try_claim_notification())))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(winners, 1);
    }
}
