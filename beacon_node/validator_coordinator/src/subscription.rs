//! A registry of open client subscriptions.
//!
//! Each subscription is an independent entry owned by the registry and removed either by the
//! evaluator (once the subscription has resolved) or by dropping its `SubscriptionGuard` (when
//! the client goes away).

use crate::metrics;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

pub type SubscriptionId = u64;

struct Inner<T> {
    next_id: SubscriptionId,
    entries: BTreeMap<SubscriptionId, T>,
    gauge: &'static metrics::Result<metrics::IntGauge>,
}

impl<T> Inner<T> {
    fn update_gauge(&self) {
        metrics::set_gauge(self.gauge, self.entries.len() as i64);
    }
}

pub struct SubscriptionRegistry<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> SubscriptionRegistry<T> {
    /// Creates an empty registry which reports its size to `gauge`.
    pub fn new(gauge: &'static metrics::Result<metrics::IntGauge>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                entries: BTreeMap::new(),
                gauge,
            })),
        }
    }

    /// Adds `entry`, returning a guard which removes it when dropped.
    pub fn register(&self, entry: T) -> SubscriptionGuard<T> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.entries.insert(id, entry);
        inner.update_gauge();

        SubscriptionGuard {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Returns `f` applied to every entry, in registration order.
    ///
    /// The lock is released before returning, so the results may be acted on while entries are
    /// added or removed.
    pub fn collect<R, F>(&self, mut f: F) -> Vec<(SubscriptionId, R)>
    where
        F: FnMut(&T) -> R,
    {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(id, entry)| (*id, f(entry)))
            .collect()
    }

    /// Calls `f` on entry `id`, removing it if `f` returns `false`.
    ///
    /// Returns `None` without calling `f` if `id` is no longer registered.
    pub fn update<F>(&self, id: SubscriptionId, f: F) -> Option<bool>
    where
        F: FnOnce(&mut T) -> bool,
    {
        let mut inner = self.inner.lock();
        let keep = f(inner.entries.get_mut(&id)?);
        if !keep {
            inner.entries.remove(&id);
            inner.update_gauge();
        }
        Some(keep)
    }

    /// Removes and returns every entry, in registration order.
    pub fn drain(&self) -> Vec<T> {
        let mut inner = self.inner.lock();
        let entries = std::mem::take(&mut inner.entries);
        inner.update_gauge();
        entries.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deregisters a subscription when dropped.
///
/// Holds only a weak reference: a guard outliving its registry is inert.
pub struct SubscriptionGuard<T> {
    id: SubscriptionId,
    registry: Weak<Mutex<Inner<T>>>,
}

impl<T> Drop for SubscriptionGuard<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut inner = registry.lock();
            if inner.entries.remove(&self.id).is_some() {
                inner.update_gauge();
            }
        }
    }
}
