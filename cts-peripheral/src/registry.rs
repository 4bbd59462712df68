//! Notification subscribers, keyed by client identity

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Set of clients that enabled Current Time notifications.
///
/// A client is a member from the moment it writes the enable value to the
/// configuration descriptor until it writes the disable value or its
/// connection goes away. Every teardown path must call `unsubscribe` (or
/// `clear` when the whole server goes down) so that no entry outlives its
/// connection.
pub struct SubscriptionRegistry<I> {
    subscribers: Mutex<HashSet<I>>,
}

impl<I: Eq + Hash + Clone> SubscriptionRegistry<I> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashSet::new()),
        }
    }

    // A poisoned lock still guards a consistent set: no operation here can
    // panic midway through a mutation.
    fn lock(&self) -> MutexGuard<'_, HashSet<I>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the client was not subscribed before.
    pub fn subscribe(&self, id: I) -> bool {
        self.lock().insert(id)
    }

    /// Returns `true` if the client was subscribed before.
    pub fn unsubscribe(&self, id: &I) -> bool {
        self.lock().remove(id)
    }

    pub fn is_subscribed(&self, id: &I) -> bool {
        self.lock().contains(id)
    }

    /// Point-in-time copy for iterating during a broadcast.
    pub fn snapshot_subscribers(&self) -> HashSet<I> {
        self.lock().clone()
    }

    /// Drops every subscriber, returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut subscribers = self.lock();
        let count = subscribers.len();
        subscribers.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<I: Eq + Hash + Clone> Default for SubscriptionRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn subscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.subscribe("a"));
        assert!(!registry.subscribe("a"));
        assert_eq!(registry.len(), 1);
        assert!(registry.is_subscribed(&"a"));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe("a");
        registry.subscribe("b");
        assert!(registry.unsubscribe(&"a"));
        assert!(!registry.unsubscribe(&"a"));
        assert!(!registry.unsubscribe(&"never-seen"));
        assert!(!registry.is_subscribed(&"a"));
        assert_eq!(registry.snapshot_subscribers(), HashSet::from(["b"]));
    }

    #[test]
    fn snapshot_is_detached() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(1);
        registry.subscribe(2);
        let snapshot = registry.snapshot_subscribers();
        registry.unsubscribe(&1);
        registry.subscribe(3);
        assert_eq!(snapshot, HashSet::from([1, 2]));
        assert_eq!(registry.snapshot_subscribers(), HashSet::from([2, 3]));
    }

    #[test]
    fn clear() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(1);
        registry.subscribe(2);
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.clear(), 0);
    }

    #[test]
    fn concurrent_writers_agree_with_last_write() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let handles: Vec<_> = (0..8u32)
            .map(|client| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for round in 0..500 {
                        if round % 2 == 0 {
                            registry.subscribe(client);
                        } else {
                            registry.unsubscribe(&client);
                        }
                        let _ = registry.snapshot_subscribers();
                    }
                    // odd clients finish subscribed
                    if client % 2 == 1 {
                        registry.subscribe(client);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.snapshot_subscribers(), HashSet::from([1, 3, 5, 7]));
    }
}
