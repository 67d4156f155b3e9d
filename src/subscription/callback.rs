// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for subscriptions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Unique identifier for a subscription.
///
/// IDs are unique within the registry that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Registry of listeners for events of type `E`.
///
/// Listeners are dispatched in subscription order. The registry lock is not
/// held while a listener runs, so listeners may subscribe or unsubscribe
/// from inside a callback.
pub struct CallbackRegistry<E: ?Sized> {
    next_id: AtomicU64,
    callbacks: RwLock<BTreeMap<SubscriptionId, Callback<E>>>,
}

impl<E: ?Sized> CallbackRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            callbacks: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a listener.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Removes a listener.
    ///
    /// Returns `true` if a listener was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.write().remove(&id).is_some()
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.callbacks.write().clear();
    }

    /// Calls every listener with `event`.
    pub fn dispatch(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self.callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns `true` if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: ?Sized> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> fmt::Debug for CallbackRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = CallbackRegistry::<u32>::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn dispatch_reaches_every_listener() {
        let registry = CallbackRegistry::<u32>::new();
        let total = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let total = Arc::clone(&total);
            registry.subscribe(move |value| {
                total.fetch_add(*value, Ordering::SeqCst);
            });
        }

        registry.dispatch(&5);
        assert_eq!(total.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let registry = CallbackRegistry::<u32>::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let id = registry.subscribe(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });
        registry.dispatch(&1);

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));

        registry.dispatch(&1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsized_events() {
        let registry = CallbackRegistry::<[String]>::new();
        let seen = Arc::new(RwLock::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        registry.subscribe(move |names: &[String]| {
            seen_clone.write().extend_from_slice(names);
        });
        registry.dispatch(&["a".to_string(), "b".to_string()][..]);

        assert_eq!(*seen.read(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn listener_can_unsubscribe_itself() {
        let registry = Arc::new(CallbackRegistry::<()>::new());
        let slot = Arc::new(RwLock::new(None::<SubscriptionId>));

        let registry_clone = Arc::clone(&registry);
        let slot_clone = Arc::clone(&slot);
        let id = registry.subscribe(move |()| {
            if let Some(id) = *slot_clone.read() {
                registry_clone.unsubscribe(id);
            }
        });
        *slot.write() = Some(id);

        registry.dispatch(&());
        assert!(registry.is_empty());
    }

    #[test]
    fn unique_ids() {
        let registry = CallbackRegistry::<()>::new();
        let id1 = registry.subscribe(|()| {});
        let id2 = registry.subscribe(|()| {});
        assert_ne!(id1, id2);
    }

    #[test]
    fn registry_debug() {
        let registry = CallbackRegistry::<()>::new();
        registry.subscribe(|()| {});

        let debug = format!("{registry:?}");
        assert!(debug.contains("callback_count: 1"));
    }
}
