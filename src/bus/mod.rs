//! In-process publish/subscribe channel used for inter-module notification.
//!
//! Delivery is synchronous: [`EventBus::dispatch`] calls every handler
//! subscribed to the event name, in subscription order, before it returns.
//! A panicking handler is isolated and the remaining handlers still run.
//!
//! Every registration keeps the caller's original handler next to the
//! callable actually invoked (which may add decoding or filtering layers),
//! so [`EventBus::unsubscribe`] with the original handler always removes the
//! right registration.

pub mod events;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

pub use events::BroadcastEvent;

/// A broadcast handler. Identity (the `Arc` allocation) is what
/// [`EventBus::unsubscribe`] matches on.
pub type Handler = Arc<dyn Fn(&BroadcastEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    /// What the subscriber handed in; used for removal by identity.
    original: Option<Handler>,
    /// What dispatch calls.
    invoke: Handler,
    /// Cleared on removal so an in-flight dispatch skips it.
    live: Arc<AtomicBool>,
}

#[derive(Default)]
struct BusInner {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
    dispatched: AtomicU64,
}

impl BusInner {
    fn remove(&self, name: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(entries) = listeners.get_mut(name) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|l| {
            if l.id == id {
                l.live.store(false, Ordering::SeqCst);
                false
            } else {
                true
            }
        });
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(name);
        }
        removed
    }
}

/// Process-wide publish/subscribe registry keyed by event name.
///
/// Cheap to clone; clones share the same listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared default instance for code that has no bus injected.
    pub fn global() -> &'static EventBus {
        static GLOBAL: OnceLock<EventBus> = OnceLock::new();
        GLOBAL.get_or_init(EventBus::new)
    }

    /// Deliver an untagged event. Returns how many handlers were called.
    pub fn dispatch(&self, name: &str, detail: Value) -> usize {
        self.deliver(BroadcastEvent::new(name, detail))
    }

    /// Deliver an event tagged with the sending instance.
    pub fn dispatch_from(&self, origin: Uuid, name: &str, detail: Value) -> usize {
        let mut event = BroadcastEvent::new(name, detail);
        event.origin = Some(origin);
        self.deliver(event)
    }

    fn deliver(&self, event: BroadcastEvent) -> usize {
        self.inner.dispatched.fetch_add(1, Ordering::SeqCst);

        // Snapshot, then release the lock: handlers may subscribe,
        // unsubscribe or dispatch while we iterate.
        let targets: Vec<(Handler, Arc<AtomicBool>)> = {
            let listeners = self.inner.listeners.lock();
            listeners
                .get(&event.name)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|l| (l.invoke.clone(), l.live.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        tracing::trace!(event = %event.name, listeners = targets.len(), "Dispatching event");

        let mut delivered = 0;
        for (handler, live) in targets {
            if !live.load(Ordering::SeqCst) {
                continue;
            }
            delivered += 1;
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                tracing::warn!(event = %event.name, "Event handler panicked, continuing delivery");
            }
        }
        delivered
    }

    /// Register `handler` for `name`.
    ///
    /// The returned [`Subscription`] unsubscribes when dropped or when
    /// [`Subscription::unsubscribe`] is called, whichever comes first.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, name: &str, handler: Handler) -> Subscription {
        let original = handler.clone();
        let invoke: Handler = Arc::new(move |event: &BroadcastEvent| original(event));
        self.register(name, Some(handler), invoke)
    }

    /// Register a closure. Remove it through the returned subscription.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_fn<F>(&self, name: &str, handler: F) -> Subscription
    where
        F: Fn(&BroadcastEvent) + Send + Sync + 'static,
    {
        self.subscribe(name, Arc::new(handler))
    }

    /// Register a handler that receives the decoded event detail.
    ///
    /// Events whose detail does not decode as `T` are skipped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_json<T, F>(&self, name: &str, handler: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T, &BroadcastEvent) + Send + Sync + 'static,
    {
        let invoke: Handler = Arc::new(move |event: &BroadcastEvent| {
            match serde_json::from_value::<T>(event.detail.clone()) {
                Ok(payload) => handler(payload, event),
                Err(e) => {
                    tracing::debug!(event = %event.name, error = %e, "Skipping undecodable event detail");
                }
            }
        });
        self.register(name, None, invoke)
    }

    fn register(&self, name: &str, original: Option<Handler>, invoke: Handler) -> Subscription {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner
            .listeners
            .lock()
            .entry(name.to_string())
            .or_default()
            .push(Listener {
                id,
                original,
                invoke,
                live: Arc::new(AtomicBool::new(true)),
            });

        tracing::debug!(event = %name, listener = id.0, "Subscribed");

        Subscription {
            bus: Arc::downgrade(&self.inner),
            name: name.to_string(),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Remove every registration of `handler` under `name`.
    ///
    /// Returns `false` when nothing was registered; that is not an error.
    pub fn unsubscribe(&self, name: &str, handler: &Handler) -> bool {
        let ids: Vec<ListenerId> = {
            let listeners = self.inner.listeners.lock();
            listeners
                .get(name)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|l| l.original.as_ref().is_some_and(|o| same_handler(o, handler)))
                        .map(|l| l.id)
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut removed = false;
        for id in ids {
            removed |= self.inner.remove(name, id);
        }
        removed
    }

    /// Number of handlers currently registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .get(name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Total dispatch calls since the bus was created.
    pub fn dispatch_count(&self) -> u64 {
        self.inner.dispatched.load(Ordering::SeqCst)
    }
}

/// Handle for one registration on an [`EventBus`].
pub struct Subscription {
    bus: Weak<BusInner>,
    name: String,
    id: ListenerId,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the registration. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            if bus.remove(&self.name, self.id) {
                tracing::debug!(event = %self.name, listener = self.id.0, "Unsubscribed");
            }
        }
    }

    /// Keep the registration for the lifetime of the bus.
    pub fn detach(self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn event_name(&self) -> &str {
        &self.name
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("id", &self.id.0)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Handler) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handler: Handler = Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    #[test]
    fn test_unsubscribe_by_original_handler() {
        let bus = EventBus::new();
        let (count, handler) = counter();
        let sub = bus.subscribe("x", handler.clone());
        sub.detach();

        assert!(bus.unsubscribe("x", &handler));
        bus.dispatch("x", json!(null));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count("x"), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_handler_is_noop() {
        let bus = EventBus::new();
        let (_, handler) = counter();
        assert!(!bus.unsubscribe("x", &handler));
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = order.clone();
        let o2 = order.clone();
        let _a = bus.subscribe_fn("x", move |_| o1.lock().push(1));
        let _b = bus.subscribe_fn("x", move |_| o2.lock().push(2));

        assert_eq!(bus.dispatch("x", json!({})), 2);
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_delivery() {
        let bus = EventBus::new();
        let (count, handler) = counter();
        let _bad = bus.subscribe_fn("x", |_| panic!("handler failure"));
        let _good = bus.subscribe("x", handler);

        bus.dispatch("x", json!({}));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_removed_mid_dispatch_is_skipped() {
        let bus = EventBus::new();
        let (count, handler) = counter();
        let bus_clone = bus.clone();
        let victim = handler.clone();
        let _first = bus.subscribe_fn("x", move |_| {
            bus_clone.unsubscribe("x", &victim);
        });
        bus.subscribe("x", handler).detach();

        bus.dispatch("x", json!({}));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribe_json_skips_bad_payloads() {
        #[derive(serde::Deserialize)]
        struct Payload {
            n: u32,
        }

        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let _sub = bus.subscribe_json::<Payload, _>("x", move |p, _| {
            s.fetch_add(p.n as usize, Ordering::SeqCst);
        });

        bus.dispatch("x", json!({"n": 2}));
        bus.dispatch("x", json!("garbage"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let bus = EventBus::new();
        let (count, handler) = counter();
        {
            let _sub = bus.subscribe("x", handler);
        }
        bus.dispatch("x", json!({}));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_count_tracks_calls_without_listeners() {
        let bus = EventBus::new();
        bus.dispatch("nobody", json!({}));
        bus.dispatch("nobody", json!({}));
        assert_eq!(bus.dispatch_count(), 2);
    }
}
