use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::bus::{BroadcastEvent, EventBus, Subscription};

/// A state update: a literal value or a pure function of the previous one.
pub enum Update<T> {
    Value(T),
    With(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> Update<T> {
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        Update::With(Box::new(f))
    }

    fn apply(self, previous: &T) -> T {
        match self {
            Update::Value(value) => value,
            Update::With(f) => f(previous),
        }
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Update::Value(value)
    }
}

/// Where an applied change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    Local,
    Broadcast,
}

/// Whether a channel applies broadcasts it sent itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfDelivery {
    /// Re-apply own broadcasts. Safe while updates are plain overwrites.
    #[default]
    Apply,
    /// Ignore events tagged with this channel's origin id.
    Suppress,
}

/// Maps state to and from a broadcast payload.
pub trait ChannelCodec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Value;
    /// `None` rejects the payload; the state is left alone.
    fn decode(&self, detail: &Value) -> Option<T>;
}

/// Codec that serializes the state itself as the payload.
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> ChannelCodec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Value {
        serde_json::to_value(value).unwrap_or(Value::Null)
    }

    fn decode(&self, detail: &Value) -> Option<T> {
        serde_json::from_value(detail.clone()).ok()
    }
}

type ChangeHook<T> = Box<dyn Fn(&T, ChangeSource) + Send + Sync>;

struct ChannelState<T> {
    value: T,
    /// Set only while a received broadcast is being applied.
    applying_external: bool,
}

struct ChannelInner<T> {
    event: String,
    bus: EventBus,
    origin: Uuid,
    codec: Box<dyn ChannelCodec<T>>,
    self_delivery: SelfDelivery,
    on_change: Option<ChangeHook<T>>,
    state: Mutex<ChannelState<T>>,
}

impl<T> ChannelInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn set(&self, update: Update<T>) {
        let (next, source) = {
            let mut state = self.state.lock();
            let next = update.apply(&state.value);
            state.value = next.clone();
            // The guard covers this one application only; writes made
            // from the change hook are local again.
            let source = if std::mem::take(&mut state.applying_external) {
                ChangeSource::Broadcast
            } else {
                ChangeSource::Local
            };
            (next, source)
        };

        if let Some(hook) = &self.on_change {
            hook(&next, source);
        }

        if source == ChangeSource::Local {
            self.bus
                .dispatch_from(self.origin, &self.event, self.codec.encode(&next));
        }
    }

    fn receive(&self, event: &BroadcastEvent) {
        if self.self_delivery == SelfDelivery::Suppress && event.origin == Some(self.origin) {
            return;
        }
        let Some(value) = self.codec.decode(&event.detail) else {
            tracing::debug!(event = %self.event, "Ignoring broadcast with unusable payload");
            return;
        };

        self.state.lock().applying_external = true;
        let _reset = scopeguard::guard((), |_| {
            self.state.lock().applying_external = false;
        });
        self.set(Update::Value(value));
    }
}

/// One piece of state kept in sync across every mounted module.
///
/// Local writes are broadcast on the bound event name. A write that is the
/// application of a received broadcast is not re-broadcast, so any number
/// of channels on the same event settle after one dispatch.
pub struct SharedStateChannel<T> {
    inner: Arc<ChannelInner<T>>,
    subscription: Subscription,
}

impl<T> SharedStateChannel<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Channel with the default JSON codec.
    pub fn new(bus: &EventBus, event: &str, initial: T) -> Self {
        Self::builder(bus, event, initial).build()
    }
}

impl<T> SharedStateChannel<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn builder(bus: &EventBus, event: &str, initial: T) -> ChannelBuilder<T> {
        ChannelBuilder {
            bus: bus.clone(),
            event: event.to_string(),
            initial,
            codec: None,
            self_delivery: SelfDelivery::default(),
            on_change: None,
        }
    }

    pub fn get(&self) -> T {
        self.inner.state.lock().value.clone()
    }

    /// Apply an update and broadcast the result.
    pub fn set(&self, update: impl Into<Update<T>>) {
        self.inner.set(update.into());
    }

    /// Functional update.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.inner.set(Update::with(f));
    }

    /// Id this channel tags its broadcasts with.
    pub fn origin(&self) -> Uuid {
        self.inner.origin
    }

    pub fn event(&self) -> &str {
        &self.inner.event
    }

    /// Stop listening for broadcasts. Also happens on drop.
    pub fn close(&self) {
        self.subscription.unsubscribe();
    }
}

/// Builder for [`SharedStateChannel`].
pub struct ChannelBuilder<T> {
    bus: EventBus,
    event: String,
    initial: T,
    codec: Option<Box<dyn ChannelCodec<T>>>,
    self_delivery: SelfDelivery,
    on_change: Option<ChangeHook<T>>,
}

impl<T> ChannelBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn codec(mut self, codec: impl ChannelCodec<T> + 'static) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }

    pub fn self_delivery(mut self, mode: SelfDelivery) -> Self {
        self.self_delivery = mode;
        self
    }

    /// Called after every applied change, local or received.
    pub fn on_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T, ChangeSource) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(hook));
        self
    }

    pub fn build(mut self) -> SharedStateChannel<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let codec: Box<dyn ChannelCodec<T>> = match self.codec.take() {
            Some(codec) => codec,
            None => Box::new(JsonCodec::<T>::default()),
        };
        self.build_with(codec)
    }

    /// Build with an explicit codec. Works for state types without serde.
    pub fn build_with_codec(self, codec: impl ChannelCodec<T> + 'static) -> SharedStateChannel<T> {
        self.build_with(Box::new(codec))
    }

    fn build_with(self, codec: Box<dyn ChannelCodec<T>>) -> SharedStateChannel<T> {
        let inner = Arc::new(ChannelInner {
            event: self.event,
            bus: self.bus.clone(),
            origin: Uuid::new_v4(),
            codec,
            self_delivery: self.self_delivery,
            on_change: self.on_change,
            state: Mutex::new(ChannelState {
                value: self.initial,
                applying_external: false,
            }),
        });

        let weak: Weak<ChannelInner<T>> = Arc::downgrade(&inner);
        let subscription = self.bus.subscribe_fn(&inner.event, move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.receive(event);
            }
        });

        SharedStateChannel {
            inner,
            subscription,
        }
    }
}
