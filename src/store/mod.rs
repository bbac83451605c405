//! Application store with slices that modules inject at runtime.
//!
//! ```text
//! Action ──→ RootReducer ──→ { slice key → state }
//!               │
//!               └── one SliceReducer per key, in injection order
//! ```
//!
//! Modules arrive lazily, so the slice table grows after construction.
//! Each injection rebuilds the root reducer; existing slice state survives.

mod reducer;
mod shell;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use reducer::{slice_fn, Reducer, SliceAction, SliceReducer, SliceState, TypedSlice};
pub use shell::{ShellAction, ShellReducer, ShellState, SHELL_SLICE};

/// A dispatched action: `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Convert a typed action (a tagged enum) into its wire form.
    pub fn encode<A: Serialize>(action: &A) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(action)?)
    }

    /// Typed view of this action; `None` when `A` does not know it.
    pub fn decode<A: DeserializeOwned>(&self) -> Option<A> {
        let value = serde_json::to_value(self).ok()?;
        serde_json::from_value(value).ok()
    }
}

type SliceTable = Vec<(String, Arc<dyn SliceReducer>)>;

/// Combination of every registered slice reducer.
struct RootReducer {
    slices: SliceTable,
}

impl RootReducer {
    fn combine(slices: &SliceTable) -> Self {
        Self {
            slices: slices.clone(),
        }
    }

    fn reduce(&self, state: &BTreeMap<String, Value>, action: &Action) -> BTreeMap<String, Value> {
        self.slices
            .iter()
            .map(|(key, slice)| {
                let next = match state.get(key) {
                    Some(current) => slice.reduce(current, action),
                    None => slice.reduce(&slice.initial_state(), action),
                };
                (key.clone(), next)
            })
            .collect()
    }
}

struct StoreInner {
    slices: SliceTable,
    root: RootReducer,
    state: BTreeMap<String, Value>,
}

/// Shared store handle. Clones point at the same store.
///
/// Reducers run under the store lock and must not call back into the store.
#[derive(Clone)]
pub struct StoreRegistry {
    inner: Arc<Mutex<StoreInner>>,
}

impl StoreRegistry {
    /// Store with the given initial slices. A repeated key keeps its first
    /// reducer.
    pub fn new(initial: Vec<(String, Arc<dyn SliceReducer>)>) -> Self {
        let mut slices: SliceTable = Vec::with_capacity(initial.len());
        for (key, reducer) in initial {
            if slices.iter().any(|(k, _)| *k == key) {
                tracing::warn!(slice = %key, "Duplicate initial slice ignored");
                continue;
            }
            slices.push((key, reducer));
        }

        let state = slices
            .iter()
            .map(|(key, slice)| (key.clone(), slice.initial_state()))
            .collect();
        let root = RootReducer::combine(&slices);

        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                slices,
                root,
                state,
            })),
        }
    }

    /// Store seeded with the container's own `shell` slice.
    pub fn with_shell_slice() -> Self {
        Self::new(vec![(
            SHELL_SLICE.to_string(),
            TypedSlice::<ShellReducer>::shared(),
        )])
    }

    /// Register `reducer` under `key`.
    ///
    /// Returns `false` and leaves the store untouched when `key` is taken;
    /// the first reducer registered for a key stays in charge.
    pub fn inject(&self, key: &str, reducer: Arc<dyn SliceReducer>) -> bool {
        let mut inner = self.inner.lock();
        if inner.slices.iter().any(|(k, _)| k == key) {
            tracing::debug!(slice = %key, "Slice already registered");
            return false;
        }

        let initial = reducer.initial_state();
        inner.slices.push((key.to_string(), reducer));
        let root = RootReducer::combine(&inner.slices);
        inner.root = root;
        inner.state.entry(key.to_string()).or_insert(initial);

        tracing::debug!(slice = %key, total = inner.slices.len(), "Slice injected");
        true
    }

    /// [`inject`](Self::inject) for a typed reducer.
    pub fn inject_typed<R: Reducer>(&self, key: &str) -> bool {
        self.inject(key, TypedSlice::<R>::shared())
    }

    pub fn dispatch(&self, action: &Action) {
        let mut inner = self.inner.lock();
        let next = inner.root.reduce(&inner.state, action);
        inner.state = next;
    }

    /// Encode and dispatch a typed action.
    pub fn dispatch_typed<A: Serialize>(&self, action: &A) {
        match Action::encode(action) {
            Ok(action) => self.dispatch(&action),
            Err(e) => tracing::warn!(error = %e, "Action is not a tagged object, dropped"),
        }
    }

    /// Snapshot of every slice.
    pub fn state(&self) -> BTreeMap<String, Value> {
        self.inner.lock().state.clone()
    }

    pub fn select(&self, key: &str) -> Option<Value> {
        self.inner.lock().state.get(key).cloned()
    }

    pub fn select_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.select(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Slice keys in registration order.
    pub fn slice_keys(&self) -> Vec<String> {
        self.inner
            .lock()
            .slices
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::with_shell_slice()
    }
}
