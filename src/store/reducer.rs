//! Slice reducers: typed on the authoring side, type-erased in the store.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::Action;

/// Marker trait for slice state.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Serializable (the store keeps every slice as JSON)
/// - Comparable (PartialEq for detecting changes)
pub trait SliceState:
    Clone + PartialEq + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Marker trait for the actions a typed slice understands.
///
/// Typically an enum with `#[serde(tag = "type", content = "payload")]` so
/// that it decodes straight from an [`Action`].
pub trait SliceAction: DeserializeOwned + Send + 'static {}

/// Reducer transforms slice state based on actions.
///
/// It must be a pure function: (State, Action) -> State
pub trait Reducer: Send + Sync + 'static {
    type State: SliceState;
    type Action: SliceAction;

    fn reduce(state: Self::State, action: Self::Action) -> Self::State;
}

/// Reducer as the store sees it: JSON state in, JSON state out.
pub trait SliceReducer: Send + Sync {
    fn initial_state(&self) -> Value;

    /// Actions the slice does not recognize must return `state` unchanged.
    fn reduce(&self, state: &Value, action: &Action) -> Value;
}

/// Adapts a typed [`Reducer`] to [`SliceReducer`].
pub struct TypedSlice<R>(PhantomData<fn() -> R>);

impl<R: Reducer> TypedSlice<R> {
    pub fn new() -> Self {
        Self(PhantomData)
    }

    pub fn shared() -> Arc<dyn SliceReducer> {
        Arc::new(Self::new())
    }
}

impl<R: Reducer> Default for TypedSlice<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Reducer> SliceReducer for TypedSlice<R> {
    fn initial_state(&self) -> Value {
        serde_json::to_value(R::State::default()).unwrap_or(Value::Null)
    }

    fn reduce(&self, state: &Value, action: &Action) -> Value {
        let Some(typed_action) = action.decode::<R::Action>() else {
            return state.clone();
        };

        let current = match serde_json::from_value::<R::State>(state.clone()) {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(action = %action.kind, error = %e, "Slice state unreadable, starting from default");
                R::State::default()
            }
        };

        let next = R::reduce(current, typed_action);
        match serde_json::to_value(&next) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(action = %action.kind, error = %e, "Failed to encode slice state, keeping previous");
                state.clone()
            }
        }
    }
}

struct FnSlice<F> {
    initial: Value,
    reduce: F,
}

impl<F> SliceReducer for FnSlice<F>
where
    F: Fn(&Value, &Action) -> Value + Send + Sync,
{
    fn initial_state(&self) -> Value {
        self.initial.clone()
    }

    fn reduce(&self, state: &Value, action: &Action) -> Value {
        (self.reduce)(state, action)
    }
}

/// Slice from an initial value and a plain closure.
pub fn slice_fn<F>(initial: Value, reduce: F) -> Arc<dyn SliceReducer>
where
    F: Fn(&Value, &Action) -> Value + Send + Sync + 'static,
{
    Arc::new(FnSlice { initial, reduce })
}
