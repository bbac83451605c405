//! Shared state synchronized across modules through the event bus.

mod channel;

pub use channel::{
    ChangeSource, ChannelBuilder, ChannelCodec, JsonCodec, SelfDelivery, SharedStateChannel,
    Update,
};
