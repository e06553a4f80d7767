//! Domain entities.

mod consumer;
mod decoded;
mod resource_key;

pub use consumer::{ConsumerHandle, ConsumerId, WeakConsumer};
pub use decoded::{DecodedImage, Delivery, ImageSource, LoadTask};
pub use resource_key::ResourceKey;
