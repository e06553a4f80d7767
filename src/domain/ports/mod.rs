mod decoder_port;
mod display_port;
mod fetch_port;
mod image_cache_port;

pub use decoder_port::ImageDecoder;
pub use display_port::DisplayPort;
pub use fetch_port::{ByteStream, FetchSource};
pub use image_cache_port::ImageCachePort;
