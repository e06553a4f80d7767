//! Port for the consumer side of delivery.

use std::sync::Arc;

use crate::domain::entities::{ConsumerHandle, DecodedImage};

/// Port for showing images on consumers.
///
/// Every method runs in the single consumer context: either inside
/// `ImageLoader::request` or inside the delivery dispatcher. Implementations
/// never see concurrent calls from the loader.
pub trait DisplayPort: Send + Sync {
    /// Shows a decoded image on the target.
    fn show_image(&self, target: &ConsumerHandle, image: Arc<DecodedImage>);

    /// Shows the consumer's default (stub) image on the target.
    fn show_default(&self, target: &ConsumerHandle);

    /// Hides the target entirely.
    fn hide_target(&self, target: &ConsumerHandle);

    /// Makes a loading indicator visible.
    fn show_placeholder(&self, placeholder: &ConsumerHandle);

    /// Hides a loading indicator.
    fn hide_placeholder(&self, placeholder: &ConsumerHandle);
}
