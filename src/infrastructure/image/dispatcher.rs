//! Delivery of finished loads on the consumer context.
//!
//! Workers never touch consumers. They post a [`Delivery`] here, and the one
//! context that owns the consumers drains the channel, re-checks staleness
//! and calls the display port.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace;

use crate::application::DispatchRegistry;
use crate::domain::entities::Delivery;
use crate::domain::ports::DisplayPort;

/// Receiving end of the loader's delivery channel.
///
/// Owned by the consumer context. Use [`run`](Self::run) to dedicate a task
/// to it, or call [`dispatch_pending`](Self::dispatch_pending) from an
/// existing event loop.
pub struct DeliveryDispatcher {
    delivery_rx: mpsc::UnboundedReceiver<Delivery>,
    registry: Arc<DispatchRegistry>,
    display: Arc<dyn DisplayPort>,
    collapse_tag: Option<String>,
}

impl DeliveryDispatcher {
    pub(crate) fn new(
        delivery_rx: mpsc::UnboundedReceiver<Delivery>,
        registry: Arc<DispatchRegistry>,
        display: Arc<dyn DisplayPort>,
        collapse_tag: Option<String>,
    ) -> Self {
        Self {
            delivery_rx,
            registry,
            display,
            collapse_tag,
        }
    }

    /// Delivers results until the loader and all of its workers are gone.
    pub async fn run(mut self) {
        while let Some(delivery) = self.delivery_rx.recv().await {
            self.deliver(delivery);
        }
        trace!("Delivery channel closed");
    }

    /// Waits for the next result and delivers it.
    ///
    /// Returns `None` once the channel is closed, otherwise whether the
    /// result reached its consumer.
    pub async fn next(&mut self) -> Option<bool> {
        let delivery = self.delivery_rx.recv().await?;
        Some(self.deliver(delivery))
    }

    /// Delivers every result that is already waiting, without blocking.
    ///
    /// Returns how many reached their consumer.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(delivery) = self.delivery_rx.try_recv() {
            if self.deliver(delivery) {
                delivered += 1;
            }
        }
        delivered
    }

    fn deliver(&self, delivery: Delivery) -> bool {
        let Delivery { task, image } = delivery;

        if self.registry.is_reused(&task) {
            return false;
        }
        let Some(consumer) = task.consumer.upgrade() else {
            return false;
        };

        if let Some(placeholder) = &task.placeholder {
            self.display.hide_placeholder(placeholder);
        }

        match image {
            Some(image) => self.display.show_image(&consumer, image),
            None => {
                let collapse = self
                    .collapse_tag
                    .as_deref()
                    .is_some_and(|tag| consumer.has_tag(tag));
                if collapse {
                    self.display.hide_target(&consumer);
                } else {
                    self.display.show_default(&consumer);
                }
            }
        }

        trace!(key = %task.key, consumer = %consumer.id(), "Delivered image");
        true
    }
}

impl std::fmt::Debug for DeliveryDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryDispatcher")
            .field("collapse_tag", &self.collapse_tag)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ConsumerHandle, DecodedImage, LoadTask, ResourceKey};
    use crate::domain::ports::mocks::{DisplayCall, MockDisplay};

    struct Harness {
        tx: mpsc::UnboundedSender<Delivery>,
        registry: Arc<DispatchRegistry>,
        display: Arc<MockDisplay>,
        dispatcher: DeliveryDispatcher,
    }

    fn harness(collapse_tag: Option<&str>) -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Arc::new(DispatchRegistry::new());
        let display = Arc::new(MockDisplay::new());
        let dispatcher = DeliveryDispatcher::new(
            rx,
            registry.clone(),
            display.clone(),
            collapse_tag.map(String::from),
        );
        Harness {
            tx,
            registry,
            display,
            dispatcher,
        }
    }

    fn key(s: &str) -> ResourceKey {
        ResourceKey::new(format!("https://example.com/{s}.png"))
    }

    fn sample_image() -> Arc<DecodedImage> {
        Arc::new(DecodedImage::full_size(image::DynamicImage::new_rgba8(8, 6)))
    }

    #[test]
    fn test_delivers_current_result() {
        let mut h = harness(None);
        let consumer = ConsumerHandle::new();
        let placeholder = ConsumerHandle::new();
        h.registry.register(&consumer, key("a"));

        let task = LoadTask::new(key("a"), &consumer, Some(placeholder.clone()));
        h.tx.send(Delivery {
            task,
            image: Some(sample_image()),
        })
        .unwrap();

        assert_eq!(h.dispatcher.dispatch_pending(), 1);
        assert_eq!(
            h.display.calls(),
            vec![
                DisplayCall::PlaceholderHidden(placeholder.id()),
                DisplayCall::Image(consumer.id(), 8, 6),
            ]
        );
    }

    #[test]
    fn test_drops_result_superseded_after_posting() {
        let mut h = harness(None);
        let consumer = ConsumerHandle::new();
        h.registry.register(&consumer, key("a"));
        let task = LoadTask::new(key("a"), &consumer, None);
        h.tx.send(Delivery {
            task,
            image: Some(sample_image()),
        })
        .unwrap();

        // reassigned while the result sat in the channel
        h.registry.register(&consumer, key("b"));

        assert_eq!(h.dispatcher.dispatch_pending(), 0);
        assert!(h.display.calls().is_empty());
    }

    #[test]
    fn test_failure_shows_default() {
        let mut h = harness(Some("banner"));
        let consumer = ConsumerHandle::new();
        h.registry.register(&consumer, key("a"));
        h.tx.send(Delivery {
            task: LoadTask::new(key("a"), &consumer, None),
            image: None,
        })
        .unwrap();

        h.dispatcher.dispatch_pending();
        assert_eq!(h.display.calls(), vec![DisplayCall::Default(consumer.id())]);
    }

    #[test]
    fn test_failure_hides_tagged_consumer() {
        let mut h = harness(Some("banner"));
        let banner = ConsumerHandle::with_tag("banner");
        h.registry.register(&banner, key("a"));
        h.tx.send(Delivery {
            task: LoadTask::new(key("a"), &banner, None),
            image: None,
        })
        .unwrap();

        h.dispatcher.dispatch_pending();
        assert_eq!(h.display.calls(), vec![DisplayCall::Hidden(banner.id())]);
    }

    #[test]
    fn test_tag_ignored_without_collapse_tag() {
        let mut h = harness(None);
        let banner = ConsumerHandle::with_tag("banner");
        h.registry.register(&banner, key("a"));
        h.tx.send(Delivery {
            task: LoadTask::new(key("a"), &banner, None),
            image: None,
        })
        .unwrap();

        h.dispatcher.dispatch_pending();
        assert_eq!(h.display.calls(), vec![DisplayCall::Default(banner.id())]);
    }

    #[test]
    fn test_dropped_consumer_receives_nothing() {
        let mut h = harness(None);
        let consumer = ConsumerHandle::new();
        h.registry.register(&consumer, key("a"));
        h.tx.send(Delivery {
            task: LoadTask::new(key("a"), &consumer, None),
            image: Some(sample_image()),
        })
        .unwrap();
        drop(consumer);

        assert_eq!(h.dispatcher.dispatch_pending(), 0);
        assert!(h.display.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_ends_when_senders_dropped() {
        let h = harness(None);
        let consumer = ConsumerHandle::new();
        h.registry.register(&consumer, key("a"));
        h.tx.send(Delivery {
            task: LoadTask::new(key("a"), &consumer, None),
            image: Some(sample_image()),
        })
        .unwrap();
        drop(h.tx);

        h.dispatcher.run().await;
        assert_eq!(h.display.images_for(consumer.id()), vec![(8, 6)]);
    }
}
