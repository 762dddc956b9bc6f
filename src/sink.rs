//! # Result Sinks
//!
//! A [`Sink`] receives the final image of a job. It is called at most once per
//! job that was not superseded, on the controller's runtime rather than on the
//! blocking worker.
//!
//! Sinks must not block for long; a sink that needs to do heavy work should hand
//! the image off to its own task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::bitmap::Image;

/// Receiver of finished images.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Take ownership of a finished image.
    async fn deliver(&self, image: Image);
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Arc<S> {
    async fn deliver(&self, image: Image) {
        (**self).deliver(image).await
    }
}

#[async_trait]
impl Sink for mpsc::UnboundedSender<Image> {
    async fn deliver(&self, image: Image) {
        if self.send(image).is_err() {
            debug!("sink receiver dropped, discarding blurred image");
        }
    }
}

/// Display slot holding the most recently delivered image.
///
/// Stands in for an image widget: clones share the same slot, and any number of
/// observers can [`subscribe`](Preview::subscribe) to be woken on each delivery.
#[derive(Clone)]
pub struct Preview {
    slot: Arc<watch::Sender<Option<Image>>>,
    deliveries: Arc<AtomicU64>,
}

impl Default for Preview {
    fn default() -> Self {
        Self::new()
    }
}

impl Preview {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
            deliveries: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The image currently shown, if any.
    pub fn current(&self) -> Option<Image> {
        self.slot.borrow().clone()
    }

    /// Number of images delivered so far.
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Image>> {
        self.slot.subscribe()
    }
}

#[async_trait]
impl Sink for Preview {
    async fn deliver(&self, image: Image) {
        self.deliveries.fetch_add(1, Ordering::AcqRel);
        self.slot.send_replace(Some(image));
    }
}
