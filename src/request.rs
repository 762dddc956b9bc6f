//! # Fluent Requests
//!
//! [`BlurRequest`] is the chainable per-call surface:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use image_blur::{BlurController, BoxBlurFilter, Image, Preview};
//!
//! # async fn example() -> Result<(), image_blur::BlurError> {
//! let controller = BlurController::with_current_runtime(Arc::new(BoxBlurFilter::default()))?;
//! let preview = Preview::new();
//!
//! controller
//!     .load(Image::filled(800, 600, [0, 0, 0, 255]))
//!     .intensity(12.0)
//!     .scale(0.5)
//!     .into(preview.clone())?;
//! # Ok(())
//! # }
//! ```
//!
//! Every step rebuilds the carried [`BlurConfig`]; nothing is shared with other
//! requests made through the same controller.

use crate::bitmap::Image;
use crate::config::BlurConfig;
use crate::controller::{BlurController, JobId};
use crate::error::BlurError;
use crate::sink::Sink;
use crate::store::ImageStore;

/// An image paired with the config it will be blurred with.
#[must_use = "a request does nothing until into(), get_blurred_async() or get_blurred() is called"]
pub struct BlurRequest<'a> {
    controller: &'a BlurController,
    image: Image,
    config: BlurConfig,
}

impl BlurController {
    /// Start a request for `image` with the default config.
    pub fn load(&self, image: Image) -> BlurRequest<'_> {
        BlurRequest {
            controller: self,
            image,
            config: BlurConfig::default(),
        }
    }

    /// Start a request for a resource decoded from `store`.
    ///
    /// Decodes on every call; keep the returned image around if it is blurred repeatedly.
    pub async fn load_resource<'a>(
        &'a self,
        store: &dyn ImageStore,
        resource: &str,
    ) -> Result<BlurRequest<'a>, BlurError> {
        let image = store.decode(resource).await?;
        Ok(self.load(image))
    }
}

impl<'a> BlurRequest<'a> {
    /// Blur radius, accepted in `[0, 25)`; anything else becomes 25.
    pub fn intensity(mut self, intensity: f32) -> Self {
        self.config = self.config.with_intensity(intensity);
        self
    }

    /// Downscale factor, clamped to `[0.2, 0.9]`.
    pub fn scale(mut self, scale: f32) -> Self {
        self.config = self.config.with_scale(scale);
        self
    }

    /// Let this request run alongside the one already in flight instead of replacing it.
    pub fn allow_multiple_task(mut self, allow: bool) -> Self {
        self.config = self.config.with_multiple_task_allowed(allow);
        self
    }

    pub fn on_out_of_memory<F>(mut self, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.config = self.config.with_out_of_memory_handler(handler);
        self
    }

    /// Replace the carried config wholesale.
    pub fn config(mut self, config: BlurConfig) -> Self {
        self.config = config;
        self
    }

    pub fn current_config(&self) -> &BlurConfig {
        &self.config
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Submit and deliver the result to `sink`.
    pub fn into<S: Sink>(self, sink: S) -> Result<JobId, BlurError> {
        self.controller.submit(self.image, self.config, sink)
    }

    /// Blur on the worker pool and await the result.
    pub async fn get_blurred_async(self) -> Result<Image, BlurError> {
        self.controller.blur_async(self.image, self.config).await
    }

    /// Blur on the calling thread.
    pub fn get_blurred(self) -> Image {
        self.controller.blur_sync(&self.image, &self.config)
    }
}
