//! # Blur Transform
//!
//! Scale-then-blur over a single image. This is the only place that can take real
//! wall-clock time, and it is synchronous: the controller decides which
//! thread runs it.
//!
//! The transform never fails from the caller's point of view. On an allocation
//! failure it fires the config's out-of-memory notifier and hands back the original,
//! unscaled input; on any other backend failure it logs and does the same without
//! the notifier.

use std::sync::Arc;

use blur_scale::cpu::scale_rgba_cpu;
use blur_scale::plan::plan_scaled;
use fast_image_resize::Resizer;
use tracing::{debug, warn};

use crate::bitmap::Image;
use crate::config::BlurConfig;
use crate::error::FilterError;
use crate::filter::BlurFilter;

/// Pure image + config → image function bound to a filter backend.
#[derive(Clone)]
pub struct BlurTransform {
    filter: Arc<dyn BlurFilter>,
}

impl BlurTransform {
    pub fn new(filter: Arc<dyn BlurFilter>) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &Arc<dyn BlurFilter> {
        &self.filter
    }

    /// Downscale `image` by `config.scale()` and blur it with radius `config.intensity()`.
    ///
    /// An intensity of exactly 0 returns the input itself (same pixel buffer).
    pub fn transform(&self, image: &Image, config: &BlurConfig) -> Image {
        if config.intensity() == 0.0 {
            return image.clone();
        }

        match self.try_transform(image, config) {
            Ok(blurred) => blurred,
            Err(err) if err.is_out_of_memory() => {
                warn!(
                    error = %err,
                    width = image.width(),
                    height = image.height(),
                    "blur ran out of memory, falling back to original image"
                );
                config.notify_out_of_memory();
                image.clone()
            }
            Err(err) => {
                warn!(
                    error = %err,
                    category = err.category(),
                    filter = self.filter.name(),
                    "blur failed, falling back to original image"
                );
                image.clone()
            }
        }
    }

    fn try_transform(&self, image: &Image, config: &BlurConfig) -> Result<Image, FilterError> {
        let plan = plan_scaled(image.size(), config.scale());
        let len = plan.out.byte_len();

        let mut scaled = try_alloc(len, "allocating scaled copy")?;
        scale_rgba_cpu(&mut Resizer::new(), image.as_bytes(), &plan, &mut scaled)?;
        let scaled = Image::from_parts(plan.out, scaled);

        let mut output = try_alloc(len, "allocating blur output")?;
        self.filter.apply(&scaled, config.intensity(), &mut output)?;

        debug!(
            from_width = plan.input.w,
            from_height = plan.input.h,
            width = plan.out.w,
            height = plan.out.h,
            radius = config.intensity(),
            filter = self.filter.name(),
            "blurred image"
        );
        Ok(Image::from_parts(plan.out, output))
    }
}

fn try_alloc(len: usize, operation: &'static str) -> Result<Vec<u8>, FilterError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| FilterError::out_of_memory(operation, len))?;
    buf.resize(len, 0);
    Ok(buf)
}
