//! # Blur Filter Seam
//!
//! [`BlurFilter`] is the accelerated blur primitive the transform delegates to.
//! The controller only ever sees it through `Arc<dyn BlurFilter>`, so a GPU or
//! platform-intrinsic backend can be dropped in without touching job handling.
//!
//! [`BoxBlurFilter`] is the bundled CPU backend: a three-pass box approximation of
//! a Gaussian from `blur-scale`, with scratch buffers pooled across calls so that a
//! slider drag does not churn the allocator.

use std::sync::{Arc, Mutex, PoisonError};

use blur_scale::box_blur::{Scratch, gaussian_box_blur_rgba};

use crate::bitmap::Image;
use crate::error::FilterError;

/// An accelerated blur primitive.
///
/// Implementations write exactly `input.size().byte_len()` bytes of RGBA8 into
/// `output`, which the caller has sized to match the input. Allocation failures must
/// be reported as [`FilterError::OutOfMemory`]; the filter call itself is treated as
/// non-interruptible.
pub trait BlurFilter: Send + Sync {
    fn apply(&self, input: &Image, radius: f32, output: &mut [u8]) -> Result<(), FilterError>;

    /// Short name used in log fields.
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl<F: BlurFilter + ?Sized> BlurFilter for Arc<F> {
    fn apply(&self, input: &Image, radius: f32, output: &mut [u8]) -> Result<(), FilterError> {
        (**self).apply(input, radius, output)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// CPU Gaussian approximation with pooled scratch space.
#[derive(Debug)]
pub struct BoxBlurFilter {
    pool: Mutex<Vec<Scratch>>,
    max_pooled: usize,
}

impl Default for BoxBlurFilter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl BoxBlurFilter {
    /// Create a filter that keeps at most `max_pooled` scratch buffers between calls.
    pub fn new(max_pooled: usize) -> Self {
        Self {
            pool: Mutex::new(Vec::with_capacity(max_pooled)),
            max_pooled,
        }
    }

    /// Number of scratch buffers currently parked in the pool.
    pub fn pooled(&self) -> usize {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn take_scratch(&self) -> Scratch {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    fn return_scratch(&self, scratch: Scratch) {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        // Beyond capacity, drop the buffer to bound memory usage.
        if pool.len() < self.max_pooled {
            pool.push(scratch);
        }
    }
}

impl BlurFilter for BoxBlurFilter {
    fn apply(&self, input: &Image, radius: f32, output: &mut [u8]) -> Result<(), FilterError> {
        let mut scratch = self.take_scratch();
        let result =
            gaussian_box_blur_rgba(input.as_bytes(), input.size(), radius, output, &mut scratch);
        self.return_scratch(scratch);
        result.map_err(FilterError::from)
    }

    fn name(&self) -> &'static str {
        "box3"
    }
}
