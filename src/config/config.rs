//! # Blur Configuration
//!
//! [`BlurConfig`] is a value type. Every setter consumes the config and returns a
//! rebuilt one, so a job that captured a config at submission time can never
//! observe later changes made by the caller.
//!
//! ## Parameters
//!
//! | Parameter | Type | Range | Default | Out-of-range policy |
//! |-----------|------|-------|---------|---------------------|
//! | `scale` | `f32` | 0.2-0.9 | 0.3 | clamp to nearest bound |
//! | `intensity` | `f32` | 0.0-25.0 | 8.0 | anything outside `[0, 25)` becomes 25.0 |
//! | `allow_multiple_task` | `bool` | - | `false` | - |
//! | `on_out_of_memory` | callback | - | none | last registration wins |
//!
//! The intensity rule is asymmetric: a negative intensity does not
//! clamp to 0, it becomes the maximum.
//!
//! ## Examples
//!
//! ```rust
//! use image_blur::config::BlurConfig;
//!
//! let config = BlurConfig::default().with_scale(1.5).with_intensity(-1.0);
//! assert_eq!(config.scale(), 0.9);
//! assert_eq!(config.intensity(), 25.0);
//! assert!(!config.allow_multiple_task());
//! ```

use std::fmt;
use std::sync::Arc;

pub const MIN_SCALE: f32 = 0.2;
pub const MAX_SCALE: f32 = 0.9;
pub const MAX_INTENSITY: f32 = 25.0;
pub const DEFAULT_SCALE: f32 = 0.3;
pub const DEFAULT_INTENSITY: f32 = 8.0;

/// Notifier fired synchronously when the transform runs out of memory.
pub type OutOfMemoryHandler = Arc<dyn Fn() + Send + Sync>;

/// Clamp a scale factor to `[MIN_SCALE, MAX_SCALE]`. NaN resolves to `MIN_SCALE`.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale > MAX_SCALE {
        MAX_SCALE
    } else if scale < MIN_SCALE || scale.is_nan() {
        MIN_SCALE
    } else {
        scale
    }
}

/// Accept intensities in `[0, MAX_INTENSITY)`; everything else becomes `MAX_INTENSITY`.
///
/// `MAX_INTENSITY` itself takes the fallback branch, with the same result.
pub fn clamp_intensity(intensity: f32) -> f32 {
    if intensity < MAX_INTENSITY && intensity >= 0.0 {
        intensity
    } else {
        MAX_INTENSITY
    }
}

/// Snapshot of the parameters for one blur request.
#[derive(Clone)]
pub struct BlurConfig {
    scale: f32,
    intensity: f32,
    allow_multiple_task: bool,
    on_out_of_memory: Option<OutOfMemoryHandler>,
}

impl Default for BlurConfig {
    /// Defaults: scale 0.3, intensity 8.0, single task, no OOM handler.
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            intensity: DEFAULT_INTENSITY,
            allow_multiple_task: false,
            on_out_of_memory: None,
        }
    }
}

impl BlurConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from defaults plus the given overrides.
    ///
    /// Each override goes through the same setter as the fluent surface.
    pub fn configure(
        scale: Option<f32>,
        intensity: Option<f32>,
        allow_multiple_task: Option<bool>,
        on_out_of_memory: Option<OutOfMemoryHandler>,
    ) -> Self {
        let mut config = Self::default();
        if let Some(scale) = scale {
            config = config.with_scale(scale);
        }
        if let Some(intensity) = intensity {
            config = config.with_intensity(intensity);
        }
        if let Some(allow) = allow_multiple_task {
            config = config.with_multiple_task_allowed(allow);
        }
        if let Some(handler) = on_out_of_memory {
            config.on_out_of_memory = Some(handler);
        }
        config
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = clamp_scale(scale);
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = clamp_intensity(intensity);
        self
    }

    pub fn with_multiple_task_allowed(mut self, allow: bool) -> Self {
        self.allow_multiple_task = allow;
        self
    }

    /// Register the OOM notifier, replacing any previous one.
    pub fn with_out_of_memory_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_out_of_memory = Some(Arc::new(handler));
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn allow_multiple_task(&self) -> bool {
        self.allow_multiple_task
    }

    pub fn has_out_of_memory_handler(&self) -> bool {
        self.on_out_of_memory.is_some()
    }

    /// Fire the OOM notifier if one is registered. Panics from the handler propagate.
    pub(crate) fn notify_out_of_memory(&self) {
        if let Some(handler) = &self.on_out_of_memory {
            handler();
        }
    }
}

impl fmt::Debug for BlurConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlurConfig")
            .field("scale", &self.scale)
            .field("intensity", &self.intensity)
            .field("allow_multiple_task", &self.allow_multiple_task)
            .field("on_out_of_memory", &self.on_out_of_memory.is_some())
            .finish()
    }
}
