//! # Configuration Module
//!
//! Per-call blur configuration: scale, intensity, coalescing policy and the
//! out-of-memory notifier.

pub mod config;

pub use config::{
    BlurConfig, DEFAULT_INTENSITY, DEFAULT_SCALE, MAX_INTENSITY, MAX_SCALE, MIN_SCALE,
    OutOfMemoryHandler, clamp_intensity, clamp_scale,
};
