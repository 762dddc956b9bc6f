// SPDX-License-Identifier: MIT
//! # blur-scale: Downscale and Blur Helpers for RGBA8 Buffers
//!
//! Pixel-level building blocks used by `image_blur`. Nothing in here knows about
//! jobs, cancellation or configuration policy; every function takes plain
//! buffers and dimensions and writes into caller-provided output.
//!
//! ## Key Components
//!
//! - [`plan`]: Scaled-size computation (round-half-up, never below one pixel)
//! - [`cpu`]: Nearest-neighbour RGBA downscale built on fast_image_resize
//! - [`box_blur`]: Three-pass box approximation of a Gaussian blur
//!
//! ## Memory
//!
//! Scratch space is reserved with `try_reserve_exact`, so an allocation failure
//! comes back as an error value instead of aborting the process. Callers decide
//! what to do with it.
//!
//! ## Usage Example
//!
//! ```rust
//! use blur_scale::{box_blur::{gaussian_box_blur_rgba, Scratch}, cpu::scale_rgba_cpu, plan::{plan_scaled, Size}};
//!
//! let input = Size { w: 8, h: 6 };
//! let src = vec![128u8; 8 * 6 * 4];
//! let plan = plan_scaled(input, 0.5);
//!
//! let mut resizer = fast_image_resize::Resizer::new();
//! let mut scaled = vec![0u8; plan.out.byte_len()];
//! scale_rgba_cpu(&mut resizer, &src, &plan, &mut scaled).unwrap();
//!
//! let mut blurred = vec![0u8; plan.out.byte_len()];
//! let mut scratch = Scratch::new();
//! gaussian_box_blur_rgba(&scaled, plan.out, 3.0, &mut blurred, &mut scratch).unwrap();
//! assert!(blurred.iter().all(|&b| b == 128));
//! ```

pub mod box_blur;
pub mod cpu;
pub mod plan;
