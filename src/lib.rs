//! # Image Blur Library
//!
//! Downscale-and-blur for images, delivered asynchronously with single-flight
//! job control.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `config`: Per-call blur parameters and their clamping rules
//! - `filter`: The blur primitive seam plus a CPU box-blur backend
//! - `transform`: Scale-then-blur with out-of-memory fallback
//! - `controller`: Job admission, supersession and delivery
//! - `sink`: Where finished images go
//! - `request`: Fluent per-call surface over the controller
//! - `store`: Resource-to-image loading
//!
//! ## Features
//!
//! - **Single-flight by default**: a new request supersedes the one in flight and the
//!   superseded result is never delivered
//! - **Never fails on memory pressure**: allocation failures fall back to the original
//!   image and fire an optional notifier
//! - **Value-type config**: each job captures its own snapshot
//! - **Pluggable backends**: any `BlurFilter` can replace the CPU implementation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use image_blur::{BlurController, BoxBlurFilter, Image, Preview};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), image_blur::BlurError> {
//!     let controller = BlurController::with_current_runtime(Arc::new(BoxBlurFilter::default()))?;
//!     let preview = Preview::new();
//!     let mut shown = preview.subscribe();
//!
//!     let image = Image::filled(1000, 800, [120, 80, 40, 255]);
//!     controller.load(image).intensity(8.0).scale(0.5).into(preview.clone())?;
//!
//!     shown.changed().await.ok();
//!     assert_eq!(preview.current().map(|i| i.width()), Some(500));
//!     Ok(())
//! }
//! ```

pub mod bitmap;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod request;
pub mod sink;
pub mod store;
pub mod transform;

pub use bitmap::{Image, Size};
pub use config::BlurConfig;
pub use controller::{BlurController, JobId, JobState};
pub use error::{BlurError, ErrorSeverity, FilterError, HasSeverity};
pub use filter::{BlurFilter, BoxBlurFilter};
pub use request::BlurRequest;
pub use sink::{Preview, Sink};
pub use store::{DirImageStore, ImageStore};
pub use transform::BlurTransform;
