//! # Job Controller Module
//!
//! Single-flight scheduling of blur jobs: admission, supersession and delivery.

pub mod controller;
pub mod job;

pub use controller::BlurController;
pub use job::{JobId, JobState};
