//! # Error Handling
//!
//! Two error families live here:
//!
//! - [`FilterError`]: what the transform can hit while scaling or filtering. It never
//!   leaves the transform; allocation failures fall back to the original image.
//! - [`BlurError`]: what the public surface returns. Only misuse, image loading and
//!   worker failures are represented; cancellation is never an error.
//!
//! Both carry a category and a severity so callers can route them the way the rest
//! of their application routes errors.
//!
//! ## Usage
//!
//! ```rust
//! use image_blur::error::{BlurError, ErrorSeverity, HasSeverity};
//!
//! let error = BlurError::misuse("submit", "controller has been shut down");
//! assert_eq!(error.category(), "misuse");
//! assert_eq!(error.severity(), ErrorSeverity::Fatal);
//! ```

use thiserror::Error;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, expected during normal operation
    Info,
    /// Something degraded but the caller still got a result
    Warning,
    /// The operation failed
    Error,
    /// A worker died unexpectedly
    Critical,
    /// A programming error on the caller's side
    Fatal,
}

/// Failures inside the scale-then-blur transform.
#[derive(Debug, Error)]
pub enum FilterError {
    /// An allocation needed by the transform or the filter could not be satisfied.
    #[error("out of memory while {operation} ({requested} bytes)")]
    OutOfMemory {
        operation: &'static str,
        requested: usize,
    },

    /// Downscaling the input failed.
    #[error("scaling failed: {0}")]
    Scale(#[from] blur_scale::cpu::ScaleError),

    /// The filter backend rejected the input for a reason other than memory.
    #[error("blur backend error: {0}")]
    Backend(String),
}

impl FilterError {
    /// Create an out-of-memory error
    pub fn out_of_memory(operation: &'static str, requested: usize) -> Self {
        Self::OutOfMemory {
            operation,
            requested,
        }
    }

    /// Whether this is an allocation failure.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Get error category as string
    pub fn category(&self) -> &'static str {
        match self {
            Self::OutOfMemory { .. } => "out_of_memory",
            Self::Scale(_) => "scale",
            Self::Backend(_) => "backend",
        }
    }
}

impl From<blur_scale::box_blur::BlurError> for FilterError {
    fn from(error: blur_scale::box_blur::BlurError) -> Self {
        match error {
            blur_scale::box_blur::BlurError::OutOfMemory { requested } => {
                Self::out_of_memory("reserving blur scratch", requested)
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Errors surfaced by the public API.
#[derive(Debug, Error)]
pub enum BlurError {
    /// Pixel buffer does not match the declared dimensions.
    #[error("invalid image {width}x{height}: {reason}")]
    InvalidImage {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Resource lookup failed.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Resource exists but could not be decoded.
    #[error("failed to decode '{resource}': {reason}")]
    Decode { resource: String, reason: String },

    /// Invalid call sequence; a programming error rather than a runtime condition.
    #[error("misuse of {operation}: {reason}")]
    Misuse {
        operation: &'static str,
        reason: String,
    },

    /// Background worker panicked or was torn down.
    #[error("blur worker failed: {0}")]
    Worker(String),
}

impl BlurError {
    /// Create a misuse error
    pub fn misuse(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Misuse {
            operation,
            reason: reason.into(),
        }
    }

    /// Create a decode error
    pub fn decode(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Get error category as string
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidImage { .. } => "invalid_image",
            Self::NotFound(_) => "not_found",
            Self::Decode { .. } => "decode",
            Self::Misuse { .. } => "misuse",
            Self::Worker(_) => "worker",
        }
    }

    /// Whether this error indicates a bug in the calling code.
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::Misuse { .. } | Self::InvalidImage { .. })
    }
}

impl From<tokio::task::JoinError> for BlurError {
    fn from(error: tokio::task::JoinError) -> Self {
        if error.is_cancelled() {
            Self::Worker("worker task was cancelled".to_string())
        } else {
            Self::Worker(format!("worker task panicked: {error}"))
        }
    }
}

/// Trait for getting error severity
pub trait HasSeverity {
    /// Get the error severity
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for BlurError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Misuse { .. } | Self::InvalidImage { .. } => ErrorSeverity::Fatal,
            Self::Worker(_) => ErrorSeverity::Critical,
            Self::NotFound(_) | Self::Decode { .. } => ErrorSeverity::Error,
        }
    }
}

impl HasSeverity for FilterError {
    // The transform always hands back an image, so these only ever degrade output.
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }
}
