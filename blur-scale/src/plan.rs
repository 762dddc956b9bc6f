// SPDX-License-Identifier: MIT
//! # Scale Plan Computation
//!
//! Computes the output dimensions for a uniform downscale by a factor.
//!
//! - Each axis is `round(side * factor)` with halves rounding up
//! - Each axis is clamped to a minimum of 1px so no plan ever describes an empty buffer
//! - The factor is applied as-is; range policy belongs to the caller

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Number of pixels covered by this size.
    pub fn pixel_count(self) -> usize {
        (self.w as usize) * (self.h as usize)
    }

    /// Length in bytes of a tightly packed RGBA8 buffer of this size.
    pub fn byte_len(self) -> usize {
        self.pixel_count() * 4
    }
}

/// Scaling plan computed from an input size and a uniform factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Factor applied to both axes
    pub factor: f32,
    /// Final computed output dimensions
    pub out: Size,
}

/// Compute a uniform scaling plan.
///
/// # Arguments
/// * `input` - Source image dimensions
/// * `factor` - Multiplier applied to both sides
///
/// # Performance
/// O(1) computation with two floating-point multiplies
pub fn plan_scaled(input: Size, factor: f32) -> ScalePlan {
    ScalePlan {
        input,
        factor,
        out: Size {
            w: scaled_side(input.w, factor),
            h: scaled_side(input.h, factor),
        },
    }
}

/// Round-half-up scaling of a single side, never below 1px.
#[inline]
pub fn scaled_side(side: u32, factor: f32) -> u32 {
    // f32::round rounds half away from zero, which is half-up for non-negative values.
    let scaled = (side as f32 * factor).round();
    if scaled.is_nan() || scaled < 1.0 {
        1
    } else if scaled >= u32::MAX as f32 {
        u32::MAX
    } else {
        scaled as u32
    }
}
