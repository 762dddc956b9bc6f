// SPDX-License-Identifier: MIT
// CPU downscaler built on fast_image_resize (SIMD-accelerated).
// RGBA8 in → RGBA8 out, nearest-neighbour, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeAlg, ResizeOptions, Resizer};

use crate::plan::ScalePlan;

#[derive(Debug)]
pub enum ScaleError {
    SourceTooSmall,
    BufferTooSmall,
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::SourceTooSmall => write!(f, "Source buffer smaller than input size"),
            ScaleError::BufferTooSmall => write!(f, "Output buffer too small"),
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Main scaling entry point.
/// `src_rgba` must hold at least `plan.input.byte_len()` tightly packed bytes.
/// `dst` must be at least `plan.out.byte_len()` bytes; only that prefix is written.
pub fn scale_rgba_cpu(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    let src_len = plan.input.byte_len();
    if src_rgba.len() < src_len {
        return Err(ScaleError::SourceTooSmall);
    }
    let dst_len = plan.out.byte_len();
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall);
    }

    // Same size: nothing to resample.
    if plan.input == plan.out {
        dst[..dst_len].copy_from_slice(&src_rgba[..src_len]);
        return Ok(());
    }

    let src_view = TypedImageRef::<U8x4>::from_buffer(plan.input.w, plan.input.h, &src_rgba[..src_len])?;
    let mut dst_image = TypedImage::<U8x4>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    // Interpolation is not load-bearing here; the blur pass smooths it out anyway.
    let opts = ResizeOptions::new()
        .resize_alg(ResizeAlg::Nearest)
        .use_alpha(false);

    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
    Ok(())
}
