//! # Bitmap Value
//!
//! The pixel buffer that flows through the transform. Pixels are tightly packed
//! RGBA8 rows held behind an `Arc`, so cloning an [`Image`] is cheap and never
//! copies pixel data. The transform only looks at the dimensions; the bytes are
//! handed to the scaler and the filter untouched.

use std::fmt;
use std::sync::Arc;

use ::image::RgbaImage;

use crate::error::BlurError;

pub use blur_scale::plan::Size;

/// Immutable RGBA8 image.
#[derive(Clone)]
pub struct Image {
    data: Arc<Vec<u8>>,
    size: Size,
}

impl Image {
    /// Wrap a tightly packed RGBA8 buffer.
    ///
    /// # Errors
    ///
    /// Returns [`BlurError::InvalidImage`] if `data.len() != width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BlurError> {
        let size = Size {
            w: width,
            h: height,
        };
        if data.len() != size.byte_len() {
            return Err(BlurError::InvalidImage {
                width,
                height,
                reason: format!(
                    "expected {} bytes of RGBA8, got {}",
                    size.byte_len(),
                    data.len()
                ),
            });
        }
        Ok(Self {
            data: Arc::new(data),
            size,
        })
    }

    /// An image filled with a single color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let size = Size {
            w: width,
            h: height,
        };
        Self {
            data: Arc::new(rgba.repeat(size.pixel_count())),
            size,
        }
    }

    pub(crate) fn from_parts(size: Size, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), size.byte_len());
        Self {
            data: Arc::new(data),
            size,
        }
    }

    pub fn width(&self) -> u32 {
        self.size.w
    }

    pub fn height(&self) -> u32 {
        self.size.h
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Raw RGBA8 bytes, row-major, no padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// True if both values share the same pixel buffer.
    pub fn ptr_eq(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Copy out into an `image` crate buffer.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.size.w, self.size.h, self.data.as_ref().clone())
            .unwrap_or_else(|| RgbaImage::new(self.size.w, self.size.h))
    }
}

impl From<RgbaImage> for Image {
    fn from(image: RgbaImage) -> Self {
        let (w, h) = image.dimensions();
        Self::from_parts(Size { w, h }, image.into_raw())
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && (self.ptr_eq(other) || self.data == other.data)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.size.w)
            .field("height", &self.size.h)
            .finish_non_exhaustive()
    }
}
