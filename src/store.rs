//! # Image Store
//!
//! Convenience loader turning a resource id into an [`Image`]. The controller never
//! calls this; it exists for callers that want the `load_resource → blur` shortcut.
//! Decoding is CPU-bound and runs on tokio's blocking pool.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::bitmap::Image;
use crate::error::BlurError;

/// Resource-to-image loader.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Decode the resource into RGBA8.
    ///
    /// # Errors
    ///
    /// [`BlurError::NotFound`] when the resource does not exist, [`BlurError::Decode`]
    /// when it exists but is not a readable image.
    async fn decode(&self, resource: &str) -> Result<Image, BlurError>;
}

/// Store backed by a directory; resource ids are paths relative to its root.
#[derive(Debug, Clone)]
pub struct DirImageStore {
    root: PathBuf,
}

impl DirImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a resource id to a path under the root. Ids may not leave the root.
    fn resolve(&self, resource: &str) -> Result<PathBuf, BlurError> {
        let relative = Path::new(resource);
        let escapes = relative.components().any(|component| {
            !matches!(component, Component::Normal(_) | Component::CurDir)
        });
        if resource.is_empty() || escapes {
            return Err(BlurError::misuse(
                "decode",
                format!("resource id '{resource}' must be a relative path inside the store"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for DirImageStore {
    async fn decode(&self, resource: &str) -> Result<Image, BlurError> {
        let path = self.resolve(resource)?;
        let resource = resource.to_string();

        tokio::task::spawn_blocking(move || {
            if !path.is_file() {
                return Err(BlurError::NotFound(resource));
            }
            let decoded = ::image::open(&path)
                .map_err(|err| BlurError::decode(resource.as_str(), err.to_string()))?;
            let image = Image::from(decoded.to_rgba8());
            debug!(
                resource = %resource,
                width = image.width(),
                height = image.height(),
                "decoded image resource"
            );
            Ok(image)
        })
        .await?
    }
}
