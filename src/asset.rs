//! Fetching background image bytes.
//!
//! Background images are referenced by URL, path or in-memory bytes. The
//! [`AssetLoader`] trait turns such a reference into encoded bytes; any failure
//! is reported as [`Error::BackgroundDecode`] so that a bad background never
//! takes the cutout down with it.

use std::path::Path;

use crate::background::ImageSource;
use crate::error::{Error, Result};

/// Resolves an [`ImageSource`] to encoded image bytes.
pub trait AssetLoader: Send + Sync {
    /// Fetch the encoded bytes behind `source`.
    ///
    /// # Errors
    ///
    /// Implementations report every failure as [`Error::BackgroundDecode`].
    fn load(&self, source: &ImageSource) -> Result<Vec<u8>>;
}

/// Loads backgrounds from memory and the local filesystem.
///
/// `file://` URLs and bare paths are read from disk. Remote `http(s)://` URLs
/// are refused; callers that need them inject their own loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAssetLoader;

impl AssetLoader for LocalAssetLoader {
    fn load(&self, source: &ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::Bytes(bytes) => Ok(bytes.clone()),
            ImageSource::Path(path) => read(path),
            ImageSource::Url(url) => {
                if source.is_remote() {
                    return Err(Error::BackgroundDecode(format!(
                        "remote background {url} cannot be fetched by the local loader"
                    )));
                }
                let path = url.strip_prefix("file://").unwrap_or(url);
                read(Path::new(path))
            }
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    tracing::debug!("Reading background image {}", path.display());
    std::fs::read(path)
        .map_err(|e| Error::BackgroundDecode(format!("{}: {e}", path.display())))
}
