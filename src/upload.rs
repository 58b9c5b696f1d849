//! Upload acceptance rules.

use std::path::Path;

use crate::error::{Error, Result};

/// Extensions accepted for uploads.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

/// Limits applied to uploads before they are decoded.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Largest accepted upload, in bytes.
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    /// Check an upload named `name` of `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UploadRejected`] if the upload is empty, too large, or
    /// has an unsupported extension.
    pub fn check(&self, name: &str, len: usize) -> Result<()> {
        if len == 0 {
            return Err(Error::UploadRejected(format!("{name} is empty")));
        }
        if len > self.max_bytes {
            return Err(Error::UploadRejected(format!(
                "{name} is {len} bytes, limit is {}",
                self.max_bytes
            )));
        }
        if !is_supported_image(Path::new(name)) {
            return Err(Error::UploadRejected(format!(
                "{name} is not one of {}",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn policy_enforces_size_and_type() {
        let policy = UploadPolicy { max_bytes: 10 };
        assert!(policy.check("a.png", 10).is_ok());
        assert!(matches!(policy.check("a.png", 11), Err(Error::UploadRejected(_))));
        assert!(matches!(policy.check("a.png", 0), Err(Error::UploadRejected(_))));
        assert!(matches!(policy.check("a.gif", 5), Err(Error::UploadRejected(_))));
    }
}
