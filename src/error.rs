//! Error types for the bgswap crate.

/// Errors that can occur while uploading, segmenting, compositing or exporting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external segmentation capability failed.
    #[error("segmentation failed: {0}")]
    Segmentation(String),

    /// A background image could not be fetched or decoded.
    #[error("failed to load background image: {0}")]
    BackgroundDecode(String),

    /// Encoding or writing the composite failed.
    #[error("export failed: {0}")]
    Export(String),

    /// A background description could not be parsed.
    #[error("invalid background `{input}`: {reason}")]
    InvalidBackground {
        /// The offending input string.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An upload violated the configured [`UploadPolicy`](crate::UploadPolicy).
    #[error("upload rejected: {0}")]
    UploadRejected(String),

    /// Two rasters that must share dimensions do not.
    #[error("dimension mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        /// Required width in pixels.
        expected_width: u32,
        /// Required height in pixels.
        expected_height: u32,
        /// Actual width in pixels.
        width: u32,
        /// Actual height in pixels.
        height: u32,
    },

    /// An operation was requested in a session state that does not allow it.
    #[error("cannot {action} while {state}")]
    InvalidState {
        /// What was attempted.
        action: &'static str,
        /// Name of the current session state.
        state: &'static str,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred during image decoding or encoding.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn invalid_background(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidBackground {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
