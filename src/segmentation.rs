//! The segmentation boundary.
//!
//! Background removal proper is an external capability; this module only
//! defines the contract ([`Segmenter`]) and two deterministic adapters that
//! feed the compositor without a model: one trusting the upload's own alpha,
//! one applying a grayscale mask.

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::raster::{Cutout, SourceImage};

/// Anything that can turn a [`SourceImage`] into a [`Cutout`].
///
/// Implementations may report progress any number of times; the reporter
/// enforces that the fractions seen downstream are monotonic and in `[0, 1]`.
pub trait Segmenter: Send + Sync {
    /// Separate foreground from background.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Segmentation`] when the image cannot be processed.
    fn segment(&self, image: &SourceImage, progress: &ProgressReporter) -> Result<Cutout>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Uses the upload's alpha channel as the cutout.
///
/// For images whose background was already removed by an external tool.
/// Images without alpha come out fully opaque.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaChannelSegmenter;

impl Segmenter for AlphaChannelSegmenter {
    fn segment(&self, image: &SourceImage, progress: &ProgressReporter) -> Result<Cutout> {
        progress.report(0.0);
        let cutout = Cutout::for_source(image, image.image().to_rgba8())?;
        progress.report(1.0);
        Ok(cutout)
    }

    fn name(&self) -> &'static str {
        "alpha-channel"
    }
}

/// Applies a grayscale coverage mask (0 = background, 255 = foreground).
///
/// A mask whose size differs from the image is resized with a triangle
/// filter before it is applied.
#[derive(Debug, Clone)]
pub struct MaskSegmenter {
    mask: GrayImage,
}

impl MaskSegmenter {
    /// Use `mask` as the foreground coverage.
    #[must_use]
    pub fn new(mask: GrayImage) -> Self {
        Self { mask }
    }

    /// Decode a mask image; color masks are reduced to luma.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Segmentation`] if the bytes are not a decodable image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mask = image::load_from_memory(bytes)
            .map_err(|e| Error::Segmentation(format!("failed to decode mask: {e}")))?;
        Ok(Self::new(mask.to_luma8()))
    }
}

impl Segmenter for MaskSegmenter {
    fn segment(&self, image: &SourceImage, progress: &ProgressReporter) -> Result<Cutout> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::Segmentation("image has no pixels".to_string()));
        }
        progress.report(0.0);

        let mask = if self.mask.dimensions() == (w, h) {
            self.mask.clone()
        } else {
            tracing::debug!(
                "Resizing {}x{} mask to {w}x{h}",
                self.mask.width(),
                self.mask.height()
            );
            imageops::resize(&self.mask, w, h, FilterType::Triangle)
        };
        progress.report(0.5);

        let mut pixels = image.image().to_rgba8();
        for (px, m) in pixels.pixels_mut().zip(mask.pixels()) {
            let coverage = u16::from(px[3]) * u16::from(m[0]);
            #[allow(clippy::cast_possible_truncation)]
            let alpha = ((coverage + 127) / 255) as u8;
            px[3] = alpha;
        }
        progress.report(1.0);

        Cutout::for_source(image, pixels)
    }

    fn name(&self) -> &'static str {
        "mask"
    }
}
