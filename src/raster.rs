//! The rasters flowing through the pipeline: upload, cutout, composite.

use std::fmt;

use image::{DynamicImage, GenericImageView, RgbaImage};

use crate::error::{Error, Result};

/// A decoded upload: the original bytes plus the decoded pixels.
///
/// Immutable once loaded.
#[derive(Clone)]
pub struct SourceImage {
    bytes: Vec<u8>,
    image: DynamicImage,
}

impl SourceImage {
    /// Decode an upload from its encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if the bytes are not a decodable image.
    pub fn decode(bytes: Vec<u8>) -> Result<Self> {
        let image = image::load_from_memory(&bytes)?;
        Ok(Self { bytes, image })
    }

    /// Wrap an already decoded image. The original bytes are left empty.
    #[must_use]
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            bytes: Vec::new(),
            image,
        }
    }

    /// The encoded upload as received.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The decoded pixels.
    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Pixel width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Pixel height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("bytes", &self.bytes.len())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// A segmented foreground: RGBA pixels whose alpha is foreground coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cutout {
    pixels: RgbaImage,
}

impl Cutout {
    /// Wrap an RGBA raster as a cutout.
    #[must_use]
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Build a cutout for `source`, checking that dimensions agree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `pixels` and `source` differ in size.
    pub fn for_source(source: &SourceImage, pixels: RgbaImage) -> Result<Self> {
        let (w, h) = source.dimensions();
        if pixels.dimensions() != (w, h) {
            return Err(Error::DimensionMismatch {
                expected_width: w,
                expected_height: h,
                width: pixels.width(),
                height: pixels.height(),
            });
        }
        Ok(Self::new(pixels))
    }

    /// The RGBA pixels.
    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// The flattened output of compositing a cutout over a background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeResult {
    pixels: RgbaImage,
}

impl CompositeResult {
    pub(crate) fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// The RGBA pixels.
    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consume the result, returning its pixels.
    #[must_use]
    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Whether every pixel is fully opaque.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([1, 2, 3, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn source_image_keeps_bytes_and_dimensions() {
        let bytes = png_bytes(5, 3);
        let src = SourceImage::decode(bytes.clone()).unwrap();
        assert_eq!(src.dimensions(), (5, 3));
        assert_eq!(src.bytes(), bytes.as_slice());
    }

    #[test]
    fn source_image_rejects_garbage() {
        assert!(matches!(
            SourceImage::decode(b"not an image".to_vec()),
            Err(Error::Image(_))
        ));
    }

    #[test]
    fn cutout_for_source_checks_dimensions() {
        let src = SourceImage::decode(png_bytes(4, 4)).unwrap();
        assert!(Cutout::for_source(&src, RgbaImage::new(4, 4)).is_ok());
        assert!(matches!(
            Cutout::for_source(&src, RgbaImage::new(4, 2)),
            Err(Error::DimensionMismatch { height: 2, .. })
        ));
    }
}
