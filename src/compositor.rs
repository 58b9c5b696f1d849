//! Rendering a cutout over its background.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::asset::{AssetLoader, LocalAssetLoader};
use crate::background::{BackgroundSpec, Gradient};
use crate::blending;
use crate::color::Color;
use crate::error::{Error, Result};
use crate::raster::{CompositeResult, Cutout};

/// How a background image is resampled to the cutout's size.
///
/// Images are always stretched to the exact cutout dimensions, never cropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resample {
    /// Nearest-neighbour sampling.
    Nearest,
    /// Bilinear interpolation (`image`'s triangle filter).
    #[default]
    Bilinear,
}

impl Resample {
    fn filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
        }
    }
}

/// Options controlling compositing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeOptions {
    /// Filter used when stretching image backgrounds.
    pub resample: Resample,
}

/// Composites cutouts over background specs.
///
/// Stateless apart from its options and asset loader: every call renders
/// from scratch and never modifies its inputs.
pub struct Compositor {
    options: ComposeOptions,
    loader: Box<dyn AssetLoader>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(ComposeOptions::default())
    }
}

impl Compositor {
    /// A compositor reading backgrounds with [`LocalAssetLoader`].
    #[must_use]
    pub fn new(options: ComposeOptions) -> Self {
        Self::with_loader(options, LocalAssetLoader)
    }

    /// A compositor using a custom asset loader.
    #[must_use]
    pub fn with_loader(options: ComposeOptions, loader: impl AssetLoader + 'static) -> Self {
        Self {
            options,
            loader: Box::new(loader),
        }
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> ComposeOptions {
        self.options
    }

    /// Render `cutout` over `spec`.
    ///
    /// `BackgroundSpec::None` returns the cutout pixels unchanged. Every other
    /// spec draws its base layer first and blends the cutout on top with
    /// source-over; an opaque base yields a fully opaque result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackgroundDecode`] if an image background cannot be
    /// fetched or decoded.
    pub fn composite(&self, cutout: &Cutout, spec: &BackgroundSpec) -> Result<CompositeResult> {
        let (width, height) = cutout.dimensions();
        let _span = tracing::debug_span!("composite", width, height).entered();

        let mut base = match spec {
            BackgroundSpec::None => return Ok(CompositeResult::new(cutout.pixels().clone())),
            BackgroundSpec::SolidColor(color) => fill(width, height, *color),
            BackgroundSpec::Gradient(gradient) => rasterize_gradient(gradient, width, height),
            BackgroundSpec::Image(source) => {
                let bytes = self.loader.load(source)?;
                let decoded = image::load_from_memory(&bytes)
                    .map_err(|e| Error::BackgroundDecode(e.to_string()))?;
                tracing::debug!(
                    "Stretching {}x{} background to {width}x{height} ({:?})",
                    decoded.width(),
                    decoded.height(),
                    self.options.resample
                );
                stretch(&decoded.to_rgba8(), width, height, self.options.resample)
            }
        };

        blending::composite_over(&mut base, cutout.pixels())?;
        Ok(CompositeResult::new(base))
    }
}

/// Composite with default options and the local asset loader.
///
/// # Errors
///
/// See [`Compositor::composite`].
pub fn composite(cutout: &Cutout, spec: &BackgroundSpec) -> Result<CompositeResult> {
    Compositor::default().composite(cutout, spec)
}

fn fill(width: u32, height: u32, color: Color) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba::from(color))
}

fn stretch(image: &RgbaImage, width: u32, height: u32, resample: Resample) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, resample.filter())
}

/// Rasterize a linear gradient into a `width` x `height` raster.
///
/// Each pixel's position is projected onto the direction vector and
/// normalized so the two extreme corners map to 0 and 1. For a horizontal
/// gradient this puts the first stop exactly at `x = 0` and the last stop
/// exactly at `x = width - 1`.
#[must_use]
pub fn rasterize_gradient(gradient: &Gradient, width: u32, height: u32) -> RgbaImage {
    let (dx, dy) = gradient.direction().vector();
    #[allow(clippy::cast_precision_loss)]
    let (max_x, max_y) = (width.saturating_sub(1) as f32, height.saturating_sub(1) as f32);

    let project = |x: f32, y: f32| x * dx + y * dy;
    let corners = [
        project(0.0, 0.0),
        project(max_x, 0.0),
        project(0.0, max_y),
        project(max_x, max_y),
    ];
    let lo = corners.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = corners.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = hi - lo;

    RgbaImage::from_fn(width, height, |x, y| {
        #[allow(clippy::cast_precision_loss)]
        let p = project(x as f32, y as f32);
        let t = if span <= f32::EPSILON { 0.0 } else { (p - lo) / span };
        Rgba::from(gradient.color_at(t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{Direction, GradientStop, ImageSource};
    use image::ImageFormat;
    use std::io::Cursor;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    fn sample_cutout() -> Cutout {
        let alphas = [255u8, 128, 0, 255];
        let mut img = RgbaImage::new(2, 2);
        for (px, a) in img.pixels_mut().zip(alphas) {
            *px = Rgba([10, 20, 30, a]);
        }
        Cutout::new(img)
    }

    fn png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn none_is_identity() {
        let cutout = sample_cutout();
        let out = composite(&cutout, &BackgroundSpec::None).unwrap();
        assert_eq!(out.into_pixels(), *cutout.pixels());
    }

    #[test]
    fn solid_color_matches_reference_pixels() {
        let cutout = sample_cutout();
        let spec = BackgroundSpec::SolidColor(Color::rgb(100, 100, 100));
        let out = composite(&cutout, &spec).unwrap();

        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(*out.pixels().get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert_eq!(*out.pixels().get_pixel(1, 0), Rgba([55, 60, 65, 255]));
        assert_eq!(*out.pixels().get_pixel(0, 1), Rgba([100, 100, 100, 255]));
        assert!(out.is_opaque());
    }

    #[test]
    fn compositing_is_deterministic() {
        let cutout = sample_cutout();
        let spec: BackgroundSpec = "linear-gradient(45deg, #123456, #abcdef)".parse().unwrap();
        let a = composite(&cutout, &spec).unwrap();
        let b = composite(&cutout, &spec).unwrap();
        assert_eq!(a.pixels().as_raw(), b.pixels().as_raw());
    }

    #[test]
    fn horizontal_gradient_hits_endpoints_and_is_monotonic() {
        let gradient = Gradient::new(
            vec![GradientStop::new(RED, 0.0), GradientStop::new(BLUE, 1.0)],
            Direction::ToRight,
        )
        .unwrap();
        let img = rasterize_gradient(&gradient, 100, 3);

        assert_eq!(*img.get_pixel(0, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(99, 1), Rgba([0, 0, 255, 255]));
        for x in 1..100 {
            let prev = img.get_pixel(x - 1, 0);
            let cur = img.get_pixel(x, 0);
            assert!(cur[0] <= prev[0], "red rises at x={x}");
            assert!(cur[2] >= prev[2], "blue falls at x={x}");
        }
        // Rows are identical for a horizontal gradient.
        assert_eq!(img.get_pixel(50, 0), img.get_pixel(50, 2));
    }

    #[test]
    fn vertical_and_reversed_directions() {
        let down = rasterize_gradient(&Gradient::linear(RED, BLUE, Direction::ToBottom), 4, 10);
        assert_eq!(*down.get_pixel(2, 0), Rgba::from(RED));
        assert_eq!(*down.get_pixel(2, 9), Rgba::from(BLUE));

        let left = rasterize_gradient(&Gradient::linear(RED, BLUE, Direction::ToLeft), 10, 2);
        assert_eq!(*left.get_pixel(9, 0), Rgba::from(RED));
        assert_eq!(*left.get_pixel(0, 0), Rgba::from(BLUE));

        let angled = rasterize_gradient(&Gradient::linear(RED, BLUE, Direction::Angle(90.0)), 10, 2);
        assert_eq!(*angled.get_pixel(0, 0), Rgba::from(RED));
        assert_eq!(angled.get_pixel(9, 1)[2], 255);
    }

    #[test]
    fn single_pixel_gradient_uses_first_stop() {
        let img = rasterize_gradient(&Gradient::linear(RED, BLUE, Direction::ToRight), 1, 1);
        assert_eq!(*img.get_pixel(0, 0), Rgba::from(RED));
    }

    #[test]
    fn gradient_background_is_opaque_under_cutout() {
        let out = composite(
            &sample_cutout(),
            &BackgroundSpec::Gradient(Gradient::linear(RED, BLUE, Direction::ToBottomRight)),
        )
        .unwrap();
        assert!(out.is_opaque());
        // Fully transparent cutout pixel shows the gradient midpoint.
        assert_eq!(*out.pixels().get_pixel(0, 1), Rgba([128, 0, 128, 255]));
    }

    #[test]
    fn image_background_is_stretched_to_cutout() {
        let bg = RgbaImage::from_pixel(7, 5, Rgba([0, 200, 0, 255]));
        let spec = BackgroundSpec::Image(ImageSource::Bytes(png(&bg)));

        for resample in [Resample::Nearest, Resample::Bilinear] {
            let compositor = Compositor::new(ComposeOptions { resample });
            assert_eq!(compositor.options().resample, resample);
            let out = compositor.composite(&sample_cutout(), &spec).unwrap();
            assert_eq!(out.dimensions(), (2, 2));
            assert_eq!(*out.pixels().get_pixel(0, 1), Rgba([0, 200, 0, 255]));
            assert!(out.is_opaque());
        }
    }

    #[test]
    fn undecodable_background_fails_without_touching_cutout() {
        let cutout = sample_cutout();
        let before = cutout.clone();
        let spec = BackgroundSpec::Image(ImageSource::Bytes(b"definitely not png".to_vec()));

        let err = composite(&cutout, &spec).unwrap_err();
        assert!(matches!(err, Error::BackgroundDecode(_)));
        assert_eq!(cutout, before);
    }

    #[test]
    fn custom_loader_is_consulted() {
        struct Fixed(Vec<u8>);
        impl AssetLoader for Fixed {
            fn load(&self, _source: &ImageSource) -> Result<Vec<u8>> {
                Ok(self.0.clone())
            }
        }

        let bg = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        let compositor = Compositor::with_loader(ComposeOptions::default(), Fixed(png(&bg)));
        let spec = BackgroundSpec::Image(ImageSource::Url("https://cdn.example/bg.png".into()));
        let out = compositor.composite(&sample_cutout(), &spec).unwrap();
        assert_eq!(*out.pixels().get_pixel(0, 1), Rgba([9, 9, 9, 255]));
    }
}
