//! Encoding composites for download.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{Error, Result};

/// File name given to every downloaded result.
pub const RESULT_FILE_NAME: &str = "bgremoval-result.png";

/// Encode a raster as PNG, preserving alpha losslessly.
///
/// # Errors
///
/// Returns [`Error::Export`] if encoding fails.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| Error::Export(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Save a raster, choosing the format from the file extension.
///
/// PNG, WebP and BMP keep the alpha channel. JPEG has none, so it is only
/// accepted for fully opaque rasters.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for extensions without an encoder
/// here, and [`Error::Export`] if alpha would be lost or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .map_err(|_| Error::UnsupportedFormat(path.display().to_string()))?;

    let written = match format {
        ImageFormat::Jpeg => {
            if img.pixels().any(|p| p[3] != 255) {
                return Err(Error::Export(format!(
                    "{} would drop transparency; save as PNG instead",
                    path.display()
                )));
            }
            let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
            let file = std::fs::File::create(path)
                .map_err(|e| Error::Export(format!("{}: {e}", path.display())))?;
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&rgb)
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => img.save(path),
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    };

    written.map_err(|e| Error::Export(format!("{}: {e}", path.display())))?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Where the result for `input` goes when no output path is given:
/// `{stem}-bgremoval.png` next to the input.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or(Path::new("."));
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    parent.join(format!("{stem}-bgremoval.png"))
}

/// Output path for `input` inside a batch output directory: same stem, `.png`.
#[must_use]
pub fn batch_output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    output_dir.join(format!("{stem}.png"))
}
