//! File and directory processing built on the compositor.

use std::path::{Path, PathBuf};

use crate::background::BackgroundSpec;
use crate::compositor::{ComposeOptions, Compositor};
use crate::error::{Error, Result};
use crate::export::{self, batch_output_path};
use crate::progress::{percent, ProgressReporter};
use crate::raster::{CompositeResult, SourceImage};
use crate::segmentation::{AlphaChannelSegmenter, MaskSegmenter, Segmenter};
use crate::upload::{is_supported_image, UploadPolicy};

/// Options controlling file processing.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Background to composite over.
    pub background: BackgroundSpec,
    /// Grayscale mask supplying the cutout alpha; without one the input's
    /// own alpha channel is used.
    pub mask: Option<PathBuf>,
    /// Process images even when compositing would not change them.
    pub force: bool,
    /// Upload limits applied to every input file.
    pub policy: UploadPolicy,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the input file.
    pub path: PathBuf,
    /// Where the result was written, if anywhere.
    pub output: Option<PathBuf>,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (nothing to composite).
    pub skipped: bool,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            output: None,
            success: false,
            skipped: false,
            message: String::new(),
        }
    }
}

/// Runs upload, segmentation, compositing and export for files on disk.
///
/// Create once and reuse for many files; the engine holds no per-image state.
#[derive(Default)]
pub struct CompositeEngine {
    compositor: Compositor,
}

impl CompositeEngine {
    /// An engine compositing with `options`.
    #[must_use]
    pub fn new(options: ComposeOptions) -> Self {
        Self::with_compositor(Compositor::new(options))
    }

    /// An engine around an existing compositor.
    #[must_use]
    pub fn with_compositor(compositor: Compositor) -> Self {
        Self { compositor }
    }

    /// Segment `source` and composite the cutout over `background`.
    ///
    /// # Errors
    ///
    /// Returns the segmenter's or compositor's error.
    pub fn render(
        &self,
        source: &SourceImage,
        segmenter: &dyn Segmenter,
        background: &BackgroundSpec,
    ) -> Result<CompositeResult> {
        let reporter = ProgressReporter::new(|p| tracing::debug!("Segmenting: {}%", percent(p)));
        let cutout = segmenter.segment(source, &reporter)?;
        self.compositor.composite(&cutout, background)
    }

    /// Process a single image file: load, segment, composite, save.
    ///
    /// Returns a [`ProcessResult`] indicating success, skip, or failure.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path, opts: &ProcessOptions) -> ProcessResult {
        let mut result = ProcessResult::new(input);

        if same_file(input, output) {
            result.message = "Output path is the input file; refusing to overwrite it".to_string();
            return result;
        }

        let segmenter: Box<dyn Segmenter> = match &opts.mask {
            Some(mask) => match std::fs::read(mask)
                .map_err(Error::from)
                .and_then(|bytes| MaskSegmenter::from_bytes(&bytes))
            {
                Ok(seg) => Box::new(seg),
                Err(e) => {
                    result.message = format!("Failed to load mask {}: {e}", mask.display());
                    return result;
                }
            },
            None => Box::new(AlphaChannelSegmenter),
        };

        let source = match load_source(input, &opts.policy) {
            Ok(source) => source,
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        // Without a mask an opaque input has nothing to cut out.
        if !opts.force && opts.mask.is_none() && !opts.background.is_none() && !has_alpha(&source) {
            result.skipped = true;
            result.success = true;
            result.message = "No transparent pixels; nothing to composite".to_string();
            return result;
        }

        let composite = match self.render(&source, segmenter.as_ref(), &opts.background) {
            Ok(c) => c,
            Err(e) => {
                result.message = format!("Failed to composite: {e}");
                return result;
            }
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match export::save_image(composite.pixels(), output) {
            Ok(()) => {
                result.success = true;
                result.output = Some(output.to_path_buf());
                result.message = format!("Composited over {}", opts.background);
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Each input `name.ext` is written to `output_dir/name.png`.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_ok_and(|ft| ft.is_file()))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                let mut failed = ProcessResult::new(input_dir);
                failed.message = format!("Failed to read directory: {e}");
                return vec![failed];
            }
        };
        entries.sort();

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                let mut failed = ProcessResult::new(output_dir);
                failed.message = format!("Failed to create output directory: {e}");
                return vec![failed];
            }
        }

        tracing::info!("Processing {} images from {}", entries.len(), input_dir.display());

        let process = |input: &PathBuf| {
            let output = batch_output_path(input, output_dir);
            self.process_file(input, &output, opts)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries.iter().map(process).collect()
        }
    }
}

fn load_source(path: &Path, policy: &UploadPolicy) -> Result<SourceImage> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    policy.check(&name, bytes.len())?;
    SourceImage::decode(bytes)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn has_alpha(source: &SourceImage) -> bool {
    source.image().color().has_alpha() && source.image().to_rgba8().pixels().any(|p| p[3] < 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_png(path: &Path, px: Rgba<u8>) {
        RgbaImage::from_pixel(4, 4, px).save(path).unwrap();
    }

    #[test]
    fn process_file_composites_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("nested/out.png");
        write_png(&input, Rgba([10, 20, 30, 128]));

        let opts = ProcessOptions {
            background: "#646464".parse().unwrap(),
            ..ProcessOptions::default()
        };
        let result = CompositeEngine::default().process_file(&input, &output, &opts);
        assert!(result.success, "{}", result.message);
        assert!(!result.skipped);

        let saved = image::open(&output).unwrap().to_rgba8();
        assert_eq!(*saved.get_pixel(2, 2), Rgba([55, 60, 65, 255]));
    }

    #[test]
    fn opaque_input_without_mask_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        write_png(&input, Rgba([10, 20, 30, 255]));

        let opts = ProcessOptions {
            background: "white".parse().unwrap(),
            ..ProcessOptions::default()
        };
        let output = dir.path().join("out.png");
        let result = CompositeEngine::default().process_file(&input, &output, &opts);
        assert!(result.skipped);
        assert!(!output.exists());

        let forced = ProcessOptions { force: true, ..opts };
        let result = CompositeEngine::default().process_file(&input, &output, &forced);
        assert!(result.success && !result.skipped);
        assert!(output.exists());
    }

    #[test]
    fn mask_file_drives_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let mask = dir.path().join("mask.png");
        write_png(&input, Rgba([200, 0, 0, 255]));
        image::GrayImage::from_pixel(4, 4, image::Luma([0]))
            .save(&mask)
            .unwrap();

        let opts = ProcessOptions {
            background: "#0000ff".parse().unwrap(),
            mask: Some(mask),
            ..ProcessOptions::default()
        };
        let output = dir.path().join("out.png");
        let result = CompositeEngine::default().process_file(&input, &output, &opts);
        assert!(result.success, "{}", result.message);
        let saved = image::open(&output).unwrap().to_rgba8();
        assert_eq!(*saved.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn refuses_to_overwrite_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bgremoval-result.png");
        write_png(&input, Rgba([10, 20, 30, 128]));

        let opts = ProcessOptions {
            background: "white".parse().unwrap(),
            ..ProcessOptions::default()
        };
        let engine = CompositeEngine::default();
        let result = engine.process_file(&input, &input, &opts);
        assert!(!result.success);
        assert!(result.message.contains("refusing"));
        let kept = image::open(&input).unwrap().to_rgba8();
        assert_eq!(*kept.get_pixel(0, 0), Rgba([10, 20, 30, 128]));

        let output = export::default_output_path(&input);
        let result = engine.process_file(&input, &output, &opts);
        assert!(result.success, "{}", result.message);
        let kept = image::open(&input).unwrap().to_rgba8();
        assert_eq!(*kept.get_pixel(0, 0), Rgba([10, 20, 30, 128]));
    }

    #[test]
    fn missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = CompositeEngine::default().process_file(
            &dir.path().join("absent.png"),
            &dir.path().join("out.png"),
            &ProcessOptions::default(),
        );
        assert!(!result.success);
        assert!(result.message.starts_with("Failed to load"));
    }

    #[test]
    fn process_directory_handles_every_supported_file() {
        let dir = tempfile::tempdir().unwrap();
        let input_dir = dir.path().join("in");
        let output_dir = dir.path().join("out");
        std::fs::create_dir_all(&input_dir).unwrap();
        write_png(&input_dir.join("a.png"), Rgba([1, 1, 1, 0]));
        write_png(&input_dir.join("b.png"), Rgba([2, 2, 2, 10]));
        std::fs::write(input_dir.join("readme.txt"), "ignored").unwrap();

        let opts = ProcessOptions {
            background: "sunset".parse().unwrap(),
            ..ProcessOptions::default()
        };
        let results = CompositeEngine::default().process_directory(&input_dir, &output_dir, &opts);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert!(output_dir.join("a.png").exists());
        assert!(output_dir.join("b.png").exists());
    }
}
