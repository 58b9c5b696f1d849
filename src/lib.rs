//! Composite background-removed cutouts over new backdrops.
//!
//! An upload is segmented into a [`Cutout`] (RGBA pixels whose alpha marks the
//! foreground), which is then blended with "source-over" onto a solid color,
//! a linear gradient, or a stretched image, and exported as PNG. Segmentation
//! itself is an external capability behind the [`Segmenter`] trait.
//!
//! # Quick Start
//!
//! ```no_run
//! use bgswap::{composite, BackgroundSpec, Cutout};
//!
//! let cutout = Cutout::new(image::open("cutout.png").unwrap().to_rgba8());
//! let spec: BackgroundSpec = "linear-gradient(to right, #2193b0, #6dd5ed)".parse().unwrap();
//! let result = composite(&cutout, &spec).unwrap();
//! result.pixels().save("result.png").unwrap();
//! ```
//!
//! # Sessions
//!
//! [`Session`] drives the whole interactive flow as an explicit state
//! machine: segmentation runs on a worker thread reporting progress over a
//! channel, and backgrounds can be swapped without segmenting again.
//!
//! ```no_run
//! use bgswap::{AlphaChannelSegmenter, Session};
//!
//! let mut session = Session::new(AlphaChannelSegmenter);
//! session.upload("portrait.png", std::fs::read("portrait.png").unwrap()).unwrap();
//! session.wait().unwrap();
//! session.set_background("sunset".parse().unwrap());
//! let png = session.export().unwrap();
//! # let _ = png;
//! ```

#![deny(missing_docs)]

pub mod asset;
pub mod background;
pub mod blending;
pub mod color;
pub mod compositor;
mod engine;
pub mod error;
pub mod export;
pub mod progress;
mod raster;
pub mod segmentation;
pub mod session;
pub mod upload;

pub use asset::{AssetLoader, LocalAssetLoader};
pub use background::{BackgroundSpec, Direction, Gradient, GradientStop, ImageSource};
pub use color::Color;
pub use compositor::{composite, ComposeOptions, Compositor, Resample};
pub use engine::{CompositeEngine, ProcessOptions, ProcessResult};
pub use error::{Error, Result};
pub use export::{default_output_path, encode_png, save_image, RESULT_FILE_NAME};
pub use progress::ProgressReporter;
pub use raster::{CompositeResult, Cutout, SourceImage};
pub use segmentation::{AlphaChannelSegmenter, MaskSegmenter, Segmenter};
pub use session::{Notice, NoticeLevel, Session, SessionState};
pub use upload::{is_supported_image, UploadPolicy};
