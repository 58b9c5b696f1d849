//! The interactive flow: upload, segment, pick a background, composite, export.
//!
//! A [`Session`] moves through an explicit [`SessionState`]:
//!
//! ```text
//! Idle -> Uploading -> Segmenting -> Ready <-> Compositing
//! ```
//!
//! Segmentation runs on a worker thread and talks back over a channel of
//! [`SegmentationEvent`]s tagged with a job id. Each upload starts a new job;
//! events from superseded jobs are dropped when they arrive. Every failure is
//! recorded as a dismissible [`Notice`] and leaves the last valid source and
//! cutout in place so the failed step can be retried on its own.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use image::RgbaImage;

use crate::background::BackgroundSpec;
use crate::compositor::Compositor;
use crate::error::{Error, Result};
use crate::export::{self, RESULT_FILE_NAME};
use crate::progress::{percent, ProgressReporter};
use crate::raster::{CompositeResult, Cutout, SourceImage};
use crate::segmentation::Segmenter;
use crate::upload::UploadPolicy;

/// Identifies one segmentation run.
pub type JobId = u64;

/// Messages sent from a segmentation worker to its session.
#[derive(Debug)]
pub enum SegmentationEvent {
    /// The job has completed `fraction` of its work.
    Progress {
        /// Job the report belongs to.
        job: JobId,
        /// Completed fraction in `[0, 1]`.
        fraction: f32,
    },
    /// The job is done.
    Finished {
        /// Job that finished.
        job: JobId,
        /// The cutout, or why there is none.
        result: Result<Cutout>,
    },
}

/// Where the session is in the upload-to-export flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    /// Nothing in flight. A source may be present after a failed segmentation.
    Idle,
    /// An upload is being checked and decoded.
    Uploading,
    /// A segmentation job is running.
    Segmenting {
        /// The job whose result the session is waiting for.
        job: JobId,
        /// Last progress reported by that job.
        progress: f32,
    },
    /// A cutout is available; backgrounds can be chosen and composited.
    Ready,
    /// A composite is being rendered.
    Compositing,
}

impl SessionState {
    /// Lower-case state name for messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Segmenting { .. } => "segmenting",
            Self::Ready => "ready",
            Self::Compositing => "compositing",
        }
    }
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something started.
    Info,
    /// Something completed.
    Success,
    /// Something failed; the previous state was kept.
    Error,
}

/// A user-facing, dismissible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

/// One user's upload-to-export flow.
pub struct Session {
    state: SessionState,
    policy: UploadPolicy,
    compositor: Compositor,
    segmenter: Arc<dyn Segmenter>,
    source: Option<Arc<SourceImage>>,
    cutout: Option<Cutout>,
    background: BackgroundSpec,
    composite: Option<CompositeResult>,
    current_job: JobId,
    events_tx: Sender<SegmentationEvent>,
    events_rx: Receiver<SegmentationEvent>,
    notices: Vec<Notice>,
}

impl Session {
    /// A session segmenting uploads with `segmenter`.
    pub fn new(segmenter: impl Segmenter + 'static) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            state: SessionState::Idle,
            policy: UploadPolicy::default(),
            compositor: Compositor::default(),
            segmenter: Arc::new(segmenter),
            source: None,
            cutout: None,
            background: BackgroundSpec::None,
            composite: None,
            current_job: 0,
            events_tx,
            events_rx,
            notices: Vec::new(),
        }
    }

    /// Replace the upload policy.
    #[must_use]
    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the compositor.
    #[must_use]
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Progress of the running segmentation, if any.
    #[must_use]
    pub fn progress(&self) -> Option<f32> {
        match self.state {
            SessionState::Segmenting { progress, .. } => Some(progress),
            _ => None,
        }
    }

    /// The current upload.
    #[must_use]
    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_deref()
    }

    /// The current cutout.
    #[must_use]
    pub fn cutout(&self) -> Option<&Cutout> {
        self.cutout.as_ref()
    }

    /// The selected background.
    #[must_use]
    pub fn background(&self) -> &BackgroundSpec {
        &self.background
    }

    /// The latest composite, if it is up to date.
    #[must_use]
    pub fn composite_result(&self) -> Option<&CompositeResult> {
        self.composite.as_ref()
    }

    /// What to show: the composite when there is one, otherwise the bare cutout.
    #[must_use]
    pub fn preview(&self) -> Option<&RgbaImage> {
        self.composite
            .as_ref()
            .map(CompositeResult::pixels)
            .or_else(|| self.cutout.as_ref().map(Cutout::pixels))
    }

    /// Pending notices, oldest first.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Remove the notice at `index`.
    pub fn dismiss(&mut self, index: usize) -> Option<Notice> {
        (index < self.notices.len()).then(|| self.notices.remove(index))
    }

    /// Accept a new upload and start segmenting it.
    ///
    /// Replaces the previous source and cutout. A segmentation still running
    /// for an earlier upload is left to finish, but its result is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UploadRejected`] or [`Error::Image`] if the upload is
    /// refused or undecodable; the previous state is kept in that case.
    pub fn upload(&mut self, name: &str, bytes: Vec<u8>) -> Result<JobId> {
        let previous = self.state;
        self.transition(SessionState::Uploading);

        let source = self
            .policy
            .check(name, bytes.len())
            .and_then(|()| SourceImage::decode(bytes));
        let source = match source {
            Ok(source) => source,
            Err(e) => {
                self.transition(previous);
                self.notify(NoticeLevel::Error, format!("Could not load {name}: {e}"));
                return Err(e);
            }
        };

        tracing::info!(
            "Uploaded {name} ({}x{}, {} bytes)",
            source.width(),
            source.height(),
            source.bytes().len()
        );
        self.source = Some(Arc::new(source));
        self.cutout = None;
        self.composite = None;
        self.start_segmentation()
    }

    /// Run segmentation again on the current upload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if there is no upload or a job is
    /// already running.
    pub fn retry_segmentation(&mut self) -> Result<JobId> {
        if self.source.is_none() || matches!(self.state, SessionState::Segmenting { .. }) {
            return Err(self.invalid("retry segmentation"));
        }
        self.start_segmentation()
    }

    fn start_segmentation(&mut self) -> Result<JobId> {
        let Some(source) = self.source.clone() else {
            return Err(self.invalid("segment"));
        };

        self.current_job += 1;
        let job = self.current_job;
        let segmenter = Arc::clone(&self.segmenter);
        let tx = self.events_tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("segment-{job}"))
            .spawn(move || {
                let progress_tx = tx.clone();
                let reporter = ProgressReporter::new(move |fraction| {
                    let _ = progress_tx.send(SegmentationEvent::Progress { job, fraction });
                });
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    segmenter.segment(&source, &reporter)
                }))
                .unwrap_or_else(|_| {
                    Err(Error::Segmentation(format!("{} panicked", segmenter.name())))
                });
                let _ = tx.send(SegmentationEvent::Finished { job, result });
            });

        if let Err(e) = spawned {
            self.transition(SessionState::Idle);
            self.notify(NoticeLevel::Error, format!("Could not start background removal: {e}"));
            return Err(Error::Io(e));
        }

        tracing::info!("Started segmentation job {job} with {}", self.segmenter.name());
        self.transition(SessionState::Segmenting { job, progress: 0.0 });
        self.notify(NoticeLevel::Info, "Starting background removal...".to_string());
        Ok(job)
    }

    /// Apply every segmentation event received so far without blocking.
    ///
    /// Returns the number of events handled, stale ones included.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Block until the running segmentation job finishes.
    ///
    /// Returns immediately if no job is running.
    ///
    /// # Errors
    ///
    /// Returns the job's error if segmentation failed.
    pub fn wait(&mut self) -> Result<()> {
        while matches!(self.state, SessionState::Segmenting { .. }) {
            let Ok(event) = self.events_rx.recv() else {
                break;
            };
            if let Some(outcome) = self.handle(event) {
                return outcome;
            }
        }
        Ok(())
    }

    /// Apply one event. Returns the outcome when the current job finishes.
    fn handle(&mut self, event: SegmentationEvent) -> Option<Result<()>> {
        match event {
            SegmentationEvent::Progress { job, fraction } => {
                if let SessionState::Segmenting { job: current, .. } = self.state {
                    if job == current {
                        tracing::debug!("Segmentation job {job}: {}%", percent(fraction));
                        self.state = SessionState::Segmenting {
                            job,
                            progress: fraction,
                        };
                    }
                }
                None
            }
            SegmentationEvent::Finished { job, .. } if job != self.current_job => {
                tracing::debug!("Ignoring result of superseded job {job}");
                None
            }
            SegmentationEvent::Finished { job, result } => {
                let result = result.and_then(|cutout| self.accept_cutout(cutout));
                match result {
                    Ok(()) => {
                        tracing::info!("Segmentation job {job} finished");
                        self.transition(SessionState::Ready);
                        self.notify(
                            NoticeLevel::Success,
                            "Background removed successfully!".to_string(),
                        );
                        Some(Ok(()))
                    }
                    Err(e) => {
                        tracing::warn!("Segmentation job {job} failed: {e}");
                        // A retry that fails leaves the earlier cutout usable.
                        let next = if self.cutout.is_some() {
                            SessionState::Ready
                        } else {
                            SessionState::Idle
                        };
                        self.transition(next);
                        self.notify(
                            NoticeLevel::Error,
                            format!("Failed to process image ({e}). Please try again."),
                        );
                        Some(Err(e))
                    }
                }
            }
        }
    }

    fn accept_cutout(&mut self, cutout: Cutout) -> Result<()> {
        if let Some(source) = &self.source {
            let (w, h) = source.dimensions();
            if cutout.dimensions() != (w, h) {
                return Err(Error::DimensionMismatch {
                    expected_width: w,
                    expected_height: h,
                    width: cutout.dimensions().0,
                    height: cutout.dimensions().1,
                });
            }
        }
        self.cutout = Some(cutout);
        self.composite = None;
        Ok(())
    }

    /// Choose a new background. The cutout is reused as is.
    pub fn set_background(&mut self, spec: BackgroundSpec) {
        if spec != self.background {
            tracing::debug!("Background set to {spec}");
            self.background = spec;
            self.composite = None;
        }
    }

    /// Render the cutout over the selected background.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] without a cutout, or the compositor's
    /// error (typically [`Error::BackgroundDecode`]). On failure the cutout
    /// stays available through [`Session::preview`].
    pub fn composite(&mut self) -> Result<&CompositeResult> {
        if self.state != SessionState::Ready {
            return Err(self.invalid("composite"));
        }
        let Some(cutout) = self.cutout.as_ref() else {
            return Err(self.invalid("composite"));
        };

        self.state = SessionState::Compositing;
        let rendered = self.compositor.composite(cutout, &self.background);
        self.state = SessionState::Ready;

        match rendered {
            Ok(result) => Ok(self.composite.insert(result)),
            Err(e) => {
                tracing::warn!("Compositing over {} failed: {e}", self.background);
                self.composite = None;
                self.notify(NoticeLevel::Error, format!("Could not apply background: {e}"));
                Err(e)
            }
        }
    }

    /// Encode the current result as PNG, compositing first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`] when there is nothing to export or encoding
    /// fails, or the compositing error if the background cannot be rendered.
    pub fn export(&mut self) -> Result<Vec<u8>> {
        if self.cutout.is_none() {
            let e = Error::Export("no image to download".to_string());
            self.notify(NoticeLevel::Error, format!("Failed to download image: {e}"));
            return Err(e);
        }
        if self.composite.is_none() {
            self.composite()?;
        }
        let Some(result) = self.composite.as_ref() else {
            return Err(Error::Export("no image to download".to_string()));
        };

        match export::encode_png(result.pixels()) {
            Ok(bytes) => {
                tracing::info!("Exported {} bytes", bytes.len());
                self.notify(NoticeLevel::Success, "Image downloaded successfully!".to_string());
                Ok(bytes)
            }
            Err(e) => {
                self.notify(NoticeLevel::Error, format!("Failed to download image: {e}"));
                Err(e)
            }
        }
    }

    /// Export into `dir` under [`RESULT_FILE_NAME`].
    ///
    /// # Errors
    ///
    /// As [`Session::export`], plus [`Error::Export`] if the file cannot be written.
    pub fn export_to(&mut self, dir: &Path) -> Result<PathBuf> {
        let bytes = self.export()?;
        let path = dir.join(RESULT_FILE_NAME);
        if let Err(e) = std::fs::write(&path, bytes) {
            let e = Error::Export(format!("{}: {e}", path.display()));
            self.notify(NoticeLevel::Error, format!("Failed to download image: {e}"));
            return Err(e);
        }
        Ok(path)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.name() != next.name() {
            tracing::debug!("Session {} -> {}", self.state.name(), next.name());
        }
        self.state = next;
    }

    fn notify(&mut self, level: NoticeLevel, message: String) {
        self.notices.push(Notice { level, message });
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidState {
            action,
            state: self.state.name(),
        }
    }
}
