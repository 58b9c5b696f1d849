//! Segmentation progress reporting.

use std::cell::Cell;

/// Receives progress fractions from a running segmentation.
///
/// Values are clamped to `[0, 1]` and never move backwards: a report lower
/// than the last forwarded value (or NaN) is dropped.
pub struct ProgressReporter {
    last: Cell<Option<f32>>,
    sink: Box<dyn Fn(f32) + Send>,
}

impl ProgressReporter {
    /// Forward progress to `sink`.
    pub fn new(sink: impl Fn(f32) + Send + 'static) -> Self {
        Self {
            last: Cell::new(None),
            sink: Box::new(sink),
        }
    }

    /// A reporter that discards everything.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    /// Report that `fraction` of the work is done.
    pub fn report(&self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if self.last.get().is_some_and(|last| fraction < last) {
            return;
        }
        self.last.set(Some(fraction));
        (self.sink)(fraction);
    }

    /// The last forwarded fraction, if any.
    #[must_use]
    pub fn last(&self) -> Option<f32> {
        self.last.get()
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last.get())
            .finish_non_exhaustive()
    }
}

/// Fraction as a whole percentage, rounded to nearest.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent(fraction: f32) -> u8 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn collect(reports: &[f32]) -> Vec<f32> {
        let (tx, rx) = mpsc::channel();
        let reporter = ProgressReporter::new(move |p| tx.send(p).unwrap());
        for &r in reports {
            reporter.report(r);
        }
        drop(reporter);
        rx.iter().collect()
    }

    #[test]
    fn forwards_monotonic_progress() {
        assert_eq!(collect(&[0.0, 0.25, 0.25, 1.0]), vec![0.0, 0.25, 0.25, 1.0]);
    }

    #[test]
    fn drops_regressions_and_nan() {
        assert_eq!(collect(&[0.5, 0.2, f32::NAN, 0.7]), vec![0.5, 0.7]);
    }

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(collect(&[-1.0, 3.0]), vec![0.0, 1.0]);
    }

    #[test]
    fn last_tracks_forwarded_value() {
        let reporter = ProgressReporter::silent();
        assert_eq!(reporter.last(), None);
        reporter.report(0.6);
        reporter.report(0.1);
        assert_eq!(reporter.last(), Some(0.6));
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(percent(0.0), 0);
        assert_eq!(percent(0.426), 43);
        assert_eq!(percent(2.0), 100);
    }
}
