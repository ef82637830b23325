// everest-control-core/src/runtime/steps.rs
// ============================================================================
// Module: Step Progress
// Description: Progress reporting for ordered provisioning steps.
// Purpose: Tell an operator which namespace step is running and how it ended.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Reporters observe steps; they never influence them. Write failures on a
//! text reporter are ignored.

use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::runtime::error::ControlPlaneError;

/// Observer of provisioning steps.
pub trait ProgressReporter: Send + Sync {
    /// A step is about to run.
    fn step_started(&self, description: &str);

    /// A step completed.
    fn step_succeeded(&self, description: &str);

    /// A step failed; no further steps will run.
    fn step_failed(&self, description: &str, error: &ControlPlaneError);
}

/// Reporter that discards progress.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn step_started(&self, _description: &str) {}

    fn step_succeeded(&self, _description: &str) {}

    fn step_failed(&self, _description: &str, _error: &ControlPlaneError) {}
}

/// Reporter writing one line per transition.
pub struct TextProgress<W> {
    /// Output writer.
    out: Mutex<W>,
    /// Use status symbols instead of plain labels.
    pretty: bool,
}

impl<W: Write + Send> TextProgress<W> {
    /// Creates a text reporter.
    pub const fn new(out: W, pretty: bool) -> Self {
        Self {
            out: Mutex::new(out),
            pretty,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes one line.
    fn line(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{text}");
        }
    }
}

impl<W: Write + Send> ProgressReporter for TextProgress<W> {
    fn step_started(&self, description: &str) {
        if self.pretty {
            self.line(&format!("... {description}"));
        } else {
            self.line(description);
        }
    }

    fn step_succeeded(&self, description: &str) {
        if self.pretty {
            self.line(&format!("\u{2713} {description}"));
        } else {
            self.line(&format!("{description}: ok"));
        }
    }

    fn step_failed(&self, description: &str, error: &ControlPlaneError) {
        if self.pretty {
            self.line(&format!("\u{2717} {description}: {error}"));
        } else {
            self.line(&format!("{description}: failed: {error}"));
        }
    }
}
