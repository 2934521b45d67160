//! Per-target logging with columnar alignment across concurrent pipelines.
//!
//! The alignment width depends on the full target list, so the coordinator
//! computes it once up front and hands it read-only to every pipeline's
//! logger. Each log line is emitted as a single `log` macro call; the
//! backend serializes writers, so concurrent pipelines never tear a line.

use crate::models::Target;

/// Maximum display width of any target identifier in the run.
pub fn alignment_width(targets: &[Target]) -> usize {
    targets
        .iter()
        .map(|t| t.host.chars().count())
        .max()
        .unwrap_or(0)
}

/// Logger bound to one target, padding the target column to the width
/// shared by every pipeline in the run.
#[derive(Clone, Debug)]
pub struct TargetLogger {
    host: String,
    width: usize,
}

impl TargetLogger {
    pub fn new(host: &str, width: usize) -> Self {
        Self {
            host: host.to_string(),
            width: width.max(host.chars().count()),
        }
    }

    /// The padded target column prefixed to every line.
    pub fn prefix(&self) -> String {
        format!("[{:<width$}]", self.host, width = self.width)
    }

    pub fn debug(&self, message: &str) {
        log::debug!("{} {}", self.prefix(), message);
    }

    pub fn info(&self, message: &str) {
        log::info!("{} {}", self.prefix(), message);
    }

    pub fn warn(&self, message: &str) {
        log::warn!("{} {}", self.prefix(), message);
    }

    pub fn error(&self, message: &str) {
        log::error!("{} {}", self.prefix(), message);
    }
}
