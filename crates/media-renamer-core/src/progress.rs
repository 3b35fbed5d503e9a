use crate::rename::RenameSummary;

/// Trait for reporting inventory scan and rename progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _directories: usize, _duration_secs: f64) {}
    fn on_rename_start(&self, _total: usize) {}
    fn on_rename_progress(&self, _processed: usize, _total: usize) {}
    fn on_rename_complete(&self, _summary: &RenameSummary, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
