pub mod executor;
mod namespace;
pub mod suffix_cleanup;

pub use executor::{
    destination_name, episode_prefix, execute, execute_steps, track_prefix, PlanStep,
    RenameOptions,
};
pub use suffix_cleanup::cleanup_suffixes;

use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenameSummary {
    pub renamed: usize,
    pub already_correct: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RenameSummary {
    pub fn line(&self, dry_run: bool) -> String {
        let renamed = if dry_run { "would rename" } else { "renamed" };
        format!(
            "Summary: {} {}, {} already correct, {} skipped, {} failed",
            self.renamed, renamed, self.already_correct, self.skipped, self.failed
        )
    }
}

/// Operator-facing log lines of one batch, in processing order.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RenameReport {
    pub log: Vec<String>,
    pub summary: RenameSummary,
}

impl RenameReport {
    pub fn skip(&mut self, line: String) {
        self.log.push(line);
        self.summary.skipped += 1;
    }

    pub fn fail(&mut self, line: String) {
        self.log.push(line);
        self.summary.failed += 1;
    }
}

/// Live: `[RENAME] 'a' -> 'b'`. Dry run: `[DRY-RUN] would rename 'a' -> 'b'`.
pub(crate) fn mutation_line(dry_run: bool, tag: &str, verb: &str, detail: &str) -> String {
    if dry_run {
        format!("[DRY-RUN] would {} {}", verb, detail)
    } else {
        format!("[{}] {}", tag, detail)
    }
}
