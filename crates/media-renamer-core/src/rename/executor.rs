use super::namespace::{split_extension, Namespace};
use super::{mutation_line, RenameReport};
use crate::config::ExtensionSet;
use crate::error::Error;
use crate::matcher::{Assignment, MediaRecord};
use crate::normalize::sanitize_filename;
use crate::platform;
use crate::progress::ProgressReporter;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RenameOptions {
    pub dry_run: bool,
    pub sidecar_extensions: ExtensionSet,
    pub case_insensitive: bool,
}

impl RenameOptions {
    pub fn new(dry_run: bool, sidecar_extensions: ExtensionSet) -> Self {
        Self {
            dry_run,
            sidecar_extensions,
            case_insensitive: platform::case_insensitive_fs(),
        }
    }
}

/// Prefix for episode files: `S01E02 `.
pub fn episode_prefix(season: u32) -> impl Fn(&MediaRecord) -> String {
    move |record| format!("S{:02}E{:02} ", season, record.sequence_number)
}

/// Prefix for audio tracks: `01-02 ` (disc, track).
pub fn track_prefix(record: &MediaRecord) -> String {
    format!(
        "{:02}-{:02} ",
        record.disc_number.unwrap_or(0),
        record.sequence_number
    )
}

/// `<prefix><sanitized title><original extension>`.
pub fn destination_name(prefix: &str, record: &MediaRecord, original_name: &str) -> String {
    let (_, ext) = split_extension(original_name);
    let stem = format!("{}{}", prefix, sanitize_filename(&record.display_title));
    format!("{}{}", stem.trim(), ext)
}

/// One file of a batch. Files dropped before planning keep their place in
/// the log through `Skip` and `Fail`.
#[derive(Debug, Clone)]
pub enum PlanStep {
    Rename(Assignment),
    Skip(String),
    Fail(String),
}

enum Step<'a> {
    Rename(&'a Assignment),
    Skip(&'a str),
    Fail(&'a str),
}

impl PlanStep {
    fn as_step(&self) -> Step<'_> {
        match self {
            PlanStep::Rename(assignment) => Step::Rename(assignment),
            PlanStep::Skip(line) => Step::Skip(line),
            PlanStep::Fail(line) => Step::Fail(line),
        }
    }
}

/// Apply `plan` to `directory`, one file at a time in plan order.
///
/// Only a missing directory is fatal. A failing rename or sidecar removal is
/// logged and the batch goes on. Requires exclusive access to `directory`
/// for the duration of the call.
pub fn execute<F>(
    directory: &Path,
    plan: &[Assignment],
    prefix: F,
    options: &RenameOptions,
    reporter: &dyn ProgressReporter,
) -> Result<RenameReport, Error>
where
    F: Fn(&MediaRecord) -> String,
{
    run_batch(directory, plan.iter().map(Step::Rename), plan.len(), prefix, options, reporter)
}

/// Like [`execute`], with skip and failure lines logged in step order.
pub fn execute_steps<F>(
    directory: &Path,
    steps: &[PlanStep],
    prefix: F,
    options: &RenameOptions,
    reporter: &dyn ProgressReporter,
) -> Result<RenameReport, Error>
where
    F: Fn(&MediaRecord) -> String,
{
    run_batch(directory, steps.iter().map(PlanStep::as_step), steps.len(), prefix, options, reporter)
}

fn run_batch<'a, I, F>(
    directory: &Path,
    steps: I,
    total: usize,
    prefix: F,
    options: &RenameOptions,
    reporter: &dyn ProgressReporter,
) -> Result<RenameReport, Error>
where
    I: Iterator<Item = Step<'a>>,
    F: Fn(&MediaRecord) -> String,
{
    if !directory.is_dir() {
        return Err(Error::DirectoryNotFound(directory.to_path_buf()));
    }

    let start = Instant::now();
    let mut report = RenameReport::default();
    let mut namespace = Namespace::new(options.case_insensitive);

    reporter.on_rename_start(total);

    for (processed, step) in steps.enumerate() {
        match step {
            Step::Skip(line) => report.skip(line.to_string()),
            Step::Fail(line) => report.fail(line.to_string()),
            Step::Rename(Assignment {
                file,
                record: None,
                score,
            }) => report.skip(format!(
                "[ SKIP ] '{}' no confident match (score={:.2})",
                file.original_name, score
            )),
            Step::Rename(Assignment {
                file,
                record: Some(record),
                score,
            }) => {
                let name = destination_name(&prefix(record), record, &file.original_name);
                rename_one(
                    directory,
                    &file.original_name,
                    &name,
                    *score,
                    options,
                    &mut namespace,
                    &mut report,
                );
            }
        }
        reporter.on_rename_progress(processed + 1, total);
    }

    report.log.push(report.summary.line(options.dry_run));
    info!("{}", report.summary.line(options.dry_run));
    reporter.on_rename_complete(&report.summary, start.elapsed().as_secs_f64());

    Ok(report)
}

fn rename_one(
    directory: &Path,
    original_name: &str,
    new_name: &str,
    score: f64,
    options: &RenameOptions,
    namespace: &mut Namespace,
    report: &mut RenameReport,
) {
    let source = directory.join(original_name);
    let requested = directory.join(new_name);

    if source == requested {
        report.log.push(format!("[  OK  ] '{}' already correct", original_name));
        report.summary.already_correct += 1;
        return;
    }

    // A case-only change on a case-insensitive filesystem "collides" with the
    // source itself; rename in place instead of disambiguating.
    let destination = if platform::paths_equal(&source, &requested, options.case_insensitive) {
        requested
    } else {
        namespace.free_destination(&requested)
    };
    let destination_name = file_name(&destination);

    let line = mutation_line(
        options.dry_run,
        "RENAME",
        "rename",
        &format!("'{}' -> '{}' (match={:.2})", original_name, destination_name, score),
    );

    if !options.dry_run {
        if let Err(err) = fs::rename(&source, &destination) {
            warn!("Failed to rename '{}': {}", source.display(), err);
            report.fail(format!(
                "[ERROR] '{}' -> '{}' failed: {}",
                original_name, destination_name, err
            ));
            return;
        }
        if !platform::sync_directory(directory) {
            debug!("Directory flush skipped for {}", directory.display());
        }
    }

    debug!("{} -> {}", source.display(), destination.display());
    report.log.push(line);
    report.summary.renamed += 1;
    namespace.record_move(&source, &destination);

    remove_sidecars(directory, original_name, options, namespace, report);
}

fn remove_sidecars(
    directory: &Path,
    original_name: &str,
    options: &RenameOptions,
    namespace: &mut Namespace,
    report: &mut RenameReport,
) {
    let (stem, _) = split_extension(original_name);

    for ext in &options.sidecar_extensions {
        let sidecar_name = format!("{}{}", stem, ext);
        let sidecar = directory.join(&sidecar_name);
        if !namespace.is_occupied(&sidecar) {
            continue;
        }

        let line = mutation_line(
            options.dry_run,
            "REMOVE",
            "remove",
            &format!("sidecar '{}'", sidecar_name),
        );

        if options.dry_run {
            report.log.push(line);
            namespace.record_removal(&sidecar);
            continue;
        }

        match fs::remove_file(&sidecar) {
            Ok(()) => {
                report.log.push(line);
                namespace.record_removal(&sidecar);
            }
            Err(err) => {
                warn!("Failed to remove sidecar '{}': {}", sidecar.display(), err);
                report
                    .log
                    .push(format!("[WARN] sidecar '{}' not removed: {}", sidecar_name, err));
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaKindConfig;
    use crate::normalize::Normalizer;

    fn record(num: u32, title: &str) -> MediaRecord {
        MediaRecord::new(num, title, &Normalizer::new(MediaKindConfig::video().extension_set()))
    }

    #[test]
    fn test_destination_name() {
        let prefix = episode_prefix(1);
        let pilot = record(1, "Pilot: Part 1/2?");
        assert_eq!(
            destination_name(&prefix(&pilot), &pilot, "show.s01e01.MKV"),
            "S01E01 Pilot Part 12.MKV"
        );

        let blank = record(3, "???");
        assert_eq!(destination_name(&prefix(&blank), &blank, "x.mp4"), "S01E03.mp4");
    }

    #[test]
    fn test_track_prefix_pads_disc_and_track() {
        let track = record(7, "Song").with_disc_number(2);
        assert_eq!(track_prefix(&track), "02-07 ");
        assert_eq!(track_prefix(&record(12, "Song")), "00-12 ");
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let options = RenameOptions::new(false, ExtensionSet::new());
        let result = execute(
            Path::new("/no/such/dir"),
            &[],
            episode_prefix(1),
            &options,
            &crate::progress::SilentReporter,
        );
        assert!(matches!(result, Err(Error::DirectoryNotFound(_))));
    }
}
