//! Undo ` (n)` disambiguators that are no longer needed.

use super::mutation_line;
use super::namespace::Namespace;
use crate::error::Error;
use crate::hasher;
use crate::platform;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

lazy_static! {
    static ref NUMBERED_SUFFIX: Regex =
        Regex::new(r"^(?P<base>.+) \((?P<num>\d+)\)(?P<ext>\.[^.]+)$").unwrap();
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupSummary {
    pub restored: usize,
    pub duplicates_removed: usize,
    pub kept: usize,
    pub failed: usize,
}

/// For every `<base> (<n>)<ext>` in `directory` (sorted by name):
/// rename it to `<base><ext>` when that name is free, remove it when
/// `<base><ext>` holds identical content, otherwise leave it.
pub fn cleanup_suffixes(
    directory: &Path,
    dry_run: bool,
) -> Result<(Vec<String>, CleanupSummary), Error> {
    if !directory.is_dir() {
        return Err(Error::DirectoryNotFound(directory.to_path_buf()));
    }

    let mut names: Vec<String> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let mut log = Vec::new();
    let mut summary = CleanupSummary::default();
    let mut namespace = Namespace::new(platform::case_insensitive_fs());
    // Dry runs only: planned destination -> file actually holding the content.
    let mut moved: HashMap<PathBuf, PathBuf> = HashMap::new();

    for name in names {
        let Some(caps) = NUMBERED_SUFFIX.captures(&name) else {
            continue;
        };
        let candidate_name = format!("{}{}", &caps["base"], &caps["ext"]);
        let suffixed = directory.join(&name);
        let candidate = directory.join(&candidate_name);

        if !namespace.is_occupied(&candidate) {
            let line = mutation_line(
                dry_run,
                "RESTORE",
                "restore",
                &format!("'{}' -> '{}'", name, candidate_name),
            );
            if !dry_run {
                if let Err(err) = fs::rename(&suffixed, &candidate) {
                    warn!("Failed to restore '{}': {}", suffixed.display(), err);
                    log.push(format!("[ERROR] restoring '{}' failed: {}", name, err));
                    summary.failed += 1;
                    continue;
                }
            } else {
                moved.insert(candidate.clone(), suffixed.clone());
            }
            log.push(line);
            namespace.record_move(&suffixed, &candidate);
            summary.restored += 1;
            continue;
        }

        let occupant = moved.get(&candidate).unwrap_or(&candidate);
        match hasher::files_identical(&suffixed, occupant) {
            Ok(true) => {
                let line = mutation_line(
                    dry_run,
                    "REMOVE",
                    "remove",
                    &format!("duplicate '{}' of '{}'", name, candidate_name),
                );
                if !dry_run {
                    if let Err(err) = fs::remove_file(&suffixed) {
                        warn!("Failed to remove '{}': {}", suffixed.display(), err);
                        log.push(format!("[ERROR] removing '{}' failed: {}", name, err));
                        summary.failed += 1;
                        continue;
                    }
                }
                log.push(line);
                namespace.record_removal(&suffixed);
                summary.duplicates_removed += 1;
            }
            Ok(false) => {
                log.push(format!("[ KEEP ] '{}' differs from '{}'", name, candidate_name));
                summary.kept += 1;
            }
            Err(err) => {
                warn!("Failed to compare '{}': {}", suffixed.display(), err);
                log.push(format!("[ERROR] comparing '{}' failed: {}", name, err));
                summary.failed += 1;
            }
        }
    }

    if !dry_run {
        platform::sync_directory(directory);
    }

    log.push(format!(
        "Cleanup: {} restored, {} duplicates removed, {} kept, {} failed",
        summary.restored, summary.duplicates_removed, summary.kept, summary.failed
    ));
    Ok((log, summary))
}
