use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Names in one directory as they stand mid-batch: what is on disk, minus
/// what this batch moved away, plus what it moved in. A dry run never touches
/// the disk, so without this it would predict different disambiguators than
/// the live run.
#[derive(Debug)]
pub(crate) struct Namespace {
    case_insensitive: bool,
    claimed: HashSet<String>,
    vacated: HashSet<String>,
}

impl Namespace {
    pub(crate) fn new(case_insensitive: bool) -> Self {
        Self {
            case_insensitive,
            claimed: HashSet::new(),
            vacated: HashSet::new(),
        }
    }

    fn key(&self, path: &Path) -> String {
        let key = path.to_string_lossy();
        if self.case_insensitive {
            key.to_lowercase()
        } else {
            key.into_owned()
        }
    }

    pub(crate) fn is_occupied(&self, path: &Path) -> bool {
        let key = self.key(path);
        self.claimed.contains(&key) || (path.exists() && !self.vacated.contains(&key))
    }

    /// `destination` if free, else the first free `<stem> (n)<ext>` for n = 1, 2, ...
    pub(crate) fn free_destination(&self, destination: &Path) -> PathBuf {
        if !self.is_occupied(destination) {
            return destination.to_path_buf();
        }

        let parent = destination.parent().unwrap_or_else(|| Path::new(""));
        let file_name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, ext) = split_extension(&file_name);

        (1u32..)
            .map(|n| parent.join(format!("{} ({}){}", stem, n, ext)))
            .find(|candidate| !self.is_occupied(candidate))
            .unwrap_or_else(|| destination.to_path_buf())
    }

    pub(crate) fn record_move(&mut self, from: &Path, to: &Path) {
        let from = self.key(from);
        let to = self.key(to);
        self.claimed.remove(&from);
        self.vacated.remove(&to);
        self.vacated.insert(from);
        self.claimed.insert(to);
    }

    pub(crate) fn record_removal(&mut self, path: &Path) {
        let key = self.key(path);
        self.claimed.remove(&key);
        self.vacated.insert(key);
    }
}

/// Split `name` into stem and extension (with dot). Leading-dot names and
/// names without a dot have an empty extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    }
}
