pub mod cache;
pub mod watcher;

pub use cache::{InventoryCache, InventoryKey};
pub use watcher::DirectoryWatcher;

use crate::config::{recognized_extension, ExtensionSet};
use crate::error::Error;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use walkdir::{DirEntry, WalkDir};

/// Relative, `/`-separated paths of the directories under `root` whose
/// subtree holds at least one file with a recognized extension. Sorted.
///
/// Directories whose name or path contains an exclude marker are pruned
/// before descending. `root` itself is left out unless no subdirectory
/// qualifies and root holds media files directly, in which case the result
/// is `["."]`.
pub fn list_qualifying_directories(
    root: &Path,
    extensions: &ExtensionSet,
    exclude_markers: &[String],
) -> Result<Vec<String>, Error> {
    if !root.is_dir() {
        return Err(Error::DirectoryNotFound(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(root, entry, exclude_markers));

    collect_qualifying(root, walker, extensions)
}

fn collect_qualifying<I>(root: &Path, entries: I, extensions: &ExtensionSet) -> Result<Vec<String>, Error>
where
    I: IntoIterator<Item = walkdir::Result<DirEntry>>,
{
    let mut qualifying: BTreeSet<String> = BTreeSet::new();
    let mut root_has_media = false;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            // Below the root, a directory can vanish or be unreadable between
            // listing and descending; the rest of the tree is still valid.
            Err(err) if err.depth() > 0 => {
                let denied = err
                    .io_error()
                    .map(|e| e.kind() == io::ErrorKind::PermissionDenied)
                    .unwrap_or(false);
                if denied {
                    error!("Access denied while scanning {}: {}", root.display(), err);
                } else {
                    warn!("Skipping entry while scanning {}: {}", root.display(), err);
                }
                continue;
            }
            Err(err) => {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("Error scanning {}: {}", root.display(), err),
                )));
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if recognized_extension(&name, extensions).is_none() {
            continue;
        }

        let relative_parent = entry
            .path()
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        if relative_parent.as_os_str().is_empty() {
            root_has_media = true;
        }
        for ancestor in relative_parent.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            if !qualifying.insert(to_forward_slashes(ancestor)) {
                // Its ancestors are already in.
                break;
            }
        }
    }

    if qualifying.is_empty() && root_has_media {
        qualifying.insert(".".to_string());
    }

    debug!(
        "{} qualifying directories under {}",
        qualifying.len(),
        root.display()
    );
    Ok(qualifying.into_iter().collect())
}

fn is_excluded(root: &Path, entry: &DirEntry, exclude_markers: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    let relative = entry
        .path()
        .strip_prefix(root)
        .map(to_forward_slashes)
        .unwrap_or_default();
    exclude_markers
        .iter()
        .any(|marker| name.contains(marker.as_str()) || relative.contains(marker.as_str()))
}

fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Filters for TV show directories (`<Series>/Season NN`).
#[derive(Debug, Default, Clone)]
pub struct TvFilter {
    pub series: Option<String>,
    pub season: Option<u32>,
}

impl TvFilter {
    pub fn apply(&self, directories: &[String]) -> Vec<String> {
        let series = self.series.as_deref().map(str::to_lowercase);
        let season_suffix = self.season.map(|season| format!("/season {:02}", season));

        directories
            .iter()
            .filter(|dir| {
                let lowered = dir.to_lowercase();
                series.as_deref().map_or(true, |s| lowered.contains(s))
                    && season_suffix
                        .as_deref()
                        .map_or(true, |suffix| lowered.ends_with(suffix))
            })
            .cloned()
            .collect()
    }
}

/// Filters for music directories (`<Artist>/<Album>`).
#[derive(Debug, Default, Clone)]
pub struct MusicFilter {
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl MusicFilter {
    pub fn apply(&self, directories: &[String]) -> Vec<String> {
        let artist = self.artist.as_deref().map(str::to_lowercase);
        let album = self.album.as_deref().map(str::to_lowercase);

        directories
            .iter()
            .filter(|dir| {
                let lowered = dir.to_lowercase();
                let artist_ok = artist.as_deref().map_or(true, |a| lowered.contains(a));
                let album_ok = album.as_deref().map_or(true, |a| {
                    lowered
                        .split_once('/')
                        .map_or(false, |(_, rest)| rest.contains(a))
                });
                artist_ok && album_ok
            })
            .cloned()
            .collect()
    }
}

/// Join a caller-supplied relative directory onto `root`, refusing anything
/// that could leave it.
pub fn resolve_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let escapes = relative.components().any(|component| {
        !matches!(
            component,
            std::path::Component::Normal(_) | std::path::Component::CurDir
        )
    });
    if escapes {
        None
    } else {
        Some(root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tv_filter() {
        let all = dirs(&[
            "Dark/Season 01",
            "Dark/Season 02",
            "Dark Matter/Season 01",
            "Lost/Season 01",
            "Lost/Specials",
        ]);
        let filter = TvFilter {
            series: Some("dark".into()),
            season: Some(1),
        };
        assert_eq!(filter.apply(&all), dirs(&["Dark/Season 01", "Dark Matter/Season 01"]));

        let filter = TvFilter {
            series: None,
            season: Some(2),
        };
        assert_eq!(filter.apply(&all), dirs(&["Dark/Season 02"]));
        assert_eq!(TvFilter::default().apply(&all), all);
    }

    #[test]
    fn test_music_filter_album_ignores_artist_component() {
        let all = dirs(&["Queen/Greatest Hits", "Greatest/Live", "Queen"]);
        let filter = MusicFilter {
            artist: None,
            album: Some("greatest".into()),
        };
        assert_eq!(filter.apply(&all), dirs(&["Queen/Greatest Hits"]));

        let filter = MusicFilter {
            artist: Some("QUEEN".into()),
            album: None,
        };
        assert_eq!(filter.apply(&all), dirs(&["Queen/Greatest Hits", "Queen"]));
    }

    #[test]
    fn test_directory_vanishing_mid_walk_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for season in ["Season 01", "Season 02"] {
            let dir = root.join("Show").join(season);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("e.mkv"), b"x").unwrap();
        }
        let extensions = crate::config::MediaKindConfig::video().extension_set();

        // Sorted walks list a directory's children when it is entered, so
        // removing "Season 02" once "Show" is yielded makes descending fail.
        let vanishing = root.join("Show/Season 02");
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .inspect(|entry| {
                if matches!(entry, Ok(e) if e.file_name() == "Show") {
                    std::fs::remove_dir_all(&vanishing).unwrap();
                }
            });

        let directories = collect_qualifying(root, walker, &extensions).unwrap();
        assert_eq!(directories, dirs(&["Show", "Show/Season 01"]));
    }

    #[test]
    fn test_resolve_relative() {
        let root = Path::new("/media/TV Shows");
        assert_eq!(
            resolve_relative(root, "Dark/Season 01"),
            Some(root.join("Dark/Season 01"))
        );
        assert_eq!(resolve_relative(root, "../Music"), None);
        assert_eq!(resolve_relative(root, "/etc"), None);
    }
}
