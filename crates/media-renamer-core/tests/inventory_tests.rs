use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

use media_renamer_core::config::{ExtensionSet, MediaKindConfig};
use media_renamer_core::inventory::{list_qualifying_directories, DirectoryWatcher, InventoryCache};
use media_renamer_core::SilentReporter;

fn video() -> (ExtensionSet, Vec<String>) {
    let video = MediaKindConfig::video();
    (video.extension_set(), video.exclude_markers)
}

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"x").unwrap();
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_qualifying_directories_are_sorted_and_pruned() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(root, "Lost/Season 01/a.MKV");
    touch(root, "Dark/Season 02/b.mp4");
    touch(root, "Dark/Season 01/c.avi");
    touch(root, "Dark/Season 01/.trickplay/thumb.mkv");
    touch(root, "Dark/Extras.trickplay/only.mkv");
    touch(root, "Empty/notes.txt");
    fs::create_dir_all(root.join("Bare")).unwrap();

    let (extensions, markers) = video();
    let directories = list_qualifying_directories(root, &extensions, &markers).unwrap();
    assert_eq!(
        directories,
        strings(&["Dark", "Dark/Season 01", "Dark/Season 02", "Lost", "Lost/Season 01"])
    );
}

#[test]
fn test_media_only_at_root_lists_root() {
    let tmp = tempdir().unwrap();
    touch(tmp.path(), "movie.mkv");
    fs::create_dir_all(tmp.path().join("Subs")).unwrap();

    let (extensions, markers) = video();
    let directories = list_qualifying_directories(tmp.path(), &extensions, &markers).unwrap();
    assert_eq!(directories, strings(&["."]));
}

#[test]
fn test_missing_root_is_error() {
    let (extensions, markers) = video();
    let result = list_qualifying_directories(Path::new("/no/such/media"), &extensions, &markers);
    assert!(result.is_err());
}

#[test]
fn test_cached_listing_is_stale_until_refreshed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    touch(root, "Dark/Season 01/a.mkv");

    let (extensions, markers) = video();
    let cache = InventoryCache::new();
    let first = cache.get(root, &extensions, &markers, &SilentReporter).unwrap();
    assert_eq!(*first, strings(&["Dark", "Dark/Season 01"]));

    touch(root, "Dark/Season 02/b.mkv");
    let stale = cache.get(root, &extensions, &markers, &SilentReporter).unwrap();
    assert_eq!(*stale, *first);

    cache.invalidate();
    let fresh = cache.get(root, &extensions, &markers, &SilentReporter).unwrap();
    assert!(fresh.contains(&"Dark/Season 02".to_string()));
}

/// Wait up to 5s for the cache to count more than `seen` invalidations.
fn wait_for_invalidation(cache: &InventoryCache, seen: u64) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while cache.invalidations() <= seen {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(50));
    }
    true
}

#[test]
fn test_watcher_invalidates_on_new_directory() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    touch(&root, "Dark/Season 01/a.mkv");

    let (extensions, markers) = video();
    let cache = Arc::new(InventoryCache::new());
    let mut watcher = DirectoryWatcher::start(&[root.clone()], Arc::clone(&cache)).unwrap();

    cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
    assert!(cache.is_cached(&root, &extensions, &markers));

    touch(&root, "Dark/Season 02/b.mkv");

    let deadline = Instant::now() + Duration::from_secs(5);
    while cache.is_cached(&root, &extensions, &markers) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    assert!(cache.invalidations() >= 1, "watcher never invalidated the cache");

    let fresh = cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
    assert!(fresh.contains(&"Dark/Season 02".to_string()));

    watcher.stop();
}

#[test]
fn test_concurrent_readers_see_complete_listings() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    for season in 1..=5 {
        touch(&root, &format!("Show/Season {:02}/e.mkv", season));
    }

    let (extensions, markers) = video();
    let cache = Arc::new(InventoryCache::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let root = root.clone();
            let extensions = extensions.clone();
            let markers = markers.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    if i == 0 {
                        cache.invalidate();
                    }
                    let listing = cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
                    assert_eq!(listing.len(), 6);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_watcher_invalidates_on_removed_directory() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    touch(&root, "Dark/Season 01/a.mkv");
    touch(&root, "Dark/Season 02/b.mkv");

    let (extensions, markers) = video();
    let cache = Arc::new(InventoryCache::new());
    let mut watcher = DirectoryWatcher::start(&[root.clone()], Arc::clone(&cache)).unwrap();

    let before = cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
    assert!(before.contains(&"Dark/Season 02".to_string()));
    let seen = cache.invalidations();

    fs::remove_dir_all(root.join("Dark/Season 02")).unwrap();

    assert!(wait_for_invalidation(&cache, seen), "removal never invalidated the cache");
    let after = cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
    assert_eq!(*after, strings(&["Dark", "Dark/Season 01"]));

    watcher.stop();
}

#[test]
fn test_watcher_invalidates_on_renamed_directory() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    touch(&root, "Dark/Season 1/a.mkv");

    let (extensions, markers) = video();
    let cache = Arc::new(InventoryCache::new());
    let mut watcher = DirectoryWatcher::start(&[root.clone()], Arc::clone(&cache)).unwrap();

    cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
    let seen = cache.invalidations();

    fs::rename(root.join("Dark/Season 1"), root.join("Dark/Season 01")).unwrap();

    assert!(wait_for_invalidation(&cache, seen), "rename never invalidated the cache");
    let after = cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
    assert_eq!(*after, strings(&["Dark", "Dark/Season 01"]));

    watcher.stop();
}

#[test]
fn test_invalidation_is_not_lost_under_concurrent_readers() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    touch(&root, "Base/e.mkv");

    let (extensions, markers) = video();
    let cache = Arc::new(InventoryCache::new());
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..6)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let stop = Arc::clone(&stop);
            let root = root.clone();
            let extensions = extensions.clone();
            let markers = markers.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
                }
            })
        })
        .collect();

    let mut stale = 0;
    for i in 0..300 {
        let name = format!("D{:03}", i);
        touch(&root, &format!("{}/e.mkv", name));
        cache.invalidate();
        thread::sleep(Duration::from_millis(1));
        let listing = cache.get(&root, &extensions, &markers, &SilentReporter).unwrap();
        if !listing.contains(&name) {
            stale += 1;
        }
    }

    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(stale, 0, "listings missed a directory created before invalidation");
}
