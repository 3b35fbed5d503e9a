#[cfg(target_os = "windows")]
pub mod windows;

use std::io;
use std::path::Path;

/// Whether the platform's default filesystems compare names case-insensitively.
pub fn case_insensitive_fs() -> bool {
    cfg!(any(target_os = "windows", target_os = "macos"))
}

/// Compare two paths the way the filesystem would.
pub fn paths_equal(a: &Path, b: &Path, case_insensitive: bool) -> bool {
    if case_insensitive {
        a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
    } else {
        a == b
    }
}

/// Flush a directory's metadata so other clients (SMB/NFS mounts) see renames
/// promptly. Best-effort: returns whether the flush went through.
pub fn sync_directory(dir: &Path) -> bool {
    match sync_directory_impl(dir) {
        Ok(()) => true,
        Err(err) => {
            tracing::trace!("Directory flush of {} skipped: {}", dir.display(), err);
            false
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn sync_directory_impl(dir: &Path) -> io::Result<()> {
    std::fs::File::open(dir)?.sync_all()
}

#[cfg(target_os = "windows")]
fn sync_directory_impl(dir: &Path) -> io::Result<()> {
    windows::sync_directory(dir)
}
