use super::InventoryCache;
use crate::error::Error;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Invalidates an [`InventoryCache`] whenever a directory is created, removed
/// or moved under one of the watched roots.
///
/// File-level changes are ignored; they do not change which directories
/// qualify often enough to justify a rescan.
pub struct DirectoryWatcher {
    watcher: Option<RecommendedWatcher>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    roots: Vec<PathBuf>,
}

impl DirectoryWatcher {
    /// Watch every root that exists. Missing roots are logged and skipped.
    pub fn start(roots: &[PathBuf], cache: Arc<InventoryCache>) -> Result<Self, Error> {
        let (event_tx, event_rx) = mpsc::channel::<Event>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(err) => warn!("Watch error: {}", err),
            },
            Config::default(),
        )?;

        let mut watched = Vec::new();
        for root in roots {
            if !root.is_dir() {
                warn!("Not watching {}: directory does not exist", root.display());
                continue;
            }
            watcher.watch(root, RecursiveMode::Recursive)?;
            info!("Watching {}", root.display());
            watched.push(root.clone());
        }

        let handle = thread::Builder::new()
            .name("inventory-watcher".to_string())
            .spawn(move || process_events(event_rx, stop_rx, &cache))?;

        Ok(Self {
            watcher: Some(watcher),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            roots: watched,
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Stop watching and wait (bounded) for the event thread to exit.
    pub fn stop(&mut self) {
        // Dropping the watcher closes the event channel.
        self.watcher.take();
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            let deadline = Instant::now() + STOP_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
                debug!("Watcher thread stopped");
            } else {
                warn!("Watcher thread did not stop within {:?}", STOP_TIMEOUT);
            }
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn process_events(event_rx: Receiver<Event>, stop_rx: Receiver<()>, cache: &InventoryCache) {
    loop {
        if stop_rx.try_recv().is_ok() {
            break;
        }
        match event_rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                if changes_directories(&event) {
                    debug!("Directory change: {:?} {:?}", event.kind, event.paths);
                    cache.invalidate();
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Whether `event` creates, removes or moves a directory.
///
/// Backends differ in how precisely they report kinds, so `Any` kinds fall
/// back to looking at the path: an existing directory, or a vanished path
/// without an extension.
pub fn changes_directories(event: &Event) -> bool {
    match &event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => true,
        EventKind::Create(CreateKind::Any) | EventKind::Create(CreateKind::Other) => {
            event.paths.iter().any(|path| path.is_dir())
        }
        EventKind::Remove(RemoveKind::Any) | EventKind::Remove(RemoveKind::Other) => {
            event.paths.iter().any(|path| looks_like_directory(path))
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To | RenameMode::Both => event
                .paths
                .iter()
                .any(|path| path.is_dir() || looks_like_directory(path)),
            _ => event.paths.iter().any(|path| looks_like_directory(path)),
        },
        _ => false,
    }
}

fn looks_like_directory(path: &Path) -> bool {
    path.is_dir() || (!path.exists() && path.extension().is_none())
}
