use super::list_qualifying_directories;
use crate::config::ExtensionSet;
use crate::error::Error;
use crate::progress::ProgressReporter;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InventoryKey {
    pub root: PathBuf,
    pub extensions: ExtensionSet,
    pub exclude_markers: Vec<String>,
}

impl InventoryKey {
    pub fn new(root: &Path, extensions: &ExtensionSet, exclude_markers: &[String]) -> Self {
        Self {
            root: root.to_path_buf(),
            extensions: extensions.clone(),
            exclude_markers: exclude_markers.to_vec(),
        }
    }
}

/// Memoized directory inventories, shared between request handlers and the
/// filesystem watcher.
///
/// A scan that started before an invalidation never lands in the cache: each
/// insert is checked against the generation counter read before scanning.
#[derive(Debug, Default)]
pub struct InventoryCache {
    entries: DashMap<InventoryKey, Arc<Vec<String>>>,
    generation: AtomicU64,
}

impl InventoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        root: &Path,
        extensions: &ExtensionSet,
        exclude_markers: &[String],
        reporter: &dyn ProgressReporter,
    ) -> Result<Arc<Vec<String>>, Error> {
        let key = InventoryKey::new(root, extensions, exclude_markers);
        if let Some(hit) = self.entries.get(&key) {
            debug!("Inventory cache hit for {}", root.display());
            return Ok(Arc::clone(hit.value()));
        }

        let generation = self.generation.load(Ordering::Acquire);
        reporter.on_scan_start();
        let start = Instant::now();
        let directories = Arc::new(list_qualifying_directories(
            root,
            extensions,
            exclude_markers,
        )?);
        reporter.on_scan_complete(directories.len(), start.elapsed().as_secs_f64());

        // The generation is re-read under the shard lock. `invalidate` bumps
        // it before clearing, so either this check sees the bump or the clear
        // waits for the lock and removes the entry.
        let slot = self.entries.entry(key);
        if self.generation.load(Ordering::Acquire) == generation {
            let stored = slot.or_insert_with(|| Arc::clone(&directories));
            return Ok(Arc::clone(stored.value()));
        }
        drop(slot);

        debug!("Inventory of {} went stale during the scan", root.display());
        Ok(directories)
    }

    /// Drop every memoized inventory.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        info!("Directory inventories invalidated");
    }

    pub fn is_cached(&self, root: &Path, extensions: &ExtensionSet, exclude_markers: &[String]) -> bool {
        self.entries
            .contains_key(&InventoryKey::new(root, extensions, exclude_markers))
    }

    /// Number of invalidations since creation.
    pub fn invalidations(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
