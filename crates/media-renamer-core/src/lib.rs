pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod inventory;
pub mod matcher;
pub mod metadata;
pub mod normalize;
pub mod platform;
pub mod progress;
pub mod rename;
pub mod tags;

pub use config::{AppConfig, MediaKind};
pub use engine::{EpisodeRequest, MusicRequest, RenameEngine, RunOutcome};
pub use error::Error;
pub use inventory::{DirectoryWatcher, InventoryCache, MusicFilter, TvFilter};
pub use progress::{ProgressReporter, SilentReporter};
pub use rename::RenameSummary;
