use crate::config::{recognized_extension, AppConfig, ExtensionSet, MediaKind};
use crate::error::Error;
use crate::inventory::{resolve_relative, InventoryCache, MusicFilter, TvFilter};
use crate::matcher::{self, Assignment, CandidateFile};
use crate::metadata::{self, EpisodeInfo, MetadataSource, TmdbClient};
use crate::normalize::Normalizer;
use crate::progress::{ProgressReporter, SilentReporter};
use crate::rename::{self, PlanStep, RenameOptions};
use crate::tags::{self, LoftyTagReader, TagReader};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Result of one request, ready to hand to a caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunOutcome {
    pub log: Vec<String>,
    pub success: bool,
    pub error: Option<String>,
    /// Fresh listing of the media root the request worked under.
    pub directories: Vec<String>,
}

impl RunOutcome {
    fn completed(log: Vec<String>, directories: Vec<String>) -> Self {
        Self {
            log,
            success: true,
            error: None,
            directories,
        }
    }

    fn failed(log: Vec<String>, err: &Error, directories: Vec<String>) -> Self {
        Self {
            log,
            success: false,
            error: Some(err.to_string()),
            directories,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpisodeRequest {
    pub series: String,
    pub season: u32,
    /// Relative to the TV root.
    pub directory: String,
    /// Defaults to the configured language.
    pub language: Option<String>,
    pub dry_run: bool,
    pub fill_unmatched: bool,
    /// Defaults to the configured threshold.
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MusicRequest {
    /// Relative to the music root.
    pub directory: String,
    pub dry_run: bool,
}

/// Catalog lookups fail with this when no usable client could be built.
struct UnusableSource(String);

impl MetadataSource for UnusableSource {
    fn search_series(&self, _title: &str, _language: &str) -> Result<Option<u64>, Error> {
        Err(Error::MetadataUnavailable(self.0.clone()))
    }

    fn season_episodes(&self, _id: u64, _season: u32, _language: &str) -> Result<Vec<EpisodeInfo>, Error> {
        Err(Error::MetadataUnavailable(self.0.clone()))
    }
}

/// Entry point for everything a front end can ask for: directory listings,
/// episode and track renames, suffix cleanup and cache refresh.
pub struct RenameEngine {
    config: AppConfig,
    cache: Arc<InventoryCache>,
    metadata: Box<dyn MetadataSource>,
    tags: Box<dyn TagReader>,
}

impl RenameEngine {
    pub fn new(config: AppConfig) -> Self {
        let metadata: Box<dyn MetadataSource> = match TmdbClient::new(
            config.tmdb_api_key.as_deref(),
            Duration::from_secs(config.request_timeout_secs),
        ) {
            Ok(client) => Box::new(client),
            Err(err) => {
                warn!("{}", err);
                Box::new(UnusableSource("TMDB API key is not configured".to_string()))
            }
        };

        Self {
            config,
            cache: Arc::new(InventoryCache::new()),
            metadata,
            tags: Box::new(LoftyTagReader),
        }
    }

    pub fn with_metadata_source(mut self, source: Box<dyn MetadataSource>) -> Self {
        self.metadata = source;
        self
    }

    pub fn with_tag_reader(mut self, reader: Box<dyn TagReader>) -> Self {
        self.tags = reader;
        self
    }

    pub fn with_cache(mut self, cache: Arc<InventoryCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shared with the directory watcher.
    pub fn cache(&self) -> Arc<InventoryCache> {
        Arc::clone(&self.cache)
    }

    pub fn list_tv_directories(
        &self,
        filter: &TvFilter,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<String>, Error> {
        let all = self.inventory(MediaKind::Tv, reporter)?;
        Ok(filter.apply(&all))
    }

    pub fn list_music_directories(
        &self,
        filter: &MusicFilter,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<String>, Error> {
        let all = self.inventory(MediaKind::Music, reporter)?;
        Ok(filter.apply(&all))
    }

    /// Drop every memoized listing.
    pub fn refresh(&self) {
        self.cache.invalidate();
    }

    pub fn rename_episodes(&self, request: &EpisodeRequest, reporter: &dyn ProgressReporter) -> RunOutcome {
        let mut log = Vec::new();
        let result = self.try_rename_episodes(request, reporter, &mut log);
        self.finish(MediaKind::Tv, log, result)
    }

    pub fn rename_music(&self, request: &MusicRequest, reporter: &dyn ProgressReporter) -> RunOutcome {
        let mut log = Vec::new();
        let result = self.try_rename_music(request, reporter, &mut log);
        self.finish(MediaKind::Music, log, result)
    }

    /// Strip ` (n)` disambiguators in `directory` (relative to the `kind`
    /// root) that are no longer needed.
    pub fn cleanup_suffixes(&self, kind: MediaKind, directory: &str, dry_run: bool) -> RunOutcome {
        let mut log = Vec::new();
        let result = self.resolve(kind, directory).and_then(|path| {
            let (lines, summary) = rename::cleanup_suffixes(&path, dry_run)?;
            info!(
                "Suffix cleanup in {}: {} restored, {} duplicates removed",
                path.display(),
                summary.restored,
                summary.duplicates_removed
            );
            log.extend(lines);
            Ok(())
        });
        self.finish(kind, log, result)
    }

    fn try_rename_episodes(
        &self,
        request: &EpisodeRequest,
        reporter: &dyn ProgressReporter,
        log: &mut Vec<String>,
    ) -> Result<(), Error> {
        let directory = self.resolve(MediaKind::Tv, &request.directory)?;
        let video = &self.config.video;
        let normalizer = Normalizer::new(video.extension_set());
        let files = media_files(&directory, normalizer.extensions())?;

        if files.is_empty() {
            log.push(format!("No video files in '{}'", request.directory));
            return Ok(());
        }

        let language = request.language.as_deref().unwrap_or(&self.config.language);
        let records = metadata::fetch_season_records(
            self.metadata.as_ref(),
            &request.series,
            request.season,
            language,
            &self.config.fallback_language,
            &normalizer,
        )?;

        let threshold = request.threshold.unwrap_or(self.config.threshold);
        log.push(format!(
            "Series '{}' season {}: {} files, {} catalog entries (threshold {:.2}{})",
            request.series,
            request.season,
            files.len(),
            records.len(),
            threshold,
            if request.fill_unmatched { ", sequential fill" } else { "" }
        ));

        let candidates: Vec<CandidateFile> = files
            .iter()
            .map(|name| CandidateFile::new(name, &normalizer))
            .collect();
        let plan = matcher::assign(&candidates, &records, threshold, request.fill_unmatched);

        let options = RenameOptions::new(request.dry_run, video.sidecar_set());
        let report = rename::execute(
            &directory,
            &plan,
            rename::episode_prefix(request.season),
            &options,
            reporter,
        )?;
        log.extend(report.log);
        Ok(())
    }

    fn try_rename_music(
        &self,
        request: &MusicRequest,
        reporter: &dyn ProgressReporter,
        log: &mut Vec<String>,
    ) -> Result<(), Error> {
        let directory = self.resolve(MediaKind::Music, &request.directory)?;
        let music = &self.config.music;
        let normalizer = Normalizer::new(music.extension_set());
        let files = media_files(&directory, normalizer.extensions())?;

        if files.is_empty() {
            log.push(format!("No audio files in '{}'", request.directory));
            return Ok(());
        }
        log.push(format!("Album '{}': {} files", request.directory, files.len()));

        let read: Vec<(&String, Result<tags::TagMap, Error>)> = files
            .par_iter()
            .map(|name| (name, self.tags.read_tags(&directory.join(name))))
            .collect();

        let steps: Vec<PlanStep> = read
            .into_iter()
            .map(|(name, tag_map)| match tag_map {
                Err(err) => {
                    error!("Reading tags of {} failed: {}", name, err);
                    PlanStep::Fail(format!("[ERROR] '{}' tags unreadable: {}", name, err))
                }
                Ok(tag_map) => match tags::track_record(&tag_map, &normalizer) {
                    Ok(record) => PlanStep::Rename(Assignment::matched(
                        CandidateFile::new(name, &normalizer),
                        record,
                        1.0,
                    )),
                    Err(skip) => PlanStep::Skip(format!("[ SKIP ] '{}' {}", name, skip)),
                },
            })
            .collect();

        let options = RenameOptions::new(request.dry_run, music.sidecar_set());
        let report = rename::execute_steps(
            &directory,
            &steps,
            rename::track_prefix,
            &options,
            reporter,
        )?;
        log.extend(report.log);
        Ok(())
    }

    fn resolve(&self, kind: MediaKind, relative: &str) -> Result<PathBuf, Error> {
        let root = self.config.root(kind);
        match resolve_relative(&root, relative) {
            Some(path) if path.is_dir() => Ok(path),
            Some(path) => Err(Error::DirectoryNotFound(path)),
            None => Err(Error::DirectoryNotFound(PathBuf::from(relative))),
        }
    }

    fn inventory(&self, kind: MediaKind, reporter: &dyn ProgressReporter) -> Result<Arc<Vec<String>>, Error> {
        let media = self.config.media(kind);
        self.cache.get(
            &self.config.root(kind),
            &media.extension_set(),
            &media.exclude_markers,
            reporter,
        )
    }

    fn finish(&self, kind: MediaKind, log: Vec<String>, result: Result<(), Error>) -> RunOutcome {
        let directories = match self.inventory(kind, &SilentReporter) {
            Ok(directories) => directories.as_ref().clone(),
            Err(err) => {
                warn!("Listing {:?} directories failed: {}", kind, err);
                Vec::new()
            }
        };
        match result {
            Ok(()) => RunOutcome::completed(log, directories),
            Err(err) => {
                error!("{}", err);
                RunOutcome::failed(log, &err, directories)
            }
        }
    }
}

/// Names of the files in `directory` with a recognized extension, sorted.
fn media_files(directory: &Path, extensions: &ExtensionSet) -> Result<Vec<String>, Error> {
    let mut names: Vec<String> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| recognized_extension(name, extensions).is_some())
        .collect();
    names.sort();
    Ok(names)
}
