pub mod tmdb;

pub use tmdb::TmdbClient;

use crate::error::Error;
use crate::matcher::MediaRecord;
use crate::normalize::Normalizer;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// One episode as the catalog lists it. `name` may be missing or blank for
/// seasons that are not translated yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EpisodeInfo {
    pub episode_number: u32,
    #[serde(default)]
    pub name: Option<String>,
}

impl EpisodeInfo {
    fn title(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Episode catalog lookup.
pub trait MetadataSource: Send + Sync {
    /// Id of the first series matching `title`, `None` when nothing matched.
    fn search_series(&self, title: &str, language: &str) -> Result<Option<u64>, Error>;

    fn season_episodes(
        &self,
        series_id: u64,
        season: u32,
        language: &str,
    ) -> Result<Vec<EpisodeInfo>, Error>;
}

/// Resolve `series` and fetch one season as match records.
///
/// Blank titles are filled from a second fetch in `fallback_language`, by
/// episode number, and finally with `Episode <n>`.
pub fn fetch_season_records(
    source: &dyn MetadataSource,
    series: &str,
    season: u32,
    language: &str,
    fallback_language: &str,
    normalizer: &Normalizer,
) -> Result<Vec<MediaRecord>, Error> {
    let series_id = source
        .search_series(series, language)
        .map_err(|err| unavailable(err, || format!("search for '{}' failed", series)))?
        .ok_or_else(|| Error::MetadataUnavailable(format!("series '{}' not found", series)))?;

    let episodes = source
        .season_episodes(series_id, season, language)
        .map_err(|err| unavailable(err, || format!("season {} of '{}' not found", season, series)))?;
    info!(
        "Catalog lists {} episodes for '{}' season {}",
        episodes.len(),
        series,
        season
    );

    let fallback = if episodes.iter().any(|episode| episode.title().is_none()) {
        fallback_titles(source, series_id, season, fallback_language)
    } else {
        HashMap::new()
    };

    Ok(episodes
        .iter()
        .map(|episode| {
            let title = episode
                .title()
                .map(str::to_string)
                .or_else(|| fallback.get(&episode.episode_number).cloned())
                .unwrap_or_else(|| format!("Episode {}", episode.episode_number));
            MediaRecord::new(episode.episode_number, &title, normalizer)
        })
        .collect())
}

fn unavailable<F: FnOnce() -> String>(err: Error, context: F) -> Error {
    match err {
        Error::MetadataUnavailable(_) => err,
        other => Error::MetadataUnavailable(format!("{}: {}", context(), other)),
    }
}

fn fallback_titles(
    source: &dyn MetadataSource,
    series_id: u64,
    season: u32,
    language: &str,
) -> HashMap<u32, String> {
    match source.season_episodes(series_id, season, language) {
        Ok(episodes) => episodes
            .iter()
            .filter_map(|episode| {
                episode
                    .title()
                    .map(|title| (episode.episode_number, title.to_string()))
            })
            .collect(),
        Err(err) => {
            warn!("Fallback titles in '{}' unavailable: {}", language, err);
            HashMap::new()
        }
    }
}
