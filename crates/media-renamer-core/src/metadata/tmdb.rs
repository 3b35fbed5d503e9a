use super::{EpisodeInfo, MetadataSource};
use crate::error::Error;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.themoviedb.org/3";
const PLACEHOLDER_KEY: &str = "YOUR_TMDB_API_KEY";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct SeasonResponse {
    #[serde(default)]
    episodes: Vec<EpisodeInfo>,
}

/// The Movie Database v3 client.
pub struct TmdbClient {
    http_client: ureq::Agent,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    /// Fails when `api_key` is missing, blank or the stock placeholder.
    pub fn new(api_key: Option<&str>, timeout: Duration) -> Result<Self, Error> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_KEY)
            .ok_or_else(|| Error::MetadataUnavailable("TMDB API key is not configured".to_string()))?;

        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();

        Ok(Self {
            http_client,
            api_key: api_key.to_string(),
            base_url: API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let request = params
            .iter()
            .fold(self.http_client.get(&url).query("api_key", &self.api_key), |request, (key, value)| {
                request.query(key, value)
            });
        let response = request.call()?;
        response
            .into_json::<T>()
            .map_err(|err| Error::Http(format!("invalid response from {}: {}", url, err)))
    }
}

impl MetadataSource for TmdbClient {
    fn search_series(&self, title: &str, language: &str) -> Result<Option<u64>, Error> {
        let response: SearchResponse =
            self.get_json("/search/tv", &[("query", title), ("language", language)])?;
        Ok(response.results.first().map(|result| result.id))
    }

    fn season_episodes(
        &self,
        series_id: u64,
        season: u32,
        language: &str,
    ) -> Result<Vec<EpisodeInfo>, Error> {
        let path = format!("/tv/{}/season/{}", series_id, season);
        let response: SeasonResponse = self.get_json(&path, &[("language", language)])?;
        Ok(response.episodes)
    }
}
