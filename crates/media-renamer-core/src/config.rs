use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};

/// Lowercased extensions, each with a leading dot (`.mkv`).
pub type ExtensionSet = BTreeSet<String>;

/// Per media kind settings: which files count, which directories are skipped
/// and which companion files go away with a renamed file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaKindConfig {
    pub extensions: Vec<String>,
    #[serde(default = "default_exclude_markers")]
    pub exclude_markers: Vec<String>,
    #[serde(default)]
    pub sidecar_extensions: Vec<String>,
}

impl MediaKindConfig {
    pub fn video() -> Self {
        Self {
            extensions: vec![".mp4".into(), ".mkv".into(), ".mov".into(), ".avi".into()],
            exclude_markers: default_exclude_markers(),
            sidecar_extensions: vec![".nfo".into()],
        }
    }

    pub fn music() -> Self {
        Self {
            extensions: vec![".mp3".into(), ".flac".into(), ".m4a".into(), ".wav".into()],
            exclude_markers: default_exclude_markers(),
            sidecar_extensions: vec![".lrc".into()],
        }
    }

    pub fn extension_set(&self) -> ExtensionSet {
        normalize_extensions(&self.extensions)
    }

    pub fn sidecar_set(&self) -> ExtensionSet {
        normalize_extensions(&self.sidecar_extensions)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    #[serde(default = "default_tvshow_folder_name")]
    pub tvshow_folder_name: String,
    #[serde(default = "default_music_folder_name")]
    pub music_folder_name: String,
    #[serde(default = "MediaKindConfig::video")]
    pub video: MediaKindConfig,
    #[serde(default = "MediaKindConfig::music")]
    pub music: MediaKindConfig,
    #[serde(default)]
    pub tmdb_api_key: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_watch")]
    pub watch: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            tvshow_folder_name: default_tvshow_folder_name(),
            music_folder_name: default_music_folder_name(),
            video: MediaKindConfig::video(),
            music: MediaKindConfig::music(),
            tmdb_api_key: None,
            language: default_language(),
            fallback_language: default_fallback_language(),
            threshold: default_threshold(),
            request_timeout_secs: default_request_timeout_secs(),
            watch: default_watch(),
        }
    }
}

/// Which media root an operation works under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Tv,
    Music,
}

impl AppConfig {
    pub fn tv_root(&self) -> PathBuf {
        self.base_path.join(&self.tvshow_folder_name)
    }

    pub fn music_root(&self) -> PathBuf {
        self.base_path.join(&self.music_folder_name)
    }

    pub fn root(&self, kind: MediaKind) -> PathBuf {
        match kind {
            MediaKind::Tv => self.tv_root(),
            MediaKind::Music => self.music_root(),
        }
    }

    pub fn media(&self, kind: MediaKind) -> &MediaKindConfig {
        match kind {
            MediaKind::Tv => &self.video,
            MediaKind::Music => &self.music,
        }
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        Self {
            tmdb_api_key: self.tmdb_api_key.as_ref().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }
}

fn default_base_path() -> PathBuf {
    PathBuf::from("/media")
}

fn default_tvshow_folder_name() -> String {
    "TV Shows".to_string()
}

fn default_music_folder_name() -> String {
    "Music".to_string()
}

fn default_exclude_markers() -> Vec<String> {
    vec![".trickplay".to_string()]
}

fn default_language() -> String {
    "de".to_string()
}

fn default_fallback_language() -> String {
    "en".to_string()
}

fn default_threshold() -> f64 {
    0.6
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_watch() -> bool {
    true
}

/// Load `Config.toml` (optional) overlaid by `MEDIA_RENAMER_*` environment
/// variables. `BASE_PATH` and `TMDB_API_KEY` are honored unprefixed as well.
///
/// Nested keys use `__` (`MEDIA_RENAMER_VIDEO__EXTENSIONS=.mkv,.mp4`).
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from(Path::new("Config"))
}

pub fn load_configuration_from(file_stem: &Path) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::from(file_stem).required(false))
        .add_source(
            Environment::with_prefix("MEDIA_RENAMER")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("video.extensions")
                .with_list_parse_key("video.exclude_markers")
                .with_list_parse_key("video.sidecar_extensions")
                .with_list_parse_key("music.extensions")
                .with_list_parse_key("music.exclude_markers")
                .with_list_parse_key("music.sidecar_extensions")
                .try_parsing(true),
        )
        .set_override_option("base_path", env::var("BASE_PATH").ok())?
        .set_override_option("tmdb_api_key", env::var("TMDB_API_KEY").ok())?
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Lowercase every extension and make sure it carries a leading dot.
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> ExtensionSet {
    extensions
        .iter()
        .map(|ext| ext.as_ref().trim().to_lowercase())
        .filter(|ext| !ext.is_empty() && ext != ".")
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}

/// Byte index of the extension's dot in `name` when the lowercased extension
/// is in `extensions`.
pub fn recognized_extension(name: &str, extensions: &ExtensionSet) -> Option<usize> {
    let dot = name.rfind('.')?;
    if dot == 0 {
        return None;
    }
    extensions.contains(&name[dot..].to_lowercase()).then_some(dot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extensions_adds_dot_and_lowercases() {
        let set = normalize_extensions(&["MKV", ".Mp4", " .avi ", ""]);
        let expected: Vec<&str> = vec![".avi", ".mkv", ".mp4"];
        assert_eq!(set.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_recognized_extension_is_case_insensitive() {
        let set = MediaKindConfig::video().extension_set();
        assert_eq!(recognized_extension("Show.S01E01.MKV", &set), Some(11));
        // KELVIN SIGN lowercases to a one-byte `k`.
        assert_eq!(recognized_extension("Pilot.m\u{212A}v", &set), Some(5));
        assert_eq!(recognized_extension("notes.txt", &set), None);
        assert_eq!(recognized_extension(".mkv", &set), None);
        assert_eq!(recognized_extension("noext", &set), None);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.tv_root(), PathBuf::from("/media/TV Shows"));
        assert_eq!(config.music_root(), PathBuf::from("/media/Music"));
        assert!((config.threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.music.extension_set().contains(".flac"));
        assert_eq!(config.root(MediaKind::Tv), config.tv_root());
        assert!(config.media(MediaKind::Music).sidecar_set().contains(".lrc"));
    }

    #[test]
    fn test_redacted_masks_api_key() {
        let config = AppConfig {
            tmdb_api_key: Some("0123456789abcdef".into()),
            ..AppConfig::default()
        };
        let shown = format!("{:#?}", config.redacted());
        assert!(!shown.contains("0123456789abcdef"));
        assert!(shown.contains("<redacted>"));
        assert_eq!(config.redacted().base_path, config.base_path);
        assert_eq!(AppConfig::default().redacted().tmdb_api_key, None);
    }

    #[test]
    fn test_load_configuration_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("Renamer");
        std::fs::write(
            dir.path().join("Renamer.toml"),
            r#"
base_path = "/srv/media"
threshold = 0.75

[video]
extensions = [".mkv"]
"#,
        )
        .unwrap();

        let config = load_configuration_from(&stem).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/srv/media"));
        assert!((config.threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.video.extensions, vec![".mkv".to_string()]);
        assert_eq!(config.video.exclude_markers, vec![".trickplay".to_string()]);
        assert_eq!(config.music_folder_name, "Music");
    }
}
