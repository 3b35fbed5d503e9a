use clap::{Parser, Subcommand, ValueEnum};
use media_renamer_core::MediaKind;

#[derive(Debug, Parser)]
#[command(name = "media-renamer")]
#[command(about = "Rename episodes and tracks after catalog and tag metadata", long_about = None)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List TV show directories holding video files
    ListTv {
        #[arg(long)]
        series: Option<String>,
        #[arg(long)]
        season: Option<u32>,
    },
    /// List music directories holding audio files
    ListMusic {
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
    },
    /// Rename episodes in a season directory after the TMDB catalog
    RenameEpisodes {
        #[arg(long)]
        series: String,
        #[arg(long)]
        season: u32,
        /// Relative to the TV shows folder
        #[arg(long)]
        directory: String,
        #[arg(long)]
        dry_run: bool,
        /// Bind files without a confident match to the remaining episodes in order
        #[arg(long)]
        assign_seq: bool,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Rename audio tracks in an album directory after their tags
    RenameMusic {
        /// Relative to the music folder
        #[arg(long)]
        directory: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove " (n)" suffixes that are no longer needed
    CleanupSuffixes {
        #[arg(long)]
        directory: String,
        #[arg(long, value_enum, default_value_t = KindArg::Music)]
        kind: KindArg,
        #[arg(long)]
        dry_run: bool,
    },
    /// Clear the cached directory listings
    Refresh,
    /// Watch the media folders and invalidate listings until Enter is pressed
    Watch,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Tv,
    Music,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Tv => MediaKind::Tv,
            KindArg::Music => MediaKind::Music,
        }
    }
}
