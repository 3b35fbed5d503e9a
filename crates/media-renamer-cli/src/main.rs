mod commands;
mod logging;
mod progress;

use std::io;
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use media_renamer_core::{
    DirectoryWatcher, EpisodeRequest, MusicFilter, MusicRequest, RenameEngine, RunOutcome, TvFilter,
};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match media_renamer_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let engine = RenameEngine::new(config.clone());
    let roots = vec![config.tv_root(), config.music_root()];

    let mut watcher = if config.watch || matches!(args.command, Some(Commands::Watch)) {
        Some(DirectoryWatcher::start(&roots, engine.cache()).context("starting directory watcher")?)
    } else {
        None
    };

    let reporter = CliReporter::new();
    let mut success = true;

    match args.command {
        Some(Commands::ListTv { series, season }) => {
            let directories = engine.list_tv_directories(&TvFilter { series, season }, &reporter)?;
            print_directories(&directories, args.json)?;
        }
        Some(Commands::ListMusic { artist, album }) => {
            let directories =
                engine.list_music_directories(&MusicFilter { artist, album }, &reporter)?;
            print_directories(&directories, args.json)?;
        }
        Some(Commands::RenameEpisodes {
            series,
            season,
            directory,
            dry_run,
            assign_seq,
            threshold,
            lang,
        }) => {
            let request = EpisodeRequest {
                series,
                season,
                directory,
                language: lang,
                dry_run,
                fill_unmatched: assign_seq,
                threshold,
            };
            let outcome = engine.rename_episodes(&request, &reporter);
            success = print_outcome(&outcome, args.json)?;
        }
        Some(Commands::RenameMusic { directory, dry_run }) => {
            let outcome = engine.rename_music(&MusicRequest { directory, dry_run }, &reporter);
            success = print_outcome(&outcome, args.json)?;
        }
        Some(Commands::CleanupSuffixes {
            directory,
            kind,
            dry_run,
        }) => {
            let outcome = engine.cleanup_suffixes(kind.into(), &directory, dry_run);
            success = print_outcome(&outcome, args.json)?;
        }
        Some(Commands::Refresh) => {
            engine.refresh();
            println!("{}", "Directory listings cleared".green());
        }
        Some(Commands::Watch) => {
            info!("Watching {:?}; press Enter to stop", roots);
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config.redacted());
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    if let Some(watcher) = watcher.as_mut() {
        watcher.stop();
    }

    if !success {
        process::exit(1);
    }
    Ok(())
}

fn print_directories(directories: &[String], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(directories)?);
    } else {
        for directory in directories {
            println!("{}", directory);
        }
        eprintln!("{} directories", directories.len().to_string().cyan());
    }
    Ok(())
}

/// Returns the outcome's success flag.
fn print_outcome(outcome: &RunOutcome, json: bool) -> anyhow::Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(outcome.success);
    }

    for line in &outcome.log {
        println!("{}", colorize(line));
    }
    if let Some(err) = &outcome.error {
        eprintln!("{} {}", "Error:".red().bold(), err);
    }
    Ok(outcome.success)
}

fn colorize(line: &str) -> ColoredString {
    if line.starts_with("[ERROR]") || line.starts_with("[WARN]") {
        line.red()
    } else if line.starts_with("[ SKIP ]") || line.starts_with("[ KEEP ]") {
        line.yellow()
    } else if line.starts_with("[DRY-RUN]") {
        line.cyan()
    } else if line.starts_with("[RENAME]") || line.starts_with("[RESTORE]") {
        line.green()
    } else if line.starts_with("Summary:") || line.starts_with("Cleanup:") {
        line.bold()
    } else {
        line.normal()
    }
}
