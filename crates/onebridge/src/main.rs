// SPDX-FileCopyrightText: 2026 Onebridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! onebridge - OneBot v11 message normalization and aggregation bridge.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod offline;
mod replay;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use onebridge_config::{BridgeConfig, ConfigError};

/// onebridge - OneBot v11 message normalization and aggregation bridge.
#[derive(Parser, Debug)]
#[command(name = "onebridge", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard search path.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Feed newline-delimited raw events through the adapter and print
    /// each finalized message as a JSON line.
    Replay {
        /// File of recorded events, one JSON object per line.
        file: PathBuf,
    },
    /// Validate configuration and check the OneBot HTTP API if one is configured.
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig, Vec<ConfigError>> {
    match path {
        Some(path) => onebridge_config::load_and_validate_path(path),
        None => onebridge_config::load_and_validate(),
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("onebridge={log_level},warn")));

    // stdout carries replay output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            onebridge_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.bridge.log_level);

    match cli.command {
        Some(Commands::Replay { file }) => match replay::run_replay(&config, &file).await {
            Ok(stats) => {
                tracing::info!(
                    events = stats.events,
                    malformed = stats.malformed,
                    unrouted = stats.unrouted,
                    emitted = stats.emitted,
                    abandoned = stats.abandoned,
                    "replay finished"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
        Some(Commands::CheckConfig) => {
            if check::run_check(&config).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        None => {
            println!("onebridge: use --help for available commands");
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_replay_with_global_config() {
        let cli = Cli::try_parse_from(["onebridge", "replay", "events.jsonl", "--config", "a.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));
        match cli.command {
            Some(Commands::Replay { file }) => assert_eq!(file, PathBuf::from("events.jsonl")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_check_config() {
        let cli = Cli::try_parse_from(["onebridge", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
        assert!(cli.config.is_none());
    }

    #[test]
    fn replay_requires_a_file() {
        assert!(Cli::try_parse_from(["onebridge", "replay"]).is_err());
    }

    #[test]
    fn explicit_config_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("onebridge.toml");
        std::fs::write(&path, "[bridge]\nname = \"replayer\"\n").unwrap();

        let config = load_config(Some(&path)).expect("valid config");
        assert_eq!(config.bridge.name, "replayer");
    }
}
