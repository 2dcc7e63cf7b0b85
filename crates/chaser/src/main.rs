// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chaser - invoice follow-up scheduling and delivery engine.
//!
//! This is the binary entry point for the Chaser engine.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// Chaser - invoice follow-up scheduling and delivery engine.
#[derive(Parser, Debug)]
#[command(name = "chaser", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP trigger and webhook server.
    Serve,
    /// Run one queue processor batch and exit.
    RunQueue,
    /// Run one engagement scorer pass and exit.
    Score,
    /// Manage Chaser configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Load and validate the configuration, reporting any problems.
    Validate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match chaser_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            chaser_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.engine.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::RunQueue) => serve::run_queue_once(config).await,
        Some(Commands::Score) => serve::run_scorer_once(config).await,
        Some(Commands::Config { command: ConfigCommands::Validate }) => {
            println!("chaser: configuration is valid");
            Ok(())
        }
        None => {
            println!("chaser: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chaser={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
