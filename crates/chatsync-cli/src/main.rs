use std::path::PathBuf;

use anyhow::{Context, Result};
use chatsync_cli::cli::{list_narrows, replay_file, summarize, CliConfig};
use chatsync_core::models::{Narrow, UserId};
use chatsync_core::tracing_setup::init_tracing_with_default;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "chatsync")]
#[command(about = "Replay chat event logs through the conversation state engine")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Path to JSON config file (contains ownUserId, logFilter, core)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an event log and print a summary of the resulting state
    Replay {
        /// JSON-lines file, one event per line
        events: PathBuf,
        /// Narrow key to report on (e.g. "home", "stream:3", "topic:3:lunch", "pm:4,7")
        #[arg(long, short = 'n')]
        narrow: Option<String>,
        /// Own user id, when the log has no register_complete event
        #[arg(long)]
        own_user: Option<UserId>,
        /// Unix seconds to evaluate presence at (defaults to now)
        #[arg(long)]
        now: Option<u64>,
    },

    /// List every narrow the log indexed, with message counts
    Narrows {
        /// JSON-lines file, one event per line
        events: PathBuf,
        /// Own user id, when the log has no register_complete event
        #[arg(long)]
        own_user: Option<UserId>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let directive = config.log_filter.as_deref().unwrap_or("warn");
    if let Err(e) = init_tracing_with_default(directive) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    if let Err(e) = run(cli.command, config, cli.pretty).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: CliConfig, pretty: bool) -> Result<()> {
    match command {
        Commands::Replay {
            events,
            narrow,
            own_user,
            now,
        } => {
            let narrow = narrow
                .map(|key| Narrow::from_key(&key).with_context(|| format!("Invalid narrow: {}", key)))
                .transpose()?;
            let own_user_id = own_user.or(config.own_user_id).unwrap_or_default();
            let now = now.unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64);

            let runtime = replay_file(&events, own_user_id, config.core).await?;
            let state = runtime.store();
            let summary = summarize(&state.lock(), narrow.as_ref(), now);
            print_json(&summary, pretty)
        }
        Commands::Narrows { events, own_user } => {
            let own_user_id = own_user.or(config.own_user_id).unwrap_or_default();
            let runtime = replay_file(&events, own_user_id, config.core).await?;
            let state = runtime.store();
            let listings = list_narrows(&state.lock());
            print_json(&listings, pretty)
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}

/// Load configuration from file, or defaults when none is given
fn load_config(cli: &Cli) -> Result<CliConfig> {
    match cli.config {
        Some(ref path) => CliConfig::load(path),
        None => Ok(CliConfig::default()),
    }
}
