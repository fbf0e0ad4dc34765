use anyhow::{Context, Result};
use std::fs::OpenOptions;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::LOG_FILE_ENV;

pub fn init_tracing() -> Result<()> {
    init_tracing_with_default("info")
}

/// Install the global subscriber: stderr output filtered by `RUST_LOG`
/// (falling back to `default_directive`), plus a debug-level file copy when
/// `CHATSYNC_LOG_FILE` is set.
pub fn init_tracing_with_default(default_directive: &str) -> Result<()> {
    let file_logging = std::env::var(LOG_FILE_ENV).ok();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .context("invalid log filter")?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    if let Some(log_path) = file_logging {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("failed to open log file {}", log_path))?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

        registry
            .with(file_layer)
            .try_init()
            .context("tracing already initialized")?;
        tracing::info!(path = %log_path, "File logging enabled");
    } else {
        registry.try_init().context("tracing already initialized")?;
    }
    Ok(())
}
