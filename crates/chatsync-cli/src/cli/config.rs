use std::path::Path;

use anyhow::{Context, Result};
use chatsync_core::models::UserId;
use chatsync_core::CoreConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration that can be loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Account the replayed log belongs to, unless the log registers one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub own_user_id: Option<UserId>,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    /// Engine tunables
    #[serde(default)]
    pub core: CoreConfig,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: CliConfig = serde_json::from_str(json).context("Failed to deserialize config")?;
        config.core.validate().context("Invalid engine settings")?;
        Ok(config)
    }
}
