use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Active,
    Idle,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Active => "active",
            PresenceStatus::Idle => "idle",
            PresenceStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One client's report (e.g. "website", "ZulipMobile") of a user's presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPresence {
    pub status: PresenceStatus,
    /// Unix seconds.
    pub timestamp: u64,
}

/// The result of aggregating a user's client reports.
/// `client` is informational and empty when the user is offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedPresence {
    pub client: String,
    pub status: PresenceStatus,
    pub timestamp: u64,
}

impl AggregatedPresence {
    pub fn offline() -> Self {
        Self {
            client: String::new(),
            status: PresenceStatus::Offline,
            timestamp: 0,
        }
    }
}
