use serde::{Deserialize, Serialize};

use super::{StreamId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub stream_id: StreamId,
    pub name: String,
    #[serde(default)]
    pub invite_only: bool,
}

/// The own user's subscription to a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub stream_id: StreamId,
    pub name: String,
    /// False when the stream itself is muted.
    #[serde(default = "default_in_home_view")]
    pub in_home_view: bool,
}

fn default_in_home_view() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

/// Per-topic visibility policy chosen by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityPolicy {
    #[default]
    None,
    Muted,
    Unmuted,
    Followed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTopic {
    pub stream_id: StreamId,
    pub topic_name: String,
    pub visibility_policy: VisibilityPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutedUser {
    pub id: UserId,
    pub timestamp: u64,
}
