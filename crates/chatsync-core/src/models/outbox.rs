use serde::{Deserialize, Serialize};

use super::{MessageId, Recipient, UserId};

/// A locally composed message the server hasn't confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbox {
    /// Client-chosen id, a millisecond timestamp. Also used as the sort id,
    /// which places outbox entries after every server-assigned id.
    pub local_id: MessageId,
    pub sender_id: UserId,
    #[serde(flatten)]
    pub recipient: Recipient,
    pub content: String,
    /// Unix seconds.
    pub timestamp: u64,
    #[serde(default)]
    pub is_sent: bool,
}
