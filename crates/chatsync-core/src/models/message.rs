use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{MessageId, StreamId, UserId};

/// Who a message was addressed to.
///
/// Serialized with an internal `type` tag so that a wire message reads as
/// `{"type": "stream", "stream_id": 3, "subject": "lunch", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Recipient {
    Stream {
        stream_id: StreamId,
        #[serde(default, rename = "display_recipient")]
        stream_name: String,
        #[serde(rename = "subject")]
        topic: String,
    },
    Private {
        /// All participants, the own user included.
        recipient_ids: Vec<UserId>,
    },
}

impl Recipient {
    pub fn is_stream(&self) -> bool {
        matches!(self, Recipient::Stream { .. })
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        match self {
            Recipient::Stream { stream_id, .. } => Some(*stream_id),
            Recipient::Private { .. } => None,
        }
    }

    pub fn topic(&self) -> Option<&str> {
        match self {
            Recipient::Stream { topic, .. } => Some(topic),
            Recipient::Private { .. } => None,
        }
    }

    /// Participants other than `own_user_id`, sorted and deduplicated.
    /// Empty for stream messages and for self-PMs.
    pub fn other_participants(&self, own_user_id: UserId) -> Vec<UserId> {
        match self {
            Recipient::Stream { .. } => Vec::new(),
            Recipient::Private { recipient_ids } => recipient_ids
                .iter()
                .copied()
                .filter(|id| *id != own_user_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFlag {
    Read,
    Starred,
    Mentioned,
    WildcardMentioned,
    Collapsed,
    HasAlertWord,
}

impl MessageFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFlag::Read => "read",
            MessageFlag::Starred => "starred",
            MessageFlag::Mentioned => "mentioned",
            MessageFlag::WildcardMentioned => "wildcard_mentioned",
            MessageFlag::Collapsed => "collapsed",
            MessageFlag::HasAlertWord => "has_alert_word",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "read" => Some(MessageFlag::Read),
            "starred" => Some(MessageFlag::Starred),
            "mentioned" => Some(MessageFlag::Mentioned),
            "wildcard_mentioned" => Some(MessageFlag::WildcardMentioned),
            "collapsed" => Some(MessageFlag::Collapsed),
            "has_alert_word" => Some(MessageFlag::HasAlertWord),
            _ => None,
        }
    }
}

/// The per-user boolean flags of a message, kept as a set.
/// Flags this client does not know about are dropped on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct MessageFlags(BTreeSet<MessageFlag>);

impl From<Vec<String>> for MessageFlags {
    fn from(names: Vec<String>) -> Self {
        names
            .iter()
            .filter_map(|name| MessageFlag::from_wire(name))
            .collect()
    }
}

impl From<MessageFlags> for Vec<String> {
    fn from(flags: MessageFlags) -> Self {
        flags.0.iter().map(|flag| flag.as_str().to_string()).collect()
    }
}

impl MessageFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, flag: MessageFlag) -> Self {
        self.0.insert(flag);
        self
    }

    pub fn contains(&self, flag: MessageFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn insert(&mut self, flag: MessageFlag) {
        self.0.insert(flag);
    }

    pub fn remove(&mut self, flag: MessageFlag) {
        self.0.remove(&flag);
    }

    pub fn is_read(&self) -> bool {
        self.contains(MessageFlag::Read)
    }

    pub fn is_starred(&self) -> bool {
        self.contains(MessageFlag::Starred)
    }

    /// Direct or wildcard mention.
    pub fn is_mentioned(&self) -> bool {
        self.contains(MessageFlag::Mentioned) || self.contains(MessageFlag::WildcardMentioned)
    }
}

impl FromIterator<MessageFlag> for MessageFlags {
    fn from_iter<I: IntoIterator<Item = MessageFlag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: UserId,
    pub emoji_name: String,
    pub emoji_code: String,
    pub reaction_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submessage {
    pub id: u64,
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub msg_type: String,
    pub content: String,
}

/// One entry of a message's edit history, newest first in `Message::edit_history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEdit {
    pub timestamp: u64,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_rendered_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_rendered_content_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_stream: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub timestamp: u64,
    pub sender_id: UserId,
    pub content: String,
    #[serde(flatten)]
    pub recipient: Recipient,
    #[serde(default)]
    pub flags: MessageFlags,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub submessages: Vec<Submessage>,
    /// `None` when the server does not let us see edit history; never
    /// turned into a partial list in that case.
    #[serde(default)]
    pub edit_history: Option<Vec<MessageEdit>>,
    #[serde(default)]
    pub last_edit_timestamp: Option<u64>,
}

impl Message {
    pub fn is_stream(&self) -> bool {
        self.recipient.is_stream()
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        self.recipient.stream_id()
    }

    pub fn topic(&self) -> Option<&str> {
        self.recipient.topic()
    }
}
