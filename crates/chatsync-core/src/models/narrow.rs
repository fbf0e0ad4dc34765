use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use super::{Message, MessageFlags, MessageId, Recipient, StreamId, UserId};

/// A conversation view: which messages a message list should display.
///
/// Two narrows are the same view iff their [`Narrow::key`] strings match, so
/// PM narrows are normalized on construction (see [`Narrow::pm`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    content = "operand",
    rename_all = "snake_case",
    try_from = "WireNarrow"
)]
pub enum Narrow {
    Home,
    Stream(StreamId),
    Topic(StreamId, String),
    Pm(Vec<UserId>),
    Starred,
    Mentioned,
    AllPrivate,
    Search(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NarrowParseError {
    #[error("unknown narrow kind in key {0:?}")]
    UnknownKind(String),
    #[error("malformed narrow key {0:?}")]
    Malformed(String),
    #[error("pm narrow without participants")]
    EmptyPm,
}

/// Wire shape of [`Narrow`], before PM participants are normalized.
#[derive(Deserialize)]
#[serde(tag = "kind", content = "operand", rename_all = "snake_case")]
enum WireNarrow {
    Home,
    Stream(StreamId),
    Topic(StreamId, String),
    Pm(Vec<UserId>),
    Starred,
    Mentioned,
    AllPrivate,
    Search(String),
}

impl TryFrom<WireNarrow> for Narrow {
    type Error = NarrowParseError;

    fn try_from(wire: WireNarrow) -> Result<Self, Self::Error> {
        Ok(match wire {
            WireNarrow::Home => Narrow::Home,
            WireNarrow::Stream(stream_id) => Narrow::Stream(stream_id),
            WireNarrow::Topic(stream_id, topic) => Narrow::Topic(stream_id, topic),
            WireNarrow::Pm(user_ids) if user_ids.is_empty() => return Err(NarrowParseError::EmptyPm),
            WireNarrow::Pm(user_ids) => Narrow::pm(user_ids),
            WireNarrow::Starred => Narrow::Starred,
            WireNarrow::Mentioned => Narrow::Mentioned,
            WireNarrow::AllPrivate => Narrow::AllPrivate,
            WireNarrow::Search(query) => Narrow::Search(query),
        })
    }
}

impl Narrow {
    /// PM narrow with the given participants, sorted and deduplicated.
    /// The caller passes the *other* participants, or just the own id for
    /// the self-PM conversation.
    pub fn pm(user_ids: impl IntoIterator<Item = UserId>) -> Self {
        let ids: BTreeSet<UserId> = user_ids.into_iter().collect();
        Narrow::Pm(ids.into_iter().collect())
    }

    pub fn topic(stream_id: StreamId, topic: impl Into<String>) -> Self {
        Narrow::Topic(stream_id, topic.into())
    }

    /// PM narrow for a conversation given its full participant list.
    pub fn pm_from_recipients(recipient_ids: &[UserId], own_user_id: UserId) -> Self {
        let others: Vec<UserId> = recipient_ids
            .iter()
            .copied()
            .filter(|id| *id != own_user_id)
            .collect();
        if others.is_empty() {
            Narrow::pm([own_user_id])
        } else {
            Narrow::pm(others)
        }
    }

    /// Canonical key string; equal keys mean equal narrows.
    pub fn key(&self) -> String {
        match self {
            Narrow::Home => "home".to_string(),
            Narrow::Stream(stream_id) => format!("stream:{}", stream_id),
            Narrow::Topic(stream_id, topic) => format!("topic:{}:{}", stream_id, topic),
            Narrow::Pm(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                format!("pm:{}", ids.join(","))
            }
            Narrow::Starred => "starred".to_string(),
            Narrow::Mentioned => "mentioned".to_string(),
            Narrow::AllPrivate => "all-pm".to_string(),
            Narrow::Search(query) => format!("search:{}", query),
        }
    }

    /// Inverse of [`Narrow::key`].
    pub fn from_key(key: &str) -> Result<Self, NarrowParseError> {
        let malformed = || NarrowParseError::Malformed(key.to_string());
        let (kind, rest) = match key.split_once(':') {
            Some((kind, rest)) => (kind, Some(rest)),
            None => (key, None),
        };

        match (kind, rest) {
            ("home", None) => Ok(Narrow::Home),
            ("starred", None) => Ok(Narrow::Starred),
            ("mentioned", None) => Ok(Narrow::Mentioned),
            ("all-pm", None) => Ok(Narrow::AllPrivate),
            ("stream", Some(id)) => id.parse().map(Narrow::Stream).map_err(|_| malformed()),
            ("topic", Some(rest)) => {
                // Topic names may themselves contain ':'; only the first one separates.
                let (id, topic) = rest.split_once(':').ok_or_else(malformed)?;
                let stream_id = id.parse().map_err(|_| malformed())?;
                Ok(Narrow::topic(stream_id, topic))
            }
            ("pm", Some(ids)) => {
                let ids = ids
                    .split(',')
                    .map(|id| id.trim().parse::<UserId>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| malformed())?;
                if ids.is_empty() {
                    return Err(malformed());
                }
                Ok(Narrow::pm(ids))
            }
            ("search", Some(query)) => Ok(Narrow::Search(query.to_string())),
            ("home" | "starred" | "mentioned" | "all-pm", Some(_))
            | ("stream" | "topic" | "pm" | "search", None) => Err(malformed()),
            _ => Err(NarrowParseError::UnknownKind(key.to_string())),
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Narrow::Search(_))
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        match self {
            Narrow::Stream(stream_id) | Narrow::Topic(stream_id, _) => Some(*stream_id),
            _ => None,
        }
    }

    /// Description safe to put in logs: the kind only, never ids, topic
    /// names or search text.
    pub fn redacted(&self) -> &'static str {
        match self {
            Narrow::Home => "all",
            Narrow::Stream(_) => "stream",
            Narrow::Topic(_, _) => "topic",
            Narrow::Pm(ids) if ids.len() > 1 => "pm (group)",
            Narrow::Pm(_) => "pm (1:1)",
            Narrow::Starred => "starred",
            Narrow::Mentioned => "mentioned",
            Narrow::AllPrivate => "all-pm",
            Narrow::Search(_) => "search",
        }
    }

    /// Whether a message with this recipient and these flags belongs in the
    /// narrow. Search narrows can't be evaluated locally and match nothing.
    pub fn contains(&self, recipient: &Recipient, flags: &MessageFlags, own_user_id: UserId) -> bool {
        match (self, recipient) {
            (Narrow::Home, _) => true,
            (Narrow::Stream(id), Recipient::Stream { stream_id, .. }) => id == stream_id,
            (Narrow::Topic(id, name), Recipient::Stream { stream_id, topic, .. }) => {
                id == stream_id && name == topic
            }
            (Narrow::Pm(ids), Recipient::Private { recipient_ids }) => {
                Narrow::pm_from_recipients(recipient_ids, own_user_id) == Narrow::Pm(ids.clone())
            }
            (Narrow::AllPrivate, Recipient::Private { .. }) => true,
            (Narrow::Starred, _) => flags.is_starred(),
            (Narrow::Mentioned, _) => flags.is_mentioned(),
            _ => false,
        }
    }
}

impl fmt::Display for Narrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Every narrow a live message belongs to, computed from its recipient and
/// flags. Search narrows are never included.
pub fn narrows_for_message(message: &Message, own_user_id: UserId) -> Vec<Narrow> {
    let mut narrows = vec![Narrow::Home];

    match &message.recipient {
        Recipient::Stream { stream_id, topic, .. } => {
            narrows.push(Narrow::Stream(*stream_id));
            narrows.push(Narrow::topic(*stream_id, topic.clone()));
        }
        Recipient::Private { recipient_ids } => {
            narrows.push(Narrow::AllPrivate);
            narrows.push(Narrow::pm_from_recipients(recipient_ids, own_user_id));
        }
    }

    if message.flags.is_mentioned() {
        narrows.push(Narrow::Mentioned);
    }
    if message.flags.is_starred() {
        narrows.push(Narrow::Starred);
    }

    narrows
}

/// Where a history fetch is centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    FirstUnread,
    LastMessage,
    Message(MessageId),
}
