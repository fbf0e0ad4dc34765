use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{
    Anchor, ClientPresence, Message, MessageFlag, MessageId, MutedUser, Narrow, Outbox,
    Stream, StreamId, Submessage, Subscription, User, UserId, UserTopic,
};

/// Everything that can change conversation state, in the order the
/// fetch coordinator and the event pump produce it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    /// Account switched or logged out: drop everything.
    ResetAccountData,
    /// A fresh event queue was registered with the server.
    RegisterComplete(InitialSnapshot),

    FetchStart {
        narrow: Narrow,
        num_before: u32,
        num_after: u32,
    },
    FetchError {
        narrow: Narrow,
    },
    FetchComplete(FetchCompleteEvent),

    NewMessage {
        message: Message,
        /// Set when this is the server echo of one of our outbox entries.
        #[serde(default)]
        local_message_id: Option<MessageId>,
    },
    MessageDelete {
        message_ids: Vec<MessageId>,
    },
    ReactionAdd(ReactionEvent),
    ReactionRemove(ReactionEvent),
    Submessage(Submessage),
    UpdateMessage(UpdateMessageEvent),
    UpdateMessageFlags(UpdateMessageFlagsEvent),

    PresenceResponse {
        presences: HashMap<UserId, HashMap<String, ClientPresence>>,
        server_timestamp: u64,
    },
    Presence {
        user_id: UserId,
        server_timestamp: u64,
        presence: HashMap<String, ClientPresence>,
    },

    TypingStart {
        sender_id: UserId,
        recipient_ids: Vec<UserId>,
        /// Milliseconds.
        time: u64,
    },
    TypingStop {
        sender_id: UserId,
        recipient_ids: Vec<UserId>,
        time: u64,
    },
    ClearTyping {
        keys: Vec<String>,
    },

    MutedUsers {
        muted_users: Vec<MutedUser>,
    },
    UserTopic(UserTopic),
    SubscriptionAdd {
        subscriptions: Vec<Subscription>,
    },
    SubscriptionRemove {
        stream_ids: Vec<StreamId>,
    },
    SubscriptionUpdate {
        stream_id: StreamId,
        in_home_view: bool,
    },
    StreamCreate {
        streams: Vec<Stream>,
    },
    StreamDelete {
        stream_ids: Vec<StreamId>,
    },
    RealmUserAdd {
        user: User,
    },
    RealmUserRemove {
        user_id: UserId,
    },

    MessageSendStart {
        outbox: Outbox,
    },
    MessageSendComplete {
        local_message_id: MessageId,
    },
    DeleteOutboxMessage {
        local_message_id: MessageId,
    },
}

impl IngestEvent {
    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestEvent::ResetAccountData => "reset_account_data",
            IngestEvent::RegisterComplete(_) => "register_complete",
            IngestEvent::FetchStart { .. } => "fetch_start",
            IngestEvent::FetchError { .. } => "fetch_error",
            IngestEvent::FetchComplete(_) => "fetch_complete",
            IngestEvent::NewMessage { .. } => "new_message",
            IngestEvent::MessageDelete { .. } => "message_delete",
            IngestEvent::ReactionAdd(_) => "reaction_add",
            IngestEvent::ReactionRemove(_) => "reaction_remove",
            IngestEvent::Submessage(_) => "submessage",
            IngestEvent::UpdateMessage(_) => "update_message",
            IngestEvent::UpdateMessageFlags(_) => "update_message_flags",
            IngestEvent::PresenceResponse { .. } => "presence_response",
            IngestEvent::Presence { .. } => "presence",
            IngestEvent::TypingStart { .. } => "typing_start",
            IngestEvent::TypingStop { .. } => "typing_stop",
            IngestEvent::ClearTyping { .. } => "clear_typing",
            IngestEvent::MutedUsers { .. } => "muted_users",
            IngestEvent::UserTopic(_) => "user_topic",
            IngestEvent::SubscriptionAdd { .. } => "subscription_add",
            IngestEvent::SubscriptionRemove { .. } => "subscription_remove",
            IngestEvent::SubscriptionUpdate { .. } => "subscription_update",
            IngestEvent::StreamCreate { .. } => "stream_create",
            IngestEvent::StreamDelete { .. } => "stream_delete",
            IngestEvent::RealmUserAdd { .. } => "realm_user_add",
            IngestEvent::RealmUserRemove { .. } => "realm_user_remove",
            IngestEvent::MessageSendStart { .. } => "message_send_start",
            IngestEvent::MessageSendComplete { .. } => "message_send_complete",
            IngestEvent::DeleteOutboxMessage { .. } => "delete_outbox_message",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchCompleteEvent {
    pub narrow: Narrow,
    pub messages: Vec<Message>,
    pub anchor: Anchor,
    pub num_before: u32,
    pub num_after: u32,
    pub found_newest: bool,
    pub found_oldest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji_name: String,
    #[serde(default)]
    pub emoji_code: String,
    #[serde(default)]
    pub reaction_type: String,
}

/// A message edit and/or move.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMessageEvent {
    /// The message whose content changed, if any did.
    pub message_id: MessageId,
    /// Every message affected, including `message_id`.
    #[serde(default)]
    pub message_ids: Vec<MessageId>,
    #[serde(default)]
    pub rendered_content: Option<String>,
    #[serde(default)]
    pub orig_content: Option<String>,
    #[serde(default)]
    pub orig_rendered_content: Option<String>,
    #[serde(default)]
    pub prev_rendered_content_version: Option<u32>,
    /// Absent on old servers for rendering-only updates.
    #[serde(default)]
    pub edit_timestamp: Option<u64>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub rendering_only: bool,
    /// Original stream; absent for private messages.
    #[serde(default)]
    pub stream_id: Option<StreamId>,
    #[serde(default)]
    pub new_stream_id: Option<StreamId>,
    #[serde(default)]
    pub orig_subject: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMove {
    pub orig_stream_id: StreamId,
    pub new_stream_id: StreamId,
    pub orig_topic: String,
    pub new_topic: String,
}

impl MessageMove {
    pub fn stream_changed(&self) -> bool {
        self.orig_stream_id != self.new_stream_id
    }

    pub fn topic_changed(&self) -> bool {
        self.orig_topic != self.new_topic
    }
}

impl UpdateMessageEvent {
    /// The stream/topic move this event describes, if any.
    pub fn message_move(&self) -> Option<MessageMove> {
        let orig_stream_id = self.stream_id?;
        let orig_topic = self.orig_subject.clone().or_else(|| self.subject.clone())?;
        let new_stream_id = self.new_stream_id.unwrap_or(orig_stream_id);
        let new_topic = self.subject.clone().unwrap_or_else(|| orig_topic.clone());

        let message_move = MessageMove {
            orig_stream_id,
            new_stream_id,
            orig_topic,
            new_topic,
        };
        if !message_move.stream_changed() && !message_move.topic_changed() {
            return None;
        }
        Some(message_move)
    }

    /// Whether this event records a user-visible edit (and so belongs in
    /// edit history).
    pub fn is_user_edit(&self) -> bool {
        !self.rendering_only && self.edit_timestamp.is_some() && self.user_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagsOp {
    Add,
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMessageFlagsEvent {
    pub op: FlagsOp,
    /// Wire name of the flag; unknown flags are ignored.
    pub flag: String,
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub messages: Vec<MessageId>,
    /// Sent with `remove` ops so unread state can be rebuilt for messages
    /// this client may never have fetched.
    #[serde(default)]
    pub message_details: Option<HashMap<MessageId, MessageDetails>>,
}

impl UpdateMessageFlagsEvent {
    pub fn flag(&self) -> Option<MessageFlag> {
        MessageFlag::from_wire(&self.flag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageDetails {
    Stream {
        stream_id: StreamId,
        topic: String,
        #[serde(default)]
        mentioned: bool,
    },
    Private {
        /// Participants other than the own user.
        user_ids: Vec<UserId>,
        #[serde(default)]
        mentioned: bool,
    },
}

impl MessageDetails {
    pub fn mentioned(&self) -> bool {
        match self {
            MessageDetails::Stream { mentioned, .. } | MessageDetails::Private { mentioned, .. } => {
                *mentioned
            }
        }
    }
}

/// Initial data delivered when an event queue is registered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialSnapshot {
    pub own_user_id: UserId,
    pub streams: Vec<Stream>,
    pub subscriptions: Vec<Subscription>,
    pub users: Vec<User>,
    pub unread: InitialUnread,
    pub user_topics: Vec<UserTopic>,
    pub muted_users: Vec<MutedUser>,
    pub presences: HashMap<UserId, HashMap<String, ClientPresence>>,
    pub server_timestamp: u64,
    pub presence_offline_threshold_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialUnread {
    pub streams: Vec<UnreadStreamEntry>,
    pub pms: Vec<UnreadPmEntry>,
    pub huddles: Vec<UnreadHuddleEntry>,
    pub mentions: Vec<MessageId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadStreamEntry {
    pub stream_id: StreamId,
    pub topic: String,
    pub unread_message_ids: Vec<MessageId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadPmEntry {
    pub sender_id: UserId,
    pub unread_message_ids: Vec<MessageId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadHuddleEntry {
    /// Comma-joined sorted ids of every participant, own user included.
    pub user_ids_string: String,
    pub unread_message_ids: Vec<MessageId>,
}
