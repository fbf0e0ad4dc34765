use crate::constants::UNKNOWN_STREAM_NAME;
use crate::events::{FlagsOp, MessageMove, ReactionEvent, UpdateMessageEvent};
use crate::models::{
    Message, MessageEdit, MessageFlag, MessageId, Reaction, Recipient, Submessage,
};
use crate::store::DirectoryStore;
use std::collections::HashMap;
use tracing::warn;

/// Sub-store holding the canonical record of every message the client knows.
pub struct MessageStore {
    messages: HashMap<MessageId, Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            messages: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    // ===== Getters =====

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    // ===== Mutations =====

    /// Insert a message pushed by the live event feed. A duplicate
    /// notification for an id we already hold is ignored.
    /// Returns whether the message was inserted.
    pub fn upsert(&mut self, message: Message) -> bool {
        if self.messages.contains_key(&message.id) {
            return false;
        }
        self.messages.insert(message.id, message);
        true
    }

    /// Store a fetched batch. The server copy is authoritative, so it replaces
    /// whatever we had for the same ids.
    pub fn insert_fetched(&mut self, messages: impl IntoIterator<Item = Message>) {
        for message in messages {
            self.messages.insert(message.id, message);
        }
    }

    /// Mutate a message in place. Missing ids are a no-op: events routinely
    /// reference messages outside anything we've fetched.
    pub fn patch(&mut self, id: MessageId, f: impl FnOnce(&mut Message)) -> bool {
        match self.messages.get_mut(&id) {
            Some(message) => {
                f(message);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, ids: &[MessageId]) {
        for id in ids {
            self.messages.remove(id);
        }
    }

    // ===== Event Handlers =====

    pub fn add_reaction(&mut self, event: &ReactionEvent) {
        self.patch(event.message_id, |message| {
            message.reactions.push(Reaction {
                user_id: event.user_id,
                emoji_name: event.emoji_name.clone(),
                emoji_code: event.emoji_code.clone(),
                reaction_type: event.reaction_type.clone(),
            });
        });
    }

    pub fn remove_reaction(&mut self, event: &ReactionEvent) {
        self.patch(event.message_id, |message| {
            message
                .reactions
                .retain(|r| !(r.user_id == event.user_id && r.emoji_name == event.emoji_name));
        });
    }

    pub fn add_submessage(&mut self, submessage: &Submessage) {
        self.patch(submessage.message_id, |message| {
            message.submessages.push(submessage.clone());
        });
    }

    /// Apply a flag change to the listed ids, or to every stored message when
    /// `all` is set.
    pub fn apply_flag(&mut self, flag: MessageFlag, op: FlagsOp, all: bool, ids: &[MessageId]) {
        let update = |message: &mut Message| match op {
            FlagsOp::Add => message.flags.insert(flag),
            FlagsOp::Remove => message.flags.remove(flag),
        };
        if all {
            self.messages.values_mut().for_each(update);
        } else {
            for id in ids {
                self.patch(*id, update);
            }
        }
    }

    /// Apply an edit and/or move. `directory` resolves the name of the stream
    /// messages move into.
    pub fn apply_update(&mut self, event: &UpdateMessageEvent, directory: &DirectoryStore) {
        let message_move = event.message_move();
        let new_stream_name = message_move.as_ref().map(|m| {
            directory
                .stream(m.new_stream_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| UNKNOWN_STREAM_NAME.to_string())
        });

        self.patch(event.message_id, |message| {
            let mut entry = make_edit_entry(event, message_move.as_ref());
            if let (Some(entry), Some(orig_content)) = (entry.as_mut(), event.orig_content.as_ref()) {
                entry.prev_content = Some(orig_content.clone());
                entry.prev_rendered_content = event.orig_rendered_content.clone();
                entry.prev_rendered_content_version = event.prev_rendered_content_version;
            }
            if let Some(rendered) = &event.rendered_content {
                message.content = rendered.clone();
            }
            if let (Some(message_move), Some(name)) = (&message_move, &new_stream_name) {
                apply_move(message, message_move, name);
            }
            prepend_edit(message, entry);
            if !event.rendering_only {
                if let Some(edit_timestamp) = event.edit_timestamp {
                    message.last_edit_timestamp = Some(edit_timestamp);
                }
            }
        });

        let (Some(message_move), Some(name)) = (message_move, new_stream_name) else {
            return;
        };
        for id in event.message_ids.iter().filter(|id| **id != event.message_id) {
            self.patch(*id, |message| {
                apply_move(message, &message_move, &name);
                prepend_edit(message, make_edit_entry(event, Some(&message_move)));
            });
        }
    }
}

/// History entry for a user-visible edit, without content fields.
fn make_edit_entry(event: &UpdateMessageEvent, message_move: Option<&MessageMove>) -> Option<MessageEdit> {
    if !event.is_user_edit() {
        return None;
    }
    let (Some(timestamp), Some(user_id)) = (event.edit_timestamp, event.user_id) else {
        return None;
    };
    let mut entry = MessageEdit {
        timestamp,
        user_id,
        ..Default::default()
    };
    if let Some(message_move) = message_move {
        if message_move.stream_changed() {
            entry.prev_stream = Some(message_move.orig_stream_id);
            entry.stream = Some(message_move.new_stream_id);
        }
        if message_move.topic_changed() {
            entry.prev_topic = Some(message_move.orig_topic.clone());
            entry.topic = Some(message_move.new_topic.clone());
        }
    }
    Some(entry)
}

/// Null history stays null.
fn prepend_edit(message: &mut Message, entry: Option<MessageEdit>) {
    if let (Some(history), Some(entry)) = (message.edit_history.as_mut(), entry) {
        history.insert(0, entry);
    }
}

fn apply_move(message: &mut Message, message_move: &MessageMove, new_stream_name: &str) {
    match &mut message.recipient {
        Recipient::Stream {
            stream_id,
            stream_name,
            topic,
        } => {
            *topic = message_move.new_topic.clone();
            if message_move.stream_changed() {
                *stream_id = message_move.new_stream_id;
                *stream_name = new_stream_name.to_string();
            }
        }
        Recipient::Private { .. } => {
            warn!(message_id = message.id, "Ignoring stream/topic move of a private message");
        }
    }
}
