use crate::config::CoreConfig;
use crate::error::report_invariant_violation;
use crate::events::{
    FetchCompleteEvent, FlagsOp, IngestEvent, InitialSnapshot, UpdateMessageEvent,
    UpdateMessageFlagsEvent,
};
use crate::models::{narrows_for_message, Message, MessageFlag, MessageId, Narrow, UserId};
use crate::store::typing_store::typing_key;
use crate::store::{
    DirectoryStore, FetchingStore, MessageStore, MuteStore, NarrowIndex, OutboxStore,
    PresenceStore, TypingStore, UnreadStore,
};
use tracing::{debug, info};

/// All conversation state for one account. Single source of truth for the
/// presentation layer; every change arrives through [`ConversationStore::apply`].
pub struct ConversationStore {
    own_user_id: UserId,
    default_presence_threshold_secs: u64,

    pub messages: MessageStore,
    pub narrows: NarrowIndex,
    pub fetching: FetchingStore,
    pub directory: DirectoryStore,
    pub mute: MuteStore,
    pub unread: UnreadStore,
    pub presence: PresenceStore,
    pub typing: TypingStore,
    pub outbox: OutboxStore,
}

impl ConversationStore {
    pub fn new(own_user_id: UserId, config: &CoreConfig) -> Self {
        Self {
            own_user_id,
            default_presence_threshold_secs: config.presence_offline_threshold_secs,
            messages: MessageStore::new(),
            narrows: NarrowIndex::new(),
            fetching: FetchingStore::new(),
            directory: DirectoryStore::new(),
            mute: MuteStore::new(),
            unread: UnreadStore::new(),
            presence: PresenceStore::new(config.presence_offline_threshold_secs),
            typing: TypingStore::new(),
            outbox: OutboxStore::new(),
        }
    }

    pub fn own_user_id(&self) -> UserId {
        self.own_user_id
    }

    /// Drop all state, as on logout or account switch.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.narrows.clear();
        self.fetching.clear();
        self.directory.clear();
        self.mute.clear();
        self.unread.clear();
        self.presence.clear();
        self.presence
            .set_offline_threshold_secs(self.default_presence_threshold_secs);
        self.typing.clear();
        self.outbox.clear();
    }

    /// Apply one ingestion event. Message store and narrow index go first,
    /// then each aggregator takes the same event.
    pub fn apply(&mut self, event: &IngestEvent) {
        debug!(kind = event.kind(), "Applying event");
        match event {
            IngestEvent::ResetAccountData => self.clear(),
            IngestEvent::RegisterComplete(snapshot) => self.handle_register_complete(snapshot),

            IngestEvent::FetchStart {
                narrow,
                num_before,
                num_after,
            } => {
                self.narrows.fetch_start(narrow);
                self.fetching.fetch_start(narrow, *num_before, *num_after);
            }
            IngestEvent::FetchError { narrow } => {
                self.narrows.fetch_error(narrow);
                self.fetching.fetch_error(narrow);
            }
            IngestEvent::FetchComplete(complete) => self.handle_fetch_complete(complete),

            IngestEvent::NewMessage {
                message,
                local_message_id,
            } => self.handle_new_message(message, *local_message_id),
            IngestEvent::MessageDelete { message_ids } => {
                self.messages.delete(message_ids);
                self.narrows.delete(message_ids);
                self.unread.remove_ids(message_ids);
            }
            IngestEvent::ReactionAdd(reaction) => self.messages.add_reaction(reaction),
            IngestEvent::ReactionRemove(reaction) => self.messages.remove_reaction(reaction),
            IngestEvent::Submessage(submessage) => self.messages.add_submessage(submessage),
            IngestEvent::UpdateMessage(update) => self.handle_update_message(update),
            IngestEvent::UpdateMessageFlags(flags) => self.handle_update_message_flags(flags),

            IngestEvent::PresenceResponse {
                presences,
                server_timestamp,
            } => self.presence.load(presences, *server_timestamp),
            IngestEvent::Presence {
                user_id,
                server_timestamp,
                presence,
            } => self.presence.update(*user_id, presence, *server_timestamp),

            IngestEvent::TypingStart {
                sender_id,
                recipient_ids,
                time,
            } => {
                if *sender_id != self.own_user_id {
                    let key = typing_key(recipient_ids, self.own_user_id);
                    self.typing.start(key, *sender_id, *time);
                }
            }
            IngestEvent::TypingStop {
                sender_id,
                recipient_ids,
                ..
            } => {
                if *sender_id != self.own_user_id {
                    let key = typing_key(recipient_ids, self.own_user_id);
                    self.typing.stop(&key, *sender_id);
                }
            }
            IngestEvent::ClearTyping { keys } => self.typing.clear_keys(keys),

            IngestEvent::MutedUsers { muted_users } => self.mute.set_muted_users(muted_users),
            IngestEvent::UserTopic(user_topic) => self.mute.set_user_topic(user_topic),
            IngestEvent::SubscriptionAdd { subscriptions } => {
                self.directory.add_subscriptions(subscriptions.iter().cloned())
            }
            IngestEvent::SubscriptionRemove { stream_ids } => {
                self.directory.remove_subscriptions(stream_ids)
            }
            IngestEvent::SubscriptionUpdate {
                stream_id,
                in_home_view,
            } => self.directory.set_in_home_view(*stream_id, *in_home_view),
            IngestEvent::StreamCreate { streams } => {
                self.directory.add_streams(streams.iter().cloned())
            }
            IngestEvent::StreamDelete { stream_ids } => self.directory.remove_streams(stream_ids),
            IngestEvent::RealmUserAdd { user } => self.directory.add_users([user.clone()]),
            IngestEvent::RealmUserRemove { user_id } => self.directory.remove_user(*user_id),

            IngestEvent::MessageSendStart { outbox } => self.outbox.add(outbox.clone()),
            IngestEvent::MessageSendComplete { local_message_id } => {
                self.outbox.mark_sent(*local_message_id)
            }
            IngestEvent::DeleteOutboxMessage { local_message_id } => {
                self.outbox.remove(*local_message_id)
            }
        }
    }

    // ===== Event Handlers =====

    fn handle_register_complete(&mut self, snapshot: &InitialSnapshot) {
        info!(
            own_user_id = snapshot.own_user_id,
            streams = snapshot.streams.len(),
            users = snapshot.users.len(),
            "Event queue registered; rebuilding state"
        );
        self.own_user_id = snapshot.own_user_id;

        // Messages and narrows are never carried across a registration; they
        // are rebuilt by fetching.
        self.messages.clear();
        self.narrows.clear();
        self.fetching.clear();
        self.typing.clear();
        self.outbox.drop_sent();

        self.directory.clear();
        self.directory.add_streams(snapshot.streams.iter().cloned());
        self.directory
            .add_subscriptions(snapshot.subscriptions.iter().cloned());
        self.directory.add_users(snapshot.users.iter().cloned());

        self.mute.clear();
        for user_topic in &snapshot.user_topics {
            self.mute.set_user_topic(user_topic);
        }
        self.mute.set_muted_users(&snapshot.muted_users);

        self.unread.load_snapshot(&snapshot.unread);

        self.presence.clear();
        self.presence.set_offline_threshold_secs(
            snapshot
                .presence_offline_threshold_secs
                .unwrap_or(self.default_presence_threshold_secs),
        );
        self.presence
            .load(&snapshot.presences, snapshot.server_timestamp);
    }

    fn handle_fetch_complete(&mut self, complete: &FetchCompleteEvent) {
        self.messages.insert_fetched(complete.messages.iter().cloned());
        self.narrows.fetch_complete(complete);
        self.fetching
            .fetch_complete(&complete.narrow, complete.num_before, complete.num_after);
    }

    fn handle_new_message(&mut self, message: &Message, local_message_id: Option<MessageId>) {
        if let Some(local_id) = local_message_id {
            self.outbox.remove(local_id);
        }

        // Store and index together or not at all: a message only enters the
        // store if some narrow is caught up to the live edge and takes it.
        let narrows = narrows_for_message(message, self.own_user_id);
        let targets = self.narrows.caught_up_newer(&narrows);
        if !targets.is_empty() {
            self.messages.upsert(message.clone());
            for narrow in targets {
                self.narrows.insert_into_existing(narrow, message.id);
            }
        }

        self.unread.add_message(message, self.own_user_id);
    }

    fn handle_update_message(&mut self, update: &UpdateMessageEvent) {
        self.messages.apply_update(update, &self.directory);

        let Some(message_move) = update.message_move() else {
            return;
        };
        let mut ids = update.message_ids.clone();
        if !ids.contains(&update.message_id) {
            ids.push(update.message_id);
        }
        ids.sort_unstable();

        let old_topic = Narrow::topic(message_move.orig_stream_id, message_move.orig_topic.clone());
        let new_topic = Narrow::topic(message_move.new_stream_id, message_move.new_topic.clone());
        self.narrows.remove_from(&old_topic, &ids);
        if message_move.stream_changed() {
            self.narrows
                .remove_from(&Narrow::Stream(message_move.orig_stream_id), &ids);
        }

        let stored: Vec<MessageId> = ids
            .iter()
            .copied()
            .filter(|id| self.messages.contains(*id))
            .collect();
        self.narrows.merge_into_existing(&new_topic, &stored);
        if message_move.stream_changed() {
            self.narrows
                .merge_into_existing(&Narrow::Stream(message_move.new_stream_id), &stored);
        }

        self.unread.move_messages(&ids, &message_move);
    }

    fn handle_update_message_flags(&mut self, event: &UpdateMessageFlagsEvent) {
        let Some(flag) = event.flag() else {
            debug!(flag = %event.flag, "Ignoring unknown message flag");
            return;
        };
        self.messages
            .apply_flag(flag, event.op, event.all, &event.messages);

        match flag {
            MessageFlag::Starred => match event.op {
                FlagsOp::Add => {
                    for id in &event.messages {
                        if self.messages.contains(*id) {
                            self.narrows.insert_into_existing(&Narrow::Starred, *id);
                        }
                    }
                }
                FlagsOp::Remove => self.narrows.remove_from(&Narrow::Starred, &event.messages),
            },
            MessageFlag::Read => match (event.op, event.all) {
                (FlagsOp::Add, true) => self.unread.clear(),
                (FlagsOp::Add, false) => self.unread.remove_ids(&event.messages),
                (FlagsOp::Remove, _) => {
                    if let Some(details) = &event.message_details {
                        self.unread
                            .mark_unread(&event.messages, details, self.own_user_id);
                    }
                }
            },
            _ => {}
        }
    }

    // ===== Query Methods =====

    /// Check that every indexed id has a stored record and that every
    /// narrow's ids are strictly ascending. Violations are reported through
    /// [`report_invariant_violation`].
    pub fn check_invariants(&self) -> bool {
        let mut ok = true;
        for (key, entry) in self.narrows.iter() {
            let label = Narrow::from_key(key).map_or("unknown", |narrow| narrow.redacted());
            if let Some(id) = entry.ids.iter().find(|id| !self.messages.contains(**id)) {
                report_invariant_violation(&format!("{} narrow indexes missing message {}", label, id));
                ok = false;
            }
            if entry.ids.windows(2).any(|w| w[0] >= w[1]) {
                report_invariant_violation(&format!("{} narrow ids are not strictly ascending", label));
                ok = false;
            }
        }
        ok
    }
}
