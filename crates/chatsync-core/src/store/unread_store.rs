use crate::events::{InitialUnread, MessageDetails, MessageMove};
use crate::models::{Message, MessageId, Recipient, StreamId, UserId};
use crate::store::{DirectoryStore, MuteStore};
use std::collections::{BTreeMap, BTreeSet};

type IdSet = BTreeSet<MessageId>;

/// Key of a group PM conversation: sorted, comma-joined ids of every
/// participant including the own user.
pub fn huddle_key(user_ids: &[UserId], own_user_id: UserId) -> String {
    let ids: BTreeSet<UserId> = user_ids
        .iter()
        .copied()
        .chain(std::iter::once(own_user_id))
        .collect();
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Sub-store for unread message ids, kept in four independent buckets.
/// Mentions overlap the other three; everything else belongs to exactly one.
pub struct UnreadStore {
    streams: BTreeMap<StreamId, BTreeMap<String, IdSet>>,
    pms: BTreeMap<UserId, IdSet>,
    huddles: BTreeMap<String, IdSet>,
    mentions: IdSet,
}

impl UnreadStore {
    pub fn new() -> Self {
        Self {
            streams: BTreeMap::new(),
            pms: BTreeMap::new(),
            huddles: BTreeMap::new(),
            mentions: BTreeSet::new(),
        }
    }

    pub fn clear(&mut self) {
        self.streams.clear();
        self.pms.clear();
        self.huddles.clear();
        self.mentions.clear();
    }

    pub fn load_snapshot(&mut self, unread: &InitialUnread) {
        self.clear();
        for entry in &unread.streams {
            self.topic_mut(entry.stream_id, &entry.topic)
                .extend(entry.unread_message_ids.iter().copied());
        }
        for entry in &unread.pms {
            self.pms
                .entry(entry.sender_id)
                .or_default()
                .extend(entry.unread_message_ids.iter().copied());
        }
        for entry in &unread.huddles {
            self.huddles
                .entry(entry.user_ids_string.clone())
                .or_default()
                .extend(entry.unread_message_ids.iter().copied());
        }
        self.mentions.extend(unread.mentions.iter().copied());
        self.prune();
    }

    // ===== Query Methods =====

    pub fn count_in_topic(&self, stream_id: StreamId, topic: &str) -> usize {
        self.streams
            .get(&stream_id)
            .and_then(|topics| topics.get(topic))
            .map_or(0, |ids| ids.len())
    }

    pub fn count_in_stream(&self, stream_id: StreamId) -> usize {
        self.streams
            .get(&stream_id)
            .map_or(0, |topics| topics.values().map(|ids| ids.len()).sum())
    }

    pub fn count_pm(&self, sender_id: UserId) -> usize {
        self.pms.get(&sender_id).map_or(0, |ids| ids.len())
    }

    pub fn count_huddle(&self, key: &str) -> usize {
        self.huddles.get(key).map_or(0, |ids| ids.len())
    }

    pub fn stream_total(&self) -> usize {
        self.streams.keys().map(|id| self.count_in_stream(*id)).sum()
    }

    pub fn pm_total(&self) -> usize {
        self.pms.values().map(|ids| ids.len()).sum()
    }

    pub fn huddle_total(&self) -> usize {
        self.huddles.values().map(|ids| ids.len()).sum()
    }

    pub fn mentions_total(&self) -> usize {
        self.mentions.len()
    }

    /// Stream + PM + group PM unreads. Mentions are excluded since they
    /// double-count the others.
    pub fn total(&self) -> usize {
        self.stream_total() + self.pm_total() + self.huddle_total()
    }

    pub fn is_mention_unread(&self, id: MessageId) -> bool {
        self.mentions.contains(&id)
    }

    /// Every unread id across the stream, PM and group PM buckets.
    pub fn all_unread_ids(&self) -> BTreeSet<MessageId> {
        let streams = self.streams.values().flat_map(|topics| topics.values());
        streams
            .chain(self.pms.values())
            .chain(self.huddles.values())
            .flatten()
            .copied()
            .collect()
    }

    /// Unread counts per subscribed stream, skipping topics the mute model
    /// hides. Streams with nothing visible are left out.
    pub fn unread_by_stream(&self, directory: &DirectoryStore, mute: &MuteStore) -> Vec<(StreamId, usize)> {
        self.streams
            .iter()
            .filter_map(|(stream_id, topics)| {
                let subscription = directory.subscription(*stream_id)?;
                let count: usize = topics
                    .iter()
                    .filter(|(topic, _)| mute.is_topic_visible(*stream_id, topic, subscription))
                    .map(|(_, ids)| ids.len())
                    .sum();
                (count > 0).then_some((*stream_id, count))
            })
            .collect()
    }

    // ===== Event Handlers =====

    pub fn add_message(&mut self, message: &Message, own_user_id: UserId) {
        if message.flags.is_read() {
            return;
        }
        if message.flags.is_mentioned() {
            self.mentions.insert(message.id);
        }
        if message.sender_id == own_user_id {
            return;
        }
        match &message.recipient {
            Recipient::Stream { stream_id, topic, .. } => {
                self.topic_mut(*stream_id, topic).insert(message.id);
            }
            Recipient::Private { recipient_ids } => {
                if recipient_ids.len() <= 2 {
                    self.pms.entry(message.sender_id).or_default().insert(message.id);
                } else {
                    self.huddles
                        .entry(huddle_key(recipient_ids, own_user_id))
                        .or_default()
                        .insert(message.id);
                }
            }
        }
    }

    pub fn remove_ids(&mut self, ids: &[MessageId]) {
        for topics in self.streams.values_mut() {
            for set in topics.values_mut() {
                for id in ids {
                    set.remove(id);
                }
            }
        }
        for set in self.pms.values_mut().chain(self.huddles.values_mut()) {
            for id in ids {
                set.remove(id);
            }
        }
        for id in ids {
            self.mentions.remove(id);
        }
        self.prune();
    }

    /// Messages marked unread again. The details carry what we need to place
    /// them, since the messages themselves may never have been fetched.
    pub fn mark_unread(
        &mut self,
        ids: &[MessageId],
        details: &std::collections::HashMap<MessageId, MessageDetails>,
        own_user_id: UserId,
    ) {
        for id in ids {
            let Some(detail) = details.get(id) else {
                continue;
            };
            match detail {
                MessageDetails::Stream { stream_id, topic, .. } => {
                    self.topic_mut(*stream_id, topic).insert(*id);
                }
                MessageDetails::Private { user_ids, .. } => match user_ids.as_slice() {
                    [] => {
                        self.pms.entry(own_user_id).or_default().insert(*id);
                    }
                    [user_id] => {
                        self.pms.entry(*user_id).or_default().insert(*id);
                    }
                    _ => {
                        self.huddles
                            .entry(huddle_key(user_ids, own_user_id))
                            .or_default()
                            .insert(*id);
                    }
                },
            }
            if detail.mentioned() {
                self.mentions.insert(*id);
            }
        }
    }

    /// Carry unread stream ids along with a topic/stream move.
    pub fn move_messages(&mut self, ids: &[MessageId], message_move: &MessageMove) {
        let Some(old) = self
            .streams
            .get_mut(&message_move.orig_stream_id)
            .and_then(|topics| topics.get_mut(&message_move.orig_topic))
        else {
            return;
        };
        let moved: Vec<MessageId> = ids.iter().copied().filter(|id| old.remove(id)).collect();
        if moved.is_empty() {
            return;
        }
        self.topic_mut(message_move.new_stream_id, &message_move.new_topic)
            .extend(moved);
        self.prune();
    }

    fn topic_mut(&mut self, stream_id: StreamId, topic: &str) -> &mut IdSet {
        self.streams
            .entry(stream_id)
            .or_default()
            .entry(topic.to_string())
            .or_default()
    }

    fn prune(&mut self) {
        for topics in self.streams.values_mut() {
            topics.retain(|_, ids| !ids.is_empty());
        }
        self.streams.retain(|_, topics| !topics.is_empty());
        self.pms.retain(|_, ids| !ids.is_empty());
        self.huddles.retain(|_, ids| !ids.is_empty());
    }
}
