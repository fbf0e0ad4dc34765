use crate::models::{MutedUser, StreamId, Subscription, UserId, UserTopic, VisibilityPolicy};
use std::collections::HashMap;

/// Sub-store for the mute model: per-topic visibility policies and muted users.
pub struct MuteStore {
    topics: HashMap<(StreamId, String), VisibilityPolicy>,
    muted_users: HashMap<UserId, u64>,
}

impl MuteStore {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
            muted_users: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.topics.clear();
        self.muted_users.clear();
    }

    // ===== Query Methods =====

    pub fn policy(&self, stream_id: StreamId, topic: &str) -> VisibilityPolicy {
        self.topics
            .get(&(stream_id, topic.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Visibility when the stream itself is already being viewed: only an
    /// explicit topic mute hides it.
    pub fn is_topic_visible_in_stream(&self, stream_id: StreamId, topic: &str) -> bool {
        self.policy(stream_id, topic) != VisibilityPolicy::Muted
    }

    /// Visibility in interleaved views. A topic policy wins over the
    /// stream's own mute setting.
    pub fn is_topic_visible(&self, stream_id: StreamId, topic: &str, subscription: &Subscription) -> bool {
        match self.policy(stream_id, topic) {
            VisibilityPolicy::Muted => false,
            VisibilityPolicy::Unmuted | VisibilityPolicy::Followed => true,
            VisibilityPolicy::None => subscription.in_home_view,
        }
    }

    pub fn is_user_muted(&self, user_id: UserId) -> bool {
        self.muted_users.contains_key(&user_id)
    }

    pub fn muted_user_count(&self) -> usize {
        self.muted_users.len()
    }

    // ===== Mutations =====

    pub fn set_user_topic(&mut self, user_topic: &UserTopic) {
        let key = (user_topic.stream_id, user_topic.topic_name.clone());
        if user_topic.visibility_policy == VisibilityPolicy::None {
            self.topics.remove(&key);
        } else {
            self.topics.insert(key, user_topic.visibility_policy);
        }
    }

    /// The server always sends the complete list.
    pub fn set_muted_users(&mut self, muted_users: &[MutedUser]) {
        self.muted_users = muted_users.iter().map(|m| (m.id, m.timestamp)).collect();
    }
}
