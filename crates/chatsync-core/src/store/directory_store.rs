use crate::models::{Stream, StreamId, Subscription, User, UserId};
use std::collections::HashMap;

/// Sub-store for the realm's streams, our subscriptions, and known users.
pub struct DirectoryStore {
    streams: HashMap<StreamId, Stream>,
    subscriptions: HashMap<StreamId, Subscription>,
    users: HashMap<UserId, User>,
}

impl DirectoryStore {
    pub fn new() -> Self {
        Self {
            streams: HashMap::new(),
            subscriptions: HashMap::new(),
            users: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.streams.clear();
        self.subscriptions.clear();
        self.users.clear();
    }

    // ===== Getters =====

    pub fn stream(&self, stream_id: StreamId) -> Option<&Stream> {
        self.streams.get(&stream_id)
    }

    pub fn subscription(&self, stream_id: StreamId) -> Option<&Subscription> {
        self.subscriptions.get(&stream_id)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.values()
    }

    pub fn user(&self, user_id: UserId) -> Option<&User> {
        self.users.get(&user_id)
    }

    pub fn has_user(&self, user_id: UserId) -> bool {
        self.users.contains_key(&user_id)
    }

    pub fn user_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.users.keys().copied()
    }

    // ===== Mutations =====

    pub fn add_streams(&mut self, streams: impl IntoIterator<Item = Stream>) {
        for stream in streams {
            self.streams.insert(stream.stream_id, stream);
        }
    }

    /// Deleting a stream also drops our subscription to it.
    pub fn remove_streams(&mut self, stream_ids: &[StreamId]) {
        for stream_id in stream_ids {
            self.streams.remove(stream_id);
            self.subscriptions.remove(stream_id);
        }
    }

    pub fn add_subscriptions(&mut self, subscriptions: impl IntoIterator<Item = Subscription>) {
        for subscription in subscriptions {
            self.subscriptions.insert(subscription.stream_id, subscription);
        }
    }

    pub fn remove_subscriptions(&mut self, stream_ids: &[StreamId]) {
        for stream_id in stream_ids {
            self.subscriptions.remove(stream_id);
        }
    }

    pub fn set_in_home_view(&mut self, stream_id: StreamId, in_home_view: bool) {
        if let Some(subscription) = self.subscriptions.get_mut(&stream_id) {
            subscription.in_home_view = in_home_view;
        }
    }

    pub fn add_users(&mut self, users: impl IntoIterator<Item = User>) {
        for user in users {
            self.users.insert(user.user_id, user);
        }
    }

    pub fn remove_user(&mut self, user_id: UserId) {
        self.users.remove(&user_id);
    }
}
