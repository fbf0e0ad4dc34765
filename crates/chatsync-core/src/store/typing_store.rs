use crate::models::UserId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Conversation key for typing notifications: sorted, comma-joined ids of
/// the participants other than the own user.
pub fn typing_key(recipient_ids: &[UserId], own_user_id: UserId) -> String {
    let ids: BTreeSet<UserId> = recipient_ids
        .iter()
        .copied()
        .filter(|id| *id != own_user_id)
        .collect();
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypingEntry {
    /// In the order they started typing.
    pub user_ids: Vec<UserId>,
    /// Milliseconds of the latest start.
    pub time: u64,
}

/// Sub-store for who is currently typing in each conversation.
pub struct TypingStore {
    entries: BTreeMap<String, TypingEntry>,
}

impl TypingStore {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // ===== Getters =====

    pub fn typing_users(&self, key: &str) -> &[UserId] {
        self.entries
            .get(key)
            .map(|e| e.user_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypingEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys not refreshed within `expiry_ms` of `now_ms`.
    pub fn stale_keys(&self, now_ms: u64, expiry_ms: u64) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| now_ms.saturating_sub(entry.time) >= expiry_ms)
            .map(|(key, _)| key.clone())
            .collect()
    }

    // ===== Event Handlers =====

    pub fn start(&mut self, key: String, user_id: UserId, time: u64) {
        let entry = self.entries.entry(key).or_insert_with(|| TypingEntry {
            user_ids: Vec::new(),
            time,
        });
        if !entry.user_ids.contains(&user_id) {
            entry.user_ids.push(user_id);
        }
        entry.time = time;
    }

    pub fn stop(&mut self, key: &str, user_id: UserId) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.user_ids.retain(|id| *id != user_id);
        if entry.user_ids.is_empty() {
            self.entries.remove(key);
        }
    }

    pub fn clear_keys(&mut self, keys: &[String]) {
        for key in keys {
            self.entries.remove(key);
        }
    }
}
