use crate::events::FetchCompleteEvent;
use crate::models::{MessageId, Narrow};
use serde::Serialize;
use std::collections::HashMap;

/// Whether the index is known to hold every matching message in a direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaughtUp {
    pub older: bool,
    pub newer: bool,
}

impl CaughtUp {
    pub fn is_complete(&self) -> bool {
        self.older && self.newer
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrowIndexEntry {
    /// Strictly ascending.
    pub ids: Vec<MessageId>,
    pub caught_up: CaughtUp,
}

impl NarrowIndexEntry {
    fn insert(&mut self, id: MessageId) {
        if let Err(pos) = self.ids.binary_search(&id) {
            self.ids.insert(pos, id);
        }
    }

    fn merge(&mut self, ids: impl IntoIterator<Item = MessageId>) {
        self.ids.extend(ids);
        self.ids.sort_unstable();
        self.ids.dedup();
    }

    fn remove(&mut self, id: MessageId) {
        if let Ok(pos) = self.ids.binary_search(&id) {
            self.ids.remove(pos);
        }
    }
}

/// Sub-store mapping narrow keys to their ordered message ids.
///
/// Keyed by [`Narrow::key`] so that equal views always share one entry.
pub struct NarrowIndex {
    entries: HashMap<String, NarrowIndexEntry>,
}

impl NarrowIndex {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // ===== Getters =====

    pub fn get(&self, narrow: &Narrow) -> Option<&NarrowIndexEntry> {
        self.entries.get(&narrow.key())
    }

    pub fn ids(&self, narrow: &Narrow) -> &[MessageId] {
        self.get(narrow).map(|e| e.ids.as_slice()).unwrap_or(&[])
    }

    pub fn caught_up(&self, narrow: &Narrow) -> CaughtUp {
        self.get(narrow).map(|e| e.caught_up).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NarrowIndexEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ===== Event Handlers =====

    pub fn fetch_start(&mut self, narrow: &Narrow) {
        self.entries.entry(narrow.key()).or_default();
    }

    /// Roll the narrow back to the unfetched default. An entry that only
    /// existed because of the failed fetch disappears entirely.
    pub fn fetch_error(&mut self, narrow: &Narrow) {
        let key = narrow.key();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.caught_up = CaughtUp::default();
            if entry.ids.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    pub fn fetch_complete(&mut self, event: &FetchCompleteEvent) {
        let entry = self.entries.entry(event.narrow.key()).or_default();
        entry.merge(event.messages.iter().map(|m| m.id));
        if event.num_before > 0 {
            entry.caught_up.older = event.found_oldest;
        }
        if event.num_after > 0 {
            entry.caught_up.newer = event.found_newest;
        }
    }

    /// The subset of `narrows` whose entries are caught up on the newer edge,
    /// i.e. the ones a live message may be appended to without inventing a
    /// gap-free history.
    pub fn caught_up_newer<'a>(&self, narrows: &'a [Narrow]) -> Vec<&'a Narrow> {
        narrows
            .iter()
            .filter(|n| self.caught_up(n).newer)
            .collect()
    }

    /// Insert `id` into an existing entry. Returns false if the narrow has no
    /// entry.
    pub fn insert_into_existing(&mut self, narrow: &Narrow, id: MessageId) -> bool {
        match self.entries.get_mut(&narrow.key()) {
            Some(entry) => {
                entry.insert(id);
                true
            }
            None => false,
        }
    }

    pub fn merge_into_existing(&mut self, narrow: &Narrow, ids: &[MessageId]) {
        if let Some(entry) = self.entries.get_mut(&narrow.key()) {
            entry.merge(ids.iter().copied());
        }
    }

    pub fn remove_from(&mut self, narrow: &Narrow, ids: &[MessageId]) {
        if let Some(entry) = self.entries.get_mut(&narrow.key()) {
            for id in ids {
                entry.remove(*id);
            }
        }
    }

    /// Remove ids from every narrow.
    pub fn delete(&mut self, ids: &[MessageId]) {
        for entry in self.entries.values_mut() {
            entry.ids.retain(|id| !ids.contains(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Anchor, Message, MessageFlags, Recipient};

    fn make_test_message(id: MessageId) -> Message {
        Message {
            id,
            timestamp: id,
            sender_id: 2,
            content: String::new(),
            recipient: Recipient::Stream {
                stream_id: 3,
                stream_name: "general".into(),
                topic: "t".into(),
            },
            flags: MessageFlags::new(),
            reactions: vec![],
            submessages: vec![],
            edit_history: None,
            last_edit_timestamp: None,
        }
    }

    fn make_test_fetch(
        narrow: Narrow,
        ids: &[MessageId],
        num_before: u32,
        num_after: u32,
        found_oldest: bool,
        found_newest: bool,
    ) -> FetchCompleteEvent {
        FetchCompleteEvent {
            narrow,
            messages: ids.iter().map(|id| make_test_message(*id)).collect(),
            anchor: Anchor::FirstUnread,
            num_before,
            num_after,
            found_newest,
            found_oldest,
        }
    }

    #[test]
    fn test_fetch_complete_merges_sorted_and_deduped() {
        let mut index = NarrowIndex::new();
        index.fetch_complete(&make_test_fetch(Narrow::Home, &[5, 3, 9], 50, 50, false, false));
        index.fetch_complete(&make_test_fetch(Narrow::Home, &[1, 5, 7], 50, 0, true, true));
        assert_eq!(index.ids(&Narrow::Home), &[1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_caught_up_only_set_for_requested_directions() {
        let mut index = NarrowIndex::new();
        index.fetch_complete(&make_test_fetch(Narrow::Home, &[1], 0, 50, true, true));
        assert_eq!(
            index.caught_up(&Narrow::Home),
            CaughtUp {
                older: false,
                newer: true
            }
        );
        index.fetch_complete(&make_test_fetch(Narrow::Home, &[], 50, 0, true, false));
        assert!(index.caught_up(&Narrow::Home).is_complete());
    }

    #[test]
    fn test_fetch_error_restores_initial_state() {
        let mut index = NarrowIndex::new();
        let narrow = Narrow::Stream(3);
        index.fetch_start(&narrow);
        assert!(index.get(&narrow).is_some());
        index.fetch_error(&narrow);
        assert!(index.get(&narrow).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_fetch_error_keeps_ids_but_resets_caught_up() {
        let mut index = NarrowIndex::new();
        let narrow = Narrow::Stream(3);
        index.fetch_complete(&make_test_fetch(narrow.clone(), &[4, 6], 50, 50, true, true));
        index.fetch_start(&narrow);
        index.fetch_error(&narrow);
        assert_eq!(index.ids(&narrow), &[4, 6]);
        assert_eq!(index.caught_up(&narrow), CaughtUp::default());
    }

    #[test]
    fn test_caught_up_newer_filters_targets() {
        let mut index = NarrowIndex::new();
        index.fetch_complete(&make_test_fetch(Narrow::Home, &[1], 0, 50, false, true));
        index.fetch_complete(&make_test_fetch(Narrow::Stream(3), &[1], 0, 50, false, false));
        let narrows = vec![Narrow::Home, Narrow::Stream(3), Narrow::topic(3, "t")];
        assert_eq!(index.caught_up_newer(&narrows), vec![&Narrow::Home]);
    }

    #[test]
    fn test_delete_and_remove_from() {
        let mut index = NarrowIndex::new();
        index.fetch_complete(&make_test_fetch(Narrow::Home, &[1, 2, 3], 50, 50, true, true));
        index.fetch_complete(&make_test_fetch(Narrow::Stream(3), &[2, 3], 50, 50, true, true));
        index.delete(&[2]);
        assert_eq!(index.ids(&Narrow::Home), &[1, 3]);
        assert_eq!(index.ids(&Narrow::Stream(3)), &[3]);

        index.remove_from(&Narrow::Home, &[3]);
        assert_eq!(index.ids(&Narrow::Home), &[1]);
        assert!(!index.insert_into_existing(&Narrow::Starred, 1));
        assert!(index.insert_into_existing(&Narrow::Home, 0));
        assert_eq!(index.ids(&Narrow::Home), &[0, 1]);
    }
}
