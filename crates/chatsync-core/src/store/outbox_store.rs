use crate::models::{MessageId, Outbox};

/// Sub-store for locally composed messages awaiting server confirmation,
/// kept sorted by local id.
pub struct OutboxStore {
    items: Vec<Outbox>,
}

impl OutboxStore {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    // ===== Getters =====

    pub fn items(&self) -> &[Outbox] {
        &self.items
    }

    pub fn get(&self, local_id: MessageId) -> Option<&Outbox> {
        self.items.iter().find(|o| o.local_id == local_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // ===== Mutations =====

    pub fn add(&mut self, outbox: Outbox) {
        if let Err(pos) = self
            .items
            .binary_search_by_key(&outbox.local_id, |o| o.local_id)
        {
            self.items.insert(pos, outbox);
        }
    }

    pub fn mark_sent(&mut self, local_id: MessageId) {
        if let Some(outbox) = self.items.iter_mut().find(|o| o.local_id == local_id) {
            outbox.is_sent = true;
        }
    }

    pub fn remove(&mut self, local_id: MessageId) {
        self.items.retain(|o| o.local_id != local_id);
    }

    /// Sent entries whose echo we missed won't arrive on a fresh event
    /// queue; unsent ones are still waiting to go out.
    pub fn drop_sent(&mut self) {
        self.items.retain(|o| !o.is_sent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recipient;

    fn make_test_outbox(local_id: MessageId) -> Outbox {
        Outbox {
            local_id,
            sender_id: 1,
            recipient: Recipient::Private {
                recipient_ids: vec![1, 4],
            },
            content: "hello".into(),
            timestamp: local_id / 1000,
            is_sent: false,
        }
    }

    #[test]
    fn test_add_dedupes_and_sorts() {
        let mut outbox = OutboxStore::new();
        outbox.add(make_test_outbox(2_000));
        outbox.add(make_test_outbox(1_000));
        outbox.add(make_test_outbox(2_000));
        let ids: Vec<_> = outbox.items().iter().map(|o| o.local_id).collect();
        assert_eq!(ids, vec![1_000, 2_000]);
    }

    #[test]
    fn test_drop_sent_keeps_pending() {
        let mut outbox = OutboxStore::new();
        outbox.add(make_test_outbox(1_000));
        outbox.add(make_test_outbox(2_000));
        outbox.mark_sent(1_000);
        outbox.drop_sent();
        assert!(outbox.get(1_000).is_none());
        assert!(outbox.get(2_000).is_some());

        outbox.remove(2_000);
        assert!(outbox.is_empty());
    }
}
