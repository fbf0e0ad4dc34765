use crate::error::report_invariant_violation;
use crate::models::{Message, MessageFlags, MessageId, Narrow, Outbox, PresenceStatus, Recipient, UserId};
use crate::store::typing_store::typing_key;
use crate::store::visibility::shown_messages;
use crate::store::{CaughtUp, ConversationStore, FetchStatus};

/// A row of a message list: either a server-confirmed message or a local
/// outbox entry still waiting for its echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageView<'a> {
    Fetched(&'a Message),
    Outbox(&'a Outbox),
}

impl<'a> MessageView<'a> {
    pub fn id(&self) -> MessageId {
        match self {
            MessageView::Fetched(message) => message.id,
            MessageView::Outbox(outbox) => outbox.local_id,
        }
    }

    pub fn recipient(&self) -> &'a Recipient {
        match self {
            MessageView::Fetched(message) => &message.recipient,
            MessageView::Outbox(outbox) => &outbox.recipient,
        }
    }

    pub fn content(&self) -> &'a str {
        match self {
            MessageView::Fetched(message) => &message.content,
            MessageView::Outbox(outbox) => &outbox.content,
        }
    }

    /// Outbox entries carry no flags, so they never count as mentions.
    pub fn is_mentioned(&self) -> bool {
        match self {
            MessageView::Fetched(message) => message.flags.is_mentioned(),
            MessageView::Outbox(_) => false,
        }
    }

    pub fn is_outbox(&self) -> bool {
        matches!(self, MessageView::Outbox(_))
    }
}

/// Every message in the narrow, oldest first. Outbox entries are appended
/// only when the narrow is caught up to the live edge, since otherwise
/// they would sit after a gap.
pub fn messages_for_narrow<'a>(store: &'a ConversationStore, narrow: &Narrow) -> Vec<MessageView<'a>> {
    let mut views: Vec<MessageView<'a>> = store
        .narrows
        .ids(narrow)
        .iter()
        .filter_map(|id| match store.messages.get(*id) {
            Some(message) => Some(MessageView::Fetched(message)),
            None => {
                report_invariant_violation(&format!(
                    "{} narrow indexes message {} with no stored record",
                    narrow.redacted(),
                    id
                ));
                None
            }
        })
        .collect();

    if store.narrows.caught_up(narrow).newer {
        let own_user_id = store.own_user_id();
        let no_flags = MessageFlags::new();
        views.extend(
            store
                .outbox
                .items()
                .iter()
                .filter(|o| narrow.contains(&o.recipient, &no_flags, own_user_id))
                .map(MessageView::Outbox),
        );
        views.sort_by_key(|v| v.id());
    }
    views
}

/// [`messages_for_narrow`] with the mute-aware visibility filter applied.
pub fn shown_messages_for_narrow<'a>(store: &'a ConversationStore, narrow: &Narrow) -> Vec<MessageView<'a>> {
    shown_messages(
        narrow,
        messages_for_narrow(store, narrow),
        &store.directory,
        &store.mute,
    )
}

pub fn first_message_id(store: &ConversationStore, narrow: &Narrow) -> Option<MessageId> {
    store.narrows.ids(narrow).first().copied()
}

pub fn last_message_id(store: &ConversationStore, narrow: &Narrow) -> Option<MessageId> {
    store.narrows.ids(narrow).last().copied()
}

pub fn caught_up(store: &ConversationStore, narrow: &Narrow) -> CaughtUp {
    store.narrows.caught_up(narrow)
}

pub fn fetch_status(store: &ConversationStore, narrow: &Narrow) -> FetchStatus {
    store.fetching.status(narrow)
}

/// Whether a fetch for this narrow could return anything new. Advisory:
/// nothing stops a caller from fetching anyway.
pub fn is_fetch_needed(store: &ConversationStore, narrow: &Narrow) -> bool {
    !store.narrows.caught_up(narrow).is_complete()
}

/// False when the narrow points at a stream that no longer exists or at a
/// user we don't know.
pub fn is_narrow_valid(store: &ConversationStore, narrow: &Narrow) -> bool {
    match narrow {
        Narrow::Stream(stream_id) | Narrow::Topic(stream_id, _) => {
            store.directory.stream(*stream_id).is_some()
        }
        Narrow::Pm(user_ids) => user_ids
            .iter()
            .all(|id| *id == store.own_user_id() || store.directory.has_user(*id)),
        Narrow::Home | Narrow::Starred | Narrow::Mentioned | Narrow::AllPrivate | Narrow::Search(_) => true,
    }
}

pub fn presence_status_for_user(store: &ConversationStore, user_id: UserId, now: u64) -> PresenceStatus {
    store.presence.status_for_user(user_id, now)
}

/// Who is typing in the conversation with these participants.
pub fn typing_users(store: &ConversationStore, recipient_ids: &[UserId]) -> Vec<UserId> {
    let key = typing_key(recipient_ids, store.own_user_id());
    store.typing.typing_users(&key).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::events::{FetchCompleteEvent, IngestEvent};
    use crate::models::{Anchor, Stream, Subscription, User};

    const OWN: UserId = 1;

    fn make_test_store() -> ConversationStore {
        ConversationStore::new(OWN, &CoreConfig::default())
    }

    fn make_test_pm(id: MessageId, other: UserId) -> Message {
        Message {
            id,
            timestamp: id,
            sender_id: other,
            content: format!("pm {}", id),
            recipient: Recipient::Private {
                recipient_ids: vec![OWN, other],
            },
            flags: MessageFlags::new(),
            reactions: vec![],
            submessages: vec![],
            edit_history: None,
            last_edit_timestamp: None,
        }
    }

    fn make_test_stream_message(id: MessageId, stream_id: u64) -> Message {
        let mut message = make_test_pm(id, 5);
        message.recipient = Recipient::Stream {
            stream_id,
            stream_name: "general".into(),
            topic: "t".into(),
        };
        message
    }

    fn make_test_outbox(local_id: MessageId, other: UserId) -> Outbox {
        Outbox {
            local_id,
            sender_id: OWN,
            recipient: Recipient::Private {
                recipient_ids: vec![OWN, other],
            },
            content: "sending".into(),
            timestamp: local_id / 1000,
            is_sent: false,
        }
    }

    fn fetch(store: &mut ConversationStore, narrow: Narrow, messages: Vec<Message>, found_newest: bool) {
        store.apply(&IngestEvent::FetchComplete(FetchCompleteEvent {
            narrow,
            messages,
            anchor: Anchor::FirstUnread,
            num_before: 50,
            num_after: 50,
            found_newest,
            found_oldest: false,
        }));
    }

    #[test]
    fn test_outbox_merged_only_when_caught_up() {
        let mut store = make_test_store();
        store.apply(&IngestEvent::MessageSendStart {
            outbox: make_test_outbox(1_700_000_000_000, 4),
        });

        let narrow = Narrow::pm([4]);
        fetch(&mut store, narrow.clone(), vec![make_test_pm(10, 4)], false);
        let ids: Vec<_> = messages_for_narrow(&store, &narrow).iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![10]);

        fetch(&mut store, narrow.clone(), vec![make_test_pm(11, 4)], true);
        let views = messages_for_narrow(&store, &narrow);
        let ids: Vec<_> = views.iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![10, 11, 1_700_000_000_000]);
        assert!(views[2].is_outbox());

        // A different conversation doesn't see it.
        fetch(&mut store, Narrow::pm([6]), vec![], true);
        assert!(messages_for_narrow(&store, &Narrow::pm([6])).is_empty());
    }

    #[test]
    fn test_search_narrow_never_shows_outbox() {
        let mut store = make_test_store();
        store.apply(&IngestEvent::MessageSendStart {
            outbox: make_test_outbox(1_700_000_000_000, 4),
        });
        let narrow = Narrow::Search("sending".into());
        fetch(&mut store, narrow.clone(), vec![], true);
        assert!(messages_for_narrow(&store, &narrow).is_empty());
    }

    #[test]
    fn test_first_and_last_message_id() {
        let mut store = make_test_store();
        assert_eq!(first_message_id(&store, &Narrow::Home), None);
        fetch(
            &mut store,
            Narrow::Home,
            vec![make_test_pm(5, 4), make_test_pm(3, 4), make_test_pm(8, 4)],
            false,
        );
        assert_eq!(first_message_id(&store, &Narrow::Home), Some(3));
        assert_eq!(last_message_id(&store, &Narrow::Home), Some(8));
        assert!(is_fetch_needed(&store, &Narrow::Home));
    }

    #[test]
    fn test_shown_messages_for_home() {
        let mut store = make_test_store();
        store.apply(&IngestEvent::SubscriptionAdd {
            subscriptions: vec![Subscription {
                stream_id: 3,
                name: "general".into(),
                in_home_view: true,
            }],
        });
        fetch(
            &mut store,
            Narrow::Home,
            vec![
                make_test_stream_message(1, 3),
                make_test_stream_message(2, 9),
                make_test_pm(3, 4),
            ],
            true,
        );
        let ids: Vec<_> = shown_messages_for_narrow(&store, &Narrow::Home)
            .iter()
            .map(|v| v.id())
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(messages_for_narrow(&store, &Narrow::Home).len(), 3);
    }

    #[test]
    fn test_is_narrow_valid() {
        let mut store = make_test_store();
        store.apply(&IngestEvent::StreamCreate {
            streams: vec![Stream {
                stream_id: 3,
                name: "general".into(),
                invite_only: false,
            }],
        });
        store.apply(&IngestEvent::RealmUserAdd {
            user: User {
                user_id: 4,
                full_name: "Dana".into(),
                email: String::new(),
            },
        });

        assert!(is_narrow_valid(&store, &Narrow::Stream(3)));
        assert!(is_narrow_valid(&store, &Narrow::topic(3, "x")));
        assert!(!is_narrow_valid(&store, &Narrow::Stream(4)));
        assert!(is_narrow_valid(&store, &Narrow::pm([4])));
        assert!(is_narrow_valid(&store, &Narrow::pm([OWN])));
        assert!(!is_narrow_valid(&store, &Narrow::pm([4, 7])));
        assert!(is_narrow_valid(&store, &Narrow::Search("x".into())));

        store.apply(&IngestEvent::StreamDelete { stream_ids: vec![3] });
        assert!(!is_narrow_valid(&store, &Narrow::Stream(3)));
    }

    #[test]
    fn test_typing_users_by_participants() {
        let mut store = make_test_store();
        store.apply(&IngestEvent::TypingStart {
            sender_id: 4,
            recipient_ids: vec![4, OWN, 6],
            time: 1,
        });
        assert_eq!(typing_users(&store, &[OWN, 6, 4]), vec![4]);
        assert!(typing_users(&store, &[OWN, 4]).is_empty());
    }
}
