use std::collections::BTreeMap;

use chatsync_core::models::{MessageId, Narrow, PresenceStatus, StreamId, UserId};
use chatsync_core::store::{self, CaughtUp, FetchStatus};
use chatsync_core::ConversationStore;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub own_user_id: UserId,
    pub stored_messages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrow: Option<NarrowReport>,
    pub unread: UnreadReport,
    pub presence: BTreeMap<UserId, PresenceStatus>,
    pub typing: BTreeMap<String, Vec<UserId>>,
    pub outbox_pending: usize,
    pub consistent: bool,
}

#[derive(Debug, Serialize)]
pub struct NarrowReport {
    pub key: String,
    pub valid: bool,
    pub indexed_ids: Vec<MessageId>,
    pub shown_ids: Vec<MessageId>,
    pub outbox_ids: Vec<MessageId>,
    pub caught_up: CaughtUp,
    pub fetch_status: FetchStatus,
    pub fetch_needed: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadReport {
    pub total: usize,
    pub streams: usize,
    pub pms: usize,
    pub huddles: usize,
    pub mentions: usize,
    pub by_stream: BTreeMap<StreamId, usize>,
}

/// One line of `chatsync narrows`.
#[derive(Debug, Serialize)]
pub struct NarrowListing {
    pub key: String,
    pub count: usize,
    pub caught_up: CaughtUp,
}

pub fn summarize(state: &ConversationStore, narrow: Option<&Narrow>, now: u64) -> Summary {
    let presence = state
        .presence
        .user_ids()
        .map(|user_id| (user_id, store::presence_status_for_user(state, user_id, now)))
        .collect();

    let typing = state
        .typing
        .iter()
        .map(|(key, entry)| (key.to_string(), entry.user_ids.clone()))
        .collect();

    Summary {
        own_user_id: state.own_user_id(),
        stored_messages: state.messages.len(),
        narrow: narrow.map(|narrow| narrow_report(state, narrow)),
        unread: unread_report(state),
        presence,
        typing,
        outbox_pending: state.outbox.items().iter().filter(|o| !o.is_sent).count(),
        consistent: state.check_invariants(),
    }
}

fn narrow_report(state: &ConversationStore, narrow: &Narrow) -> NarrowReport {
    let views = store::messages_for_narrow(state, narrow);
    let outbox_ids = views.iter().filter(|v| v.is_outbox()).map(|v| v.id()).collect();
    let shown_ids = store::shown_messages_for_narrow(state, narrow)
        .iter()
        .map(|v| v.id())
        .collect();

    NarrowReport {
        key: narrow.key(),
        valid: store::is_narrow_valid(state, narrow),
        indexed_ids: state.narrows.ids(narrow).to_vec(),
        shown_ids,
        outbox_ids,
        caught_up: store::caught_up(state, narrow),
        fetch_status: store::fetch_status(state, narrow),
        fetch_needed: store::is_fetch_needed(state, narrow),
    }
}

fn unread_report(state: &ConversationStore) -> UnreadReport {
    let unread = &state.unread;
    UnreadReport {
        total: unread.total(),
        streams: unread.stream_total(),
        pms: unread.pm_total(),
        huddles: unread.huddle_total(),
        mentions: unread.mentions_total(),
        by_stream: unread
            .unread_by_stream(&state.directory, &state.mute)
            .into_iter()
            .collect(),
    }
}

/// Every indexed narrow, sorted by key.
pub fn list_narrows(state: &ConversationStore) -> Vec<NarrowListing> {
    let mut listings: Vec<NarrowListing> = state
        .narrows
        .iter()
        .map(|(key, entry)| NarrowListing {
            key: key.to_string(),
            count: entry.ids.len(),
            caught_up: entry.caught_up,
        })
        .collect();
    listings.sort_by(|a, b| a.key.cmp(&b.key));
    listings
}
