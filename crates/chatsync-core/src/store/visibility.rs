use crate::models::{Narrow, Recipient};
use crate::store::views::MessageView;
use crate::store::{DirectoryStore, MuteStore};

/// The subset of a narrow's messages that should actually be displayed,
/// once stream and topic muting are taken into account.
///
/// Only the interleaved `home` view and the whole-`stream` view filter
/// anything. A message that mentions the user is always shown.
pub fn shown_messages<'a>(
    narrow: &Narrow,
    messages: Vec<MessageView<'a>>,
    directory: &DirectoryStore,
    mute: &MuteStore,
) -> Vec<MessageView<'a>> {
    match narrow {
        Narrow::Home | Narrow::Stream(_) => messages
            .into_iter()
            .filter(|view| is_shown(narrow, view, directory, mute))
            .collect(),
        Narrow::Topic(..)
        | Narrow::Pm(_)
        | Narrow::Starred
        | Narrow::Mentioned
        | Narrow::AllPrivate
        | Narrow::Search(_) => messages,
    }
}

fn is_shown(narrow: &Narrow, view: &MessageView<'_>, directory: &DirectoryStore, mute: &MuteStore) -> bool {
    let Recipient::Stream {
        stream_id, topic, ..
    } = view.recipient()
    else {
        return true;
    };
    if view.is_mentioned() {
        return true;
    }
    match narrow {
        Narrow::Home => match directory.subscription(*stream_id) {
            Some(subscription) => mute.is_topic_visible(*stream_id, topic, subscription),
            None => false,
        },
        _ => mute.is_topic_visible_in_stream(*stream_id, topic),
    }
}
