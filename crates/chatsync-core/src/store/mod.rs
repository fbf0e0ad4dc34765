pub mod conversation_store;
pub mod directory_store;
pub mod fetching_store;
pub mod message_store;
pub mod mute_store;
pub mod narrow_index;
pub mod outbox_store;
pub mod presence_store;
pub mod typing_store;
pub mod unread_store;
pub mod views;
pub mod visibility;

pub use conversation_store::ConversationStore;
pub use directory_store::DirectoryStore;
pub use fetching_store::{FetchStatus, FetchingStore};
pub use message_store::MessageStore;
pub use mute_store::MuteStore;
pub use narrow_index::{CaughtUp, NarrowIndex, NarrowIndexEntry};
pub use outbox_store::OutboxStore;
pub use presence_store::{aggregate, PresenceStore, UserPresence};
pub use typing_store::{typing_key, TypingEntry, TypingStore};
pub use unread_store::{huddle_key, UnreadStore};
pub use views::{
    caught_up, fetch_status, first_message_id, is_fetch_needed, is_narrow_valid,
    last_message_id, messages_for_narrow, presence_status_for_user, shown_messages_for_narrow,
    typing_users, MessageView,
};
pub use visibility::shown_messages;
