pub mod directory;
pub mod message;
pub mod narrow;
pub mod outbox;
pub mod presence;

pub type MessageId = u64;
pub type UserId = u64;
pub type StreamId = u64;

pub use directory::{MutedUser, Stream, Subscription, User, UserTopic, VisibilityPolicy};
pub use message::{
    Message, MessageEdit, MessageFlag, MessageFlags, Reaction, Recipient, Submessage,
};
pub use narrow::{narrows_for_message, Anchor, Narrow, NarrowParseError};
pub use outbox::Outbox;
pub use presence::{AggregatedPresence, ClientPresence, PresenceStatus};
