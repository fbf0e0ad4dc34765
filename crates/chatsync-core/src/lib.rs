pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod fetch;
pub mod models;
pub mod runtime;
pub mod store;
pub mod tracing_setup;

pub use config::{ConfigError, CoreConfig};
pub use error::{report_invariant_violation, FetchError};
pub use events::IngestEvent;
pub use fetch::{FetchCoordinator, FetchRequest, FetchResponse, MessageTransport};
pub use runtime::{CoreHandle, CoreRuntime, SharedStore};
pub use store::{ConversationStore, MessageView};
