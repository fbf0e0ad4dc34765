pub mod backoff;
pub mod coordinator;
pub mod retry;
pub mod transport;

pub use backoff::BackoffMachine;
pub use coordinator::FetchCoordinator;
pub use retry::try_fetch;
pub use transport::{FetchRequest, FetchResponse, MessageTransport};
