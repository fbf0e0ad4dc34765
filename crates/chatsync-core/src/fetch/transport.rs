use crate::error::FetchError;
use crate::models::{Anchor, Message, Narrow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub narrow: Narrow,
    pub anchor: Anchor,
    pub num_before: u32,
    pub num_after: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchResponse {
    pub messages: Vec<Message>,
    pub found_newest: bool,
    pub found_oldest: bool,
}

/// The network side of history fetches. Implementations classify failures
/// into [`FetchError`] so the retry loop can tell transient from fatal.
#[async_trait::async_trait]
pub trait MessageTransport: Send + Sync {
    async fn fetch_messages(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}
