use crate::config::CoreConfig;
use crate::error::FetchError;
use crate::events::{FetchCompleteEvent, IngestEvent};
use crate::fetch::{try_fetch, FetchRequest, FetchResponse, MessageTransport};
use crate::models::{Anchor, Narrow};
use crate::runtime::SharedStore;
use crate::store::{self, FetchStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Issues history fetches and feeds their outcome back into the store as
/// fetch-start / fetch-complete / fetch-error events.
///
/// Fetches for different narrows may run concurrently. Nothing here stops two
/// overlapping fetches of the same narrow; callers use
/// [`FetchCoordinator::fetch_messages_in_narrow`] to skip redundant ones.
#[derive(Clone)]
pub struct FetchCoordinator {
    store: SharedStore,
    transport: Arc<dyn MessageTransport>,
    config: CoreConfig,
    shutdown: CancellationToken,
}

impl FetchCoordinator {
    pub fn new(store: SharedStore, transport: Arc<dyn MessageTransport>, config: CoreConfig) -> Self {
        Self {
            store,
            transport,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Tie in-flight retry loops to an outer shutdown signal.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn fetch_messages(
        &self,
        narrow: Narrow,
        anchor: Anchor,
        num_before: u32,
        num_after: u32,
    ) -> Result<FetchResponse, FetchError> {
        self.store.lock().apply(&IngestEvent::FetchStart {
            narrow: narrow.clone(),
            num_before,
            num_after,
        });

        let request = FetchRequest {
            narrow: narrow.clone(),
            anchor,
            num_before,
            num_after,
        };
        let transport = Arc::clone(&self.transport);
        let result = try_fetch(
            move || {
                let transport = Arc::clone(&transport);
                let request = request.clone();
                async move { transport.fetch_messages(&request).await }
            },
            true,
            &self.config,
            self.shutdown.child_token(),
        )
        .await;

        match result {
            Ok(response) => {
                debug!(
                    narrow = narrow.redacted(),
                    count = response.messages.len(),
                    found_oldest = response.found_oldest,
                    found_newest = response.found_newest,
                    "Message fetch complete"
                );
                self.store
                    .lock()
                    .apply(&IngestEvent::FetchComplete(FetchCompleteEvent {
                        narrow,
                        messages: response.messages.clone(),
                        anchor,
                        num_before,
                        num_after,
                        found_newest: response.found_newest,
                        found_oldest: response.found_oldest,
                    }));
                Ok(response)
            }
            Err(error) => {
                warn!(narrow = narrow.redacted(), error = %error, "Message fetch failed");
                self.store.lock().apply(&IngestEvent::FetchError { narrow });
                Err(error)
            }
        }
    }

    /// Fetch a page centered on `anchor`, unless the narrow is already fully
    /// caught up. Returns `Ok(None)` when the fetch was skipped.
    pub async fn fetch_messages_in_narrow(
        &self,
        narrow: Narrow,
        anchor: Anchor,
    ) -> Result<Option<FetchResponse>, FetchError> {
        if !store::is_fetch_needed(&self.store.lock(), &narrow) {
            debug!(narrow = narrow.redacted(), "Narrow already caught up, skipping fetch");
            return Ok(None);
        }
        let half = self.config.half_page();
        self.fetch_messages(narrow, anchor, half, half).await.map(Some)
    }

    /// Extend the narrow backwards from its oldest indexed message.
    pub async fn fetch_older(&self, narrow: Narrow) -> Result<Option<FetchResponse>, FetchError> {
        let anchor = {
            let state = self.store.lock();
            let first = store::first_message_id(&state, &narrow);
            let blocked = store::caught_up(&state, &narrow).older
                || store::fetch_status(&state, &narrow).is_fetching_older();
            match first {
                Some(id) if !blocked => id,
                _ => return Ok(None),
            }
        };
        self.fetch_messages(narrow, Anchor::Message(anchor), self.config.messages_per_request, 0)
            .await
            .map(Some)
    }

    /// Extend the narrow forwards from its newest indexed message.
    pub async fn fetch_newer(&self, narrow: Narrow) -> Result<Option<FetchResponse>, FetchError> {
        let anchor = {
            let state = self.store.lock();
            let last = store::last_message_id(&state, &narrow);
            let blocked = store::caught_up(&state, &narrow).newer
                || store::fetch_status(&state, &narrow).is_fetching_newer();
            match last {
                Some(id) if !blocked => id,
                _ => return Ok(None),
            }
        };
        self.fetch_messages(narrow, Anchor::Message(anchor), 0, self.config.messages_per_request)
            .await
            .map(Some)
    }

    pub fn fetch_status(&self, narrow: &Narrow) -> FetchStatus {
        store::fetch_status(&self.store.lock(), narrow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, MessageFlags, MessageId, Recipient};
    use crate::store::{CaughtUp, ConversationStore};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<FetchResponse, FetchError>>>,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<FetchResponse, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl MessageTransport for ScriptedTransport {
        async fn fetch_messages(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            self.requests.lock().push(request.clone());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Network("script exhausted".into())))
        }
    }

    fn make_test_message(id: MessageId) -> Message {
        Message {
            id,
            timestamp: id,
            sender_id: 5,
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

    fn make_test_coordinator(transport: Arc<ScriptedTransport>) -> (FetchCoordinator, SharedStore) {
        let config = CoreConfig::default();
        let store: SharedStore = Arc::new(Mutex::new(ConversationStore::new(1, &config)));
        (FetchCoordinator::new(store.clone(), transport, config), store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_fetch_updates_store() {
        let transport = ScriptedTransport::new(vec![Ok(FetchResponse {
            messages: vec![make_test_message(3), make_test_message(4)],
            found_newest: true,
            found_oldest: false,
        })]);
        let (coordinator, store) = make_test_coordinator(transport.clone());

        let response = coordinator
            .fetch_messages_in_narrow(Narrow::Stream(3), Anchor::FirstUnread)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.messages.len(), 2);

        let request = &transport.requests()[0];
        assert_eq!((request.num_before, request.num_after), (50, 50));

        let store = store.lock();
        assert_eq!(store.narrows.ids(&Narrow::Stream(3)), &[3, 4]);
        assert_eq!(
            store.narrows.caught_up(&Narrow::Stream(3)),
            CaughtUp {
                older: false,
                newer: true
            }
        );
        assert_eq!(
            store.fetching.status(&Narrow::Stream(3)),
            FetchStatus::Fetching {
                older: false,
                newer: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_rolls_back() {
        let transport = ScriptedTransport::new(vec![Err(FetchError::from_status(
            400,
            "BAD_NARROW",
            "Invalid narrow",
        ))]);
        let (coordinator, store) = make_test_coordinator(transport.clone());

        let result = coordinator
            .fetch_messages(Narrow::topic(3, "t"), Anchor::LastMessage, 50, 0)
            .await;
        assert!(matches!(result, Err(FetchError::Api { status: 400, .. })));
        assert_eq!(transport.requests().len(), 1);

        let store = store.lock();
        assert!(store.narrows.is_empty());
        assert_eq!(store.fetching.status(&Narrow::topic(3, "t")), FetchStatus::Unfetched);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(FetchError::Server5xx { status: 502 }),
            Ok(FetchResponse {
                messages: vec![make_test_message(9)],
                found_newest: true,
                found_oldest: true,
            }),
        ]);
        let (coordinator, store) = make_test_coordinator(transport.clone());
        coordinator
            .fetch_messages(Narrow::Home, Anchor::LastMessage, 50, 50)
            .await
            .unwrap();
        assert_eq!(transport.requests().len(), 2);
        assert!(store.lock().narrows.caught_up(&Narrow::Home).is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_caught_up_narrow_is_skipped() {
        let transport = ScriptedTransport::new(vec![Ok(FetchResponse {
            messages: vec![make_test_message(1)],
            found_newest: true,
            found_oldest: true,
        })]);
        let (coordinator, _store) = make_test_coordinator(transport.clone());

        let first = coordinator
            .fetch_messages_in_narrow(Narrow::Home, Anchor::FirstUnread)
            .await
            .unwrap();
        assert!(first.is_some());
        let second = coordinator
            .fetch_messages_in_narrow(Narrow::Home, Anchor::FirstUnread)
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_older_anchors_on_first_message() {
        let transport = ScriptedTransport::new(vec![
            Ok(FetchResponse {
                messages: vec![make_test_message(40), make_test_message(41)],
                found_newest: true,
                found_oldest: false,
            }),
            Ok(FetchResponse {
                messages: vec![make_test_message(10)],
                found_newest: false,
                found_oldest: true,
            }),
        ]);
        let (coordinator, store) = make_test_coordinator(transport.clone());

        assert!(coordinator.fetch_older(Narrow::Home).await.unwrap().is_none());
        coordinator
            .fetch_messages_in_narrow(Narrow::Home, Anchor::LastMessage)
            .await
            .unwrap();
        assert!(coordinator.fetch_newer(Narrow::Home).await.unwrap().is_none());
        coordinator.fetch_older(Narrow::Home).await.unwrap();

        let request = &transport.requests()[1];
        assert_eq!(request.anchor, Anchor::Message(40));
        assert_eq!((request.num_before, request.num_after), (100, 0));
        assert_eq!(store.lock().narrows.ids(&Narrow::Home), &[10, 40, 41]);
        assert!(store.lock().narrows.caught_up(&Narrow::Home).is_complete());
    }
}
