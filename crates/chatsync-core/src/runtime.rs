use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::events::IngestEvent;
use crate::fetch::{FetchCoordinator, MessageTransport};
use crate::models::UserId;
use crate::store::ConversationStore;

/// The account's state, shared between the event pump and fetches. The lock
/// is only ever taken for one synchronous step and never held across an
/// `.await`, so each event is applied atomically.
pub type SharedStore = Arc<Mutex<ConversationStore>>;

/// Cloneable sender side of the ingestion queue, handed to whatever
/// produces live events.
#[derive(Clone)]
pub struct CoreHandle {
    event_tx: mpsc::Sender<IngestEvent>,
}

impl CoreHandle {
    pub async fn send(&self, event: IngestEvent) -> Result<(), mpsc::error::SendError<IngestEvent>> {
        self.event_tx.send(event).await
    }
}

pub struct CoreRuntime {
    store: SharedStore,
    config: CoreConfig,
    shutdown: CancellationToken,
}

impl CoreRuntime {
    pub fn new(own_user_id: UserId, config: CoreConfig) -> Self {
        let store = Arc::new(Mutex::new(ConversationStore::new(own_user_id, &config)));
        Self {
            store,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// A bounded ingestion queue: the handle goes to the event source, the
    /// receiver to [`CoreRuntime::run_event_pump`].
    pub fn event_channel(capacity: usize) -> (CoreHandle, mpsc::Receiver<IngestEvent>) {
        let (event_tx, event_rx) = mpsc::channel(capacity);
        (CoreHandle { event_tx }, event_rx)
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// A fetch coordinator over this runtime's store. Its retry loops stop
    /// when the runtime shuts down.
    pub fn fetch_coordinator(&self, transport: Arc<dyn MessageTransport>) -> FetchCoordinator {
        FetchCoordinator::new(self.store.clone(), transport, self.config.clone())
            .with_shutdown(self.shutdown.child_token())
    }

    pub fn ingest(&self, event: &IngestEvent) {
        self.store.lock().apply(event);
    }

    /// Apply events in arrival order until the channel closes or the runtime
    /// shuts down. Returns how many events were applied.
    pub async fn run_event_pump(&self, mut events: mpsc::Receiver<IngestEvent>) -> usize {
        let mut applied = 0;
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.ingest(&event);
                        applied += 1;
                    }
                    None => break,
                },
            }
        }
        info!(applied, "Event pump stopped");
        applied
    }

    /// Expire typing notifications older than the configured window. The
    /// caller owns the timer. Returns how many conversations were cleared.
    pub fn sweep_typing(&self, now_ms: u64) -> usize {
        let mut store = self.store.lock();
        let keys = store.typing.stale_keys(now_ms, self.config.typing_expiry_ms);
        if keys.is_empty() {
            return 0;
        }
        let cleared = keys.len();
        debug!(cleared, "Clearing stale typing notifications");
        store.apply(&IngestEvent::ClearTyping { keys });
        cleared
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, MessageFlags, Narrow, Recipient};
    use crate::events::FetchCompleteEvent;
    use crate::models::Anchor;

    fn make_test_runtime() -> CoreRuntime {
        CoreRuntime::new(1, CoreConfig::default())
    }

    fn make_test_message(id: u64) -> Message {
        Message {
            id,
            timestamp: id,
            sender_id: 5,
            content: String::new(),
            recipient: Recipient::Private {
                recipient_ids: vec![1, 5],
            },
            flags: MessageFlags::new(),
            reactions: vec![],
            submessages: vec![],
            edit_history: None,
            last_edit_timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_event_pump_applies_in_order() {
        let runtime = make_test_runtime();
        let (handle, rx) = CoreRuntime::event_channel(16);

        handle
            .send(IngestEvent::FetchComplete(FetchCompleteEvent {
                narrow: Narrow::AllPrivate,
                messages: vec![],
                anchor: Anchor::LastMessage,
                num_before: 50,
                num_after: 50,
                found_newest: true,
                found_oldest: true,
            }))
            .await
            .unwrap();
        for id in [3, 1, 2] {
            handle
                .send(IngestEvent::NewMessage {
                    message: make_test_message(id),
                    local_message_id: None,
                })
                .await
                .unwrap();
        }
        handle
            .send(IngestEvent::MessageDelete { message_ids: vec![1] })
            .await
            .unwrap();
        drop(handle);

        assert_eq!(runtime.run_event_pump(rx).await, 5);
        let store = runtime.store();
        let store = store.lock();
        assert_eq!(store.narrows.ids(&Narrow::AllPrivate), &[2, 3]);
        assert!(store.check_invariants());
    }

    #[tokio::test]
    async fn test_shutdown_stops_pump() {
        let runtime = make_test_runtime();
        let (_handle, rx) = CoreRuntime::event_channel(1);
        runtime.shutdown();
        assert_eq!(runtime.run_event_pump(rx).await, 0);
    }

    #[test]
    fn test_sweep_typing_clears_stale_keys() {
        let runtime = make_test_runtime();
        runtime.ingest(&IngestEvent::TypingStart {
            sender_id: 4,
            recipient_ids: vec![1, 4],
            time: 1_000,
        });
        runtime.ingest(&IngestEvent::TypingStart {
            sender_id: 6,
            recipient_ids: vec![1, 6],
            time: 10_000,
        });

        assert_eq!(runtime.sweep_typing(5_000), 0);
        assert_eq!(runtime.sweep_typing(16_000), 1);
        let store = runtime.store();
        let store = store.lock();
        assert!(store.typing.typing_users("4").is_empty());
        assert_eq!(store.typing.typing_users("6"), &[6]);
    }
}
