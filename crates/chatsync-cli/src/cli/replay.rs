use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chatsync_core::models::UserId;
use chatsync_core::{CoreConfig, CoreRuntime, IngestEvent};
use tracing::{debug, info};

const REPLAY_QUEUE_CAPACITY: usize = 256;

/// Parse a JSON-lines event log. Blank lines and lines starting with `#`
/// are skipped.
pub fn read_events(path: &Path) -> Result<Vec<IngestEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event log: {}", path.display()))?;

    let mut events = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: IngestEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid event", path.display(), index + 1))?;
        events.push(event);
    }
    debug!(count = events.len(), path = %path.display(), "Read event log");
    Ok(events)
}

/// Feed `events` through the runtime's ingestion queue in order and wait
/// until all of them are applied.
pub async fn replay_events(runtime: &CoreRuntime, events: Vec<IngestEvent>) -> Result<usize> {
    let expected = events.len();
    let (handle, receiver) = CoreRuntime::event_channel(REPLAY_QUEUE_CAPACITY);

    let producer = tokio::spawn(async move {
        for event in events {
            if handle.send(event).await.is_err() {
                return Err(anyhow!("event queue closed before the log was drained"));
            }
        }
        Ok(())
    });

    let applied = runtime.run_event_pump(receiver).await;
    producer.await.context("Event producer task failed")??;

    if applied != expected {
        return Err(anyhow!("applied {} of {} events", applied, expected));
    }
    Ok(applied)
}

/// Build a runtime and replay the log at `path` into it.
pub async fn replay_file(path: &Path, own_user_id: UserId, config: CoreConfig) -> Result<CoreRuntime> {
    let events = read_events(path)?;
    let runtime = CoreRuntime::new(own_user_id, config);
    let applied = replay_events(&runtime, events).await?;
    info!(applied, "Replay finished");
    Ok(runtime)
}
