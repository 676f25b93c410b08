//! Bridge from a store watch stream to consumer-facing channels.

use crate::error::Result;
use crate::kv::KvClient;
use crate::remote::ChangeRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the session's raw-value channel.
const VALUE_BUFFER: usize = 1;

/// A live watch on one remote key.
///
/// Owns the background task that consumes the store's watch stream. For every
/// change event the task forwards the raw value on [`values`](Self::values)
/// and then signals the key's registry channel, in that order. The task exits
/// when [`stop`](Self::stop) is called, the session is dropped, or the store
/// closes the stream.
///
/// The stop token is private to this session: tearing one bridge down leaves
/// sibling sources and their sessions untouched.
pub struct WatchSession {
    /// Raw values pushed by the store, one per change event.
    pub values: mpsc::Receiver<Vec<u8>>,
    stop: CancellationToken,
}

impl WatchSession {
    /// Signal the background task to exit.
    pub fn stop(&self) {
        self.stop.cancel();
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Open a streaming watch on `key` and bridge its events into channels.
///
/// A failure to establish the subscription is returned to the caller rather
/// than swallowed; the caller decides whether to degrade or retry.
///
/// # Errors
///
/// Propagates the [`KvClient::watch`] error when the initial subscription
/// cannot be opened.
pub async fn open_watch_stream(
    client: Arc<dyn KvClient>,
    key: &str,
    registry: &ChangeRegistry,
) -> Result<WatchSession> {
    let mut stream = client.watch(key).await?;
    let notify = registry.change_channel(key);
    let (value_tx, value_rx) = mpsc::channel(VALUE_BUFFER);
    let stop = CancellationToken::new();
    let task_stop = stop.clone();
    let task_key = key.to_string();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = task_stop.cancelled() => return,
                event = stream.recv() => {
                    let Some(event) = event else {
                        tracing::debug!(key = %task_key, "watch stream closed by store");
                        return;
                    };
                    // Value first, then the wakeup: a consumer woken by the
                    // signal must be able to find the payload already queued.
                    if value_tx.send(event.value).await.is_err() {
                        return;
                    }
                    notify.notify_one();
                }
            }
        }
    });

    Ok(WatchSession {
        values: value_rx,
        stop,
    })
}
