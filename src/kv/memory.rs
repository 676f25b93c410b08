//! In-process key-value store implementing [`KvClient`].

use super::{KvClient, WatchEvent};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Capacity of each watcher's event channel.
const WATCH_BUFFER: usize = 16;

#[derive(Default)]
struct MemoryKvInner {
    values: HashMap<String, Vec<u8>>,
    // key -> senders of live watch subscriptions
    watchers: HashMap<String, Vec<mpsc::Sender<WatchEvent>>>,
}

/// In-memory key-value store with watch support.
///
/// Stands in for a real distributed store in tests and demos: `put` overwrites
/// the stored value and fans the change out to every live watcher of that key.
///
/// # Examples
///
/// ```rust
/// use liveconfig::kv::{KvClient, MemoryKv};
///
/// # async fn example() -> liveconfig::error::Result<()> {
/// let kv = MemoryKv::new();
/// kv.put("/app/engine", b"speed: 5".to_vec()).await;
/// let bytes = kv.get("/app/engine").await?;
/// assert_eq!(bytes, b"speed: 5");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryKv {
    inner: Mutex<MemoryKvInner>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `key` and notify every live watcher of that key.
    pub async fn put(&self, key: impl Into<String>, value: Vec<u8>) {
        let key = key.into();
        let senders = {
            let mut inner = self.inner.lock().unwrap();
            inner.values.insert(key.clone(), value.clone());
            match inner.watchers.get(&key) {
                Some(senders) => senders.clone(),
                None => Vec::new(),
            }
        };

        let event = WatchEvent {
            key: key.clone(),
            value,
        };
        let mut dead = false;
        for tx in &senders {
            // A dropped receiver just means that watcher went away.
            if tx.send(event.clone()).await.is_err() {
                dead = true;
            }
        }
        if dead {
            let mut inner = self.inner.lock().unwrap();
            if let Some(senders) = inner.watchers.get_mut(&key) {
                senders.retain(|tx| !tx.is_closed());
            }
        }
    }

    /// Remove `key` from the store. Watchers receive no event for deletions.
    pub fn delete(&self, key: &str) {
        self.inner.lock().unwrap().values.remove(key);
    }
}

#[async_trait]
impl KvClient for MemoryKv {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner
            .values
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::LoadError(format!("key not found: {}", key)))
    }

    async fn watch(&self, key: &str) -> Result<mpsc::Receiver<WatchEvent>> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let mut inner = self.inner.lock().unwrap();
        inner.watchers.entry(key.to_string()).or_default().push(tx);
        Ok(rx)
    }
}
