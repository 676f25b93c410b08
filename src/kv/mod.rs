//! Key-value-store client capability.
//!
//! The remote store itself (etcd, Consul, ...) is an external collaborator.
//! This module defines the seam liveconfig programs against: a one-shot read
//! plus a streaming watch on a single key. Implementations are injected into
//! remote sources as `Arc<dyn KvClient>`.

mod memory;

pub use memory::MemoryKv;

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A single observed change to a watched key, carrying the new value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// The key that changed.
    pub key: String,
    /// The value after the change.
    pub value: Vec<u8>,
}

/// Client capability for a remote key-value store.
///
/// `get` is a fresh point read; `watch` opens a streaming subscription whose
/// receiver yields one [`WatchEvent`] per observed write. The stream ends when
/// the receiver is dropped or the store closes the subscription.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Read the current value at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LoadError`](crate::error::ConfigError::LoadError)
    /// if the key is absent or the store is unreachable.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Open a streaming watch on `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WatchError`](crate::error::ConfigError::WatchError)
    /// if the subscription cannot be established.
    async fn watch(&self, key: &str) -> Result<mpsc::Receiver<WatchEvent>>;
}
