//! Per-key change-notification registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Registry mapping a remote key to its change-notification channel.
///
/// Every watcher of the same key must observe the same channel, so the
/// registry creates an entry on first lookup and hands out the identical
/// `Arc<Notify>` to all later callers. Entries live for the lifetime of the
/// registry; they are never replaced or removed.
///
/// `Notify` stores at most one pending permit, so a burst of writes to a key
/// collapses into a single pending "reload needed" wakeup while the consumer
/// is busy. That coalescing is intentional: consumers re-read the store
/// rather than trusting the signal, so only "something changed" needs to
/// survive.
///
/// Construct one registry at startup and share it by `Arc` with every
/// component that watches remote keys.
#[derive(Default)]
pub struct ChangeRegistry {
    channels: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ChangeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the notification channel for `key`, creating it on first use.
    ///
    /// The lock guards only the map access, never a notification delivery.
    pub fn change_channel(&self, key: &str) -> Arc<Notify> {
        let mut channels = self.channels.lock().unwrap();
        Arc::clone(
            channels
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Notify::new())),
        )
    }

    /// Number of keys with a registered channel.
    pub fn len(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    /// Whether no channel has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.channels.lock().unwrap().is_empty()
    }
}
