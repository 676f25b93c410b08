//! File watching for automatic configuration reloads.

use crate::error::{ConfigError, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep_until;

/// Default debounce window between reload triggers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches one configuration file and emits a reload wakeup on each
/// write-completion event.
///
/// Uses the `notify` crate underneath. Raw events are debounced so an editor
/// save (often several filesystem events) triggers a single reload.
///
/// # Examples
///
/// ```rust,no_run
/// use liveconfig::watch::{FileWatcher, DEFAULT_DEBOUNCE};
///
/// # async fn example() -> liveconfig::error::Result<()> {
/// let (mut watcher, mut rx) = FileWatcher::new(DEFAULT_DEBOUNCE)?;
/// watcher.watch("/etc/app/engine.yaml")?;
///
/// while let Some(()) = rx.recv().await {
///     println!("config file changed, reload");
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher.
    ///
    /// Returns the watcher and the receiver that gets one message per
    /// debounced change.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying OS watcher cannot be created.
    pub fn new(debounce: Duration) -> Result<(Self, mpsc::Receiver<()>)> {
        let (tx, rx) = mpsc::channel(16);

        // Channel for raw events from notify; the callback runs on notify's
        // own thread, so it must not block.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<()>();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Modify(_) | notify::EventKind::Create(_)
                ) {
                    let _ = event_tx.send(());
                }
            }
        })
        .map_err(|e| ConfigError::WatchError(format!("failed to create file watcher: {}", e)))?;

        tokio::spawn(debounce_loop(debounce, event_rx, tx));

        Ok((Self { watcher }, rx))
    }

    /// Start watching `path` for write events.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or watched.
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let canonical = path
            .as_ref()
            .canonicalize()
            .map_err(|e| ConfigError::LoadError(format!("failed to resolve path: {}", e)))?;

        self.watcher
            .watch(&canonical, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchError(format!("failed to watch path: {}", e)))
    }
}

/// Collapse raw filesystem events into at most one wakeup per debounce
/// window. Events suppressed mid-window are folded into a single trailing
/// wakeup when the window closes.
async fn debounce_loop(
    debounce: Duration,
    mut events: mpsc::UnboundedReceiver<()>,
    wakeups: mpsc::Sender<()>,
) {
    let mut last_trigger = tokio::time::Instant::now();
    let mut pending = false;

    loop {
        if pending {
            tokio::select! {
                _ = sleep_until(last_trigger + debounce) => {
                    if wakeups.send(()).await.is_err() {
                        return;
                    }
                    last_trigger = tokio::time::Instant::now();
                    pending = false;
                }
                event = events.recv() => {
                    if event.is_none() {
                        return;
                    }
                    // Already folded into the pending wakeup.
                }
            }
        } else {
            match events.recv().await {
                None => return,
                Some(()) => {
                    let now = tokio::time::Instant::now();
                    if now.duration_since(last_trigger) >= debounce {
                        if wakeups.send(()).await.is_err() {
                            return;
                        }
                        last_trigger = now;
                    } else {
                        pending = true;
                    }
                }
            }
        }
    }
}
