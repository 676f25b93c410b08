//! Configuration sources: one named group backed by a file or a remote key.

use crate::error::{ConfigError, Result};
use crate::kv::KvClient;
use crate::remote::{open_watch_stream, ChangeRegistry};
use crate::watch::{FileWatcher, DEFAULT_DEBOUNCE};
use arc_swap::ArcSwap;
use config::FileFormat;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Whether a configuration group is backed by a local file or a remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Backed by a local file on disk.
    File,
    /// Backed by a key in a remote key-value store.
    Remote,
}

/// Where to fetch and watch one remote configuration blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSpec {
    /// Named backend, e.g. `"etcd"`.
    pub provider: String,
    /// Store endpoint as `host:port`.
    pub endpoint: String,
    /// Store path of the configuration document.
    pub key: String,
}

impl RemoteSpec {
    /// Create a remote addressing tuple.
    pub fn new(
        provider: impl Into<String>,
        endpoint: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            endpoint: endpoint.into(),
            key: key.into(),
        }
    }
}

enum Provider {
    File {
        path: PathBuf,
    },
    Remote {
        spec: RemoteSpec,
        client: Arc<dyn KvClient>,
        registry: Arc<ChangeRegistry>,
    },
}

/// One named configuration group with a hot-reloadable decode target.
///
/// A source is constructed once at process start with a fixed provider and
/// connection parameters. [`parse`](Self::parse) performs the initial load;
/// [`watch`](Self::watch) keeps the value fresh until cancellation. Readers
/// take lock-free snapshots via [`get`](Self::get).
///
/// Updates are transactional: a reload decodes into a fresh value and
/// publishes it with a single atomic swap, so a failed or partial decode
/// never corrupts the live value and readers never observe a half-written
/// update.
///
/// Decode targets should derive `Default` with `#[serde(default)]` so fields
/// missing from a document keep their zero values; unknown fields in the
/// document are ignored.
///
/// # Examples
///
/// ```rust,no_run
/// use liveconfig::source::ConfigSource;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, Default, Clone)]
/// #[serde(default)]
/// struct EngineConfig {
///     speed: i64,
///     time: i64,
/// }
///
/// # async fn example() -> liveconfig::error::Result<()> {
/// let source: ConfigSource<EngineConfig> =
///     ConfigSource::file("engine", "configs/engine.yaml");
/// source.parse().await?;
/// println!("speed = {}", source.get().speed);
/// # Ok(())
/// # }
/// ```
pub struct ConfigSource<T> {
    name: String,
    provider: Provider,
    current: ArcSwap<T>,
    debounce: Duration,
}

impl<T> ConfigSource<T>
where
    T: DeserializeOwned + Default + Send + Sync + 'static,
{
    /// Create a file-backed source for the group `name`.
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            provider: Provider::File { path: path.into() },
            current: ArcSwap::from_pointee(T::default()),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Create a remote-backed source for the group `name`.
    ///
    /// The registry must be the process-wide instance shared by every remote
    /// source, so watchers of the same key observe the same channel.
    pub fn remote(
        name: impl Into<String>,
        spec: RemoteSpec,
        client: Arc<dyn KvClient>,
        registry: Arc<ChangeRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            provider: Provider::Remote {
                spec,
                client,
                registry,
            },
            current: ArcSwap::from_pointee(T::default()),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Override the file-watch debounce window (default 500ms).
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Group name this source was constructed with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which kind of provider backs this source.
    pub fn kind(&self) -> SourceKind {
        match self.provider {
            Provider::File { .. } => SourceKind::File,
            Provider::Remote { .. } => SourceKind::Remote,
        }
    }

    /// Snapshot of the current configuration value.
    ///
    /// Lock-free; the returned `Arc` stays valid across later reloads.
    pub fn get(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Validate the provider parameters and perform the initial load + decode.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingParameter`] if a file source has an empty path.
    /// - [`ConfigError::ProviderRegistration`] if the remote tuple is empty or
    ///   the endpoint is malformed.
    /// - [`ConfigError::LoadError`] if the read fails (file absent, store
    ///   unreachable, key absent).
    /// - [`ConfigError::DecodeError`] if the bytes do not decode into `T`.
    pub async fn parse(&self) -> Result<()> {
        self.register_provider()?;
        let value = self.load_and_decode().await?;
        self.current.store(Arc::new(value));
        Ok(())
    }

    /// Re-load and re-decode, publishing the new value only on full success.
    ///
    /// On any failure the live value is left untouched.
    ///
    /// # Errors
    ///
    /// Mirrors [`parse`](Self::parse)'s `LoadError` / `DecodeError`.
    pub async fn reload(&self) -> Result<()> {
        let value = self.load_and_decode().await?;
        self.current.store(Arc::new(value));
        Ok(())
    }

    /// Watch the backing provider and reload on every change until `cancel`
    /// fires.
    ///
    /// Reload failures are logged and never terminate the loop; a single bad
    /// update leaves the value at its last-known-good state.
    pub async fn watch(&self, cancel: CancellationToken) {
        match &self.provider {
            Provider::File { path } => self.watch_file(path.clone(), cancel).await,
            Provider::Remote {
                spec,
                client,
                registry,
            } => {
                self.watch_remote(spec.key.clone(), Arc::clone(client), registry, cancel)
                    .await
            }
        }
    }

    async fn watch_file(&self, path: PathBuf, cancel: CancellationToken) {
        let (mut watcher, mut rx) = match FileWatcher::new(self.debounce) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(group = %self.name, error = %e, "failed to start file watcher");
                return;
            }
        };
        if let Err(e) = watcher.watch(&path) {
            tracing::error!(group = %self.name, path = %path.display(), error = %e,
                "failed to watch configuration file");
            return;
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                wakeup = rx.recv() => {
                    if wakeup.is_none() {
                        return;
                    }
                    if let Err(e) = self.reload().await {
                        tracing::warn!(group = %self.name, error = %e, "file reload failed");
                    } else {
                        tracing::debug!(group = %self.name, "configuration reloaded from file");
                    }
                }
            }
        }
    }

    async fn watch_remote(
        &self,
        key: String,
        client: Arc<dyn KvClient>,
        registry: &ChangeRegistry,
        cancel: CancellationToken,
    ) {
        let notify = registry.change_channel(&key);
        let mut session = match open_watch_stream(client, &key, registry).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(group = %self.name, key = %key, error = %e,
                    "failed to open remote watch stream");
                return;
            }
        };

        let mut values_open = true;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = notify.notified() => {
                    // The pushed payload is never trusted; reload re-fetches
                    // with a fresh point read, so coalesced or out-of-order
                    // notifications are harmless.
                    if let Err(e) = self.reload().await {
                        tracing::warn!(group = %self.name, error = %e, "remote reload failed");
                    } else {
                        tracing::debug!(group = %self.name, "configuration reloaded from store");
                    }
                }
                value = session.values.recv(), if values_open => {
                    if value.is_none() {
                        // Our bridge is gone, but a sibling watcher of the
                        // same key may still signal the shared channel.
                        values_open = false;
                    }
                }
            }
        }
    }

    fn register_provider(&self) -> Result<()> {
        match &self.provider {
            Provider::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::MissingParameter("file path"));
                }
                validate_extension(path)
            }
            Provider::Remote { spec, .. } => {
                if spec.provider.is_empty() {
                    return Err(ConfigError::ProviderRegistration(
                        "provider name is empty".to_string(),
                    ));
                }
                if spec.key.is_empty() {
                    return Err(ConfigError::ProviderRegistration(
                        "remote key is empty".to_string(),
                    ));
                }
                if spec.endpoint.is_empty() || !spec.endpoint.contains(':') {
                    return Err(ConfigError::ProviderRegistration(format!(
                        "malformed endpoint (expected host:port): {:?}",
                        spec.endpoint
                    )));
                }
                Ok(())
            }
        }
    }

    async fn load_and_decode(&self) -> Result<T> {
        match &self.provider {
            Provider::File { path } => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ConfigError::LoadError(format!(
                        "failed to read {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                decode(&text, format_for(path))
            }
            Provider::Remote { spec, client, .. } => {
                let bytes = client.get(&spec.key).await?;
                let text = std::str::from_utf8(&bytes).map_err(|e| {
                    ConfigError::DecodeError(format!("value is not valid UTF-8: {}", e))
                })?;
                decode(text, FileFormat::Yaml)
            }
        }
    }
}

/// Decode one raw document into the target type.
fn decode<T: DeserializeOwned>(text: &str, format: FileFormat) -> Result<T> {
    let merged = config::Config::builder()
        .add_source(config::File::from_str(text, format))
        .build()
        .map_err(|e| ConfigError::DecodeError(e.to_string()))?;

    merged
        .try_deserialize::<T>()
        .map_err(|e| ConfigError::DecodeError(e.to_string()))
}

/// Pick the document format from the file extension; YAML when in doubt.
fn format_for(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => FileFormat::Toml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Yaml,
    }
}

fn validate_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            ConfigError::LoadError(format!(
                "unable to determine file format for: {}",
                path.display()
            ))
        })?;

    match extension {
        "yaml" | "yml" | "toml" | "json" => Ok(()),
        _ => Err(ConfigError::LoadError(format!(
            "unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        ))),
    }
}
