//! Fan-out over a fixed set of independent configuration groups.

use crate::error::Result;
use crate::kv::KvClient;
use crate::remote::ChangeRegistry;
use crate::source::{ConfigSource, RemoteSpec, SourceKind};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Object-safe view of one configuration group.
///
/// Implemented by [`ConfigSource`] for every decode-target type, so groups
/// with different targets can live side by side in one aggregate.
#[async_trait]
pub trait ConfigGroup: Send + Sync {
    /// Group name.
    fn name(&self) -> &str;

    /// Which kind of provider backs this group.
    fn kind(&self) -> SourceKind;

    /// Initial load + decode for this group.
    async fn parse(&self) -> Result<()>;

    /// Watch for changes until `cancel` fires.
    async fn watch(&self, cancel: CancellationToken);
}

#[async_trait]
impl<T> ConfigGroup for ConfigSource<T>
where
    T: DeserializeOwned + Default + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        ConfigSource::name(self)
    }

    fn kind(&self) -> SourceKind {
        ConfigSource::kind(self)
    }

    async fn parse(&self) -> Result<()> {
        ConfigSource::parse(self).await
    }

    async fn watch(&self, cancel: CancellationToken) {
        ConfigSource::watch(self, cancel).await
    }
}

/// A fixed set of independently reloading configuration groups.
///
/// Owns one [`ConfigGroup`] per named group and fans parse/watch calls out to
/// each. Groups share nothing but (for remote ones) the change registry, so a
/// failure in one group's watch loop cannot affect the others.
///
/// # Examples
///
/// ```rust,no_run
/// use liveconfig::prelude::*;
/// use serde::Deserialize;
/// use std::sync::Arc;
///
/// #[derive(Debug, Deserialize, Default, Clone)]
/// #[serde(default)]
/// struct EngineConfig { speed: i64, time: i64 }
///
/// # async fn example() -> liveconfig::error::Result<()> {
/// let engine: Arc<ConfigSource<EngineConfig>> =
///     Arc::new(ConfigSource::file("engine", "configs/engine.yaml"));
///
/// let mut aggregate = ConfigAggregate::new();
/// aggregate.add_group(engine.clone());
///
/// aggregate.parse().await?;
///
/// let shutdown = tokio_util::sync::CancellationToken::new();
/// let _handles = aggregate.watch(&shutdown);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ConfigAggregate {
    groups: Vec<Arc<dyn ConfigGroup>>,
}

impl ConfigAggregate {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration group. Groups are parsed in insertion order.
    pub fn add_group(&mut self, group: Arc<dyn ConfigGroup>) {
        self.groups.push(group);
    }

    /// Convenience: construct and add a file-backed group in one call,
    /// returning the source for reading.
    pub fn add_file_group<T>(
        &mut self,
        name: impl Into<String>,
        path: impl Into<std::path::PathBuf>,
    ) -> Arc<ConfigSource<T>>
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
    {
        let source = Arc::new(ConfigSource::file(name, path));
        self.add_group(source.clone());
        source
    }

    /// Convenience: construct and add a remote-backed group in one call,
    /// returning the source for reading.
    pub fn add_remote_group<T>(
        &mut self,
        name: impl Into<String>,
        spec: RemoteSpec,
        client: Arc<dyn KvClient>,
        registry: Arc<ChangeRegistry>,
    ) -> Arc<ConfigSource<T>>
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
    {
        let source = Arc::new(ConfigSource::remote(name, spec, client, registry));
        self.add_group(source.clone());
        source
    }

    /// Group names in parse order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name()).collect()
    }

    /// Parse every group sequentially.
    ///
    /// Stops at the first failing group and surfaces its error; later groups
    /// are left unparsed.
    ///
    /// # Errors
    ///
    /// The failing group's [`ConfigError`](crate::error::ConfigError).
    pub async fn parse(&self) -> Result<()> {
        for group in &self.groups {
            group.parse().await?;
        }
        Ok(())
    }

    /// Start one independent watch task per group.
    ///
    /// Each task runs until `cancel` fires; the returned handles can be
    /// awaited at shutdown.
    pub fn watch(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.groups
            .iter()
            .map(|group| {
                let group = Arc::clone(group);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    group.watch(cancel).await;
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use serde::Deserialize;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Deserialize, Default, Clone)]
    #[serde(default)]
    struct EngineConfig {
        speed: i64,
    }

    #[derive(Debug, Deserialize, Default, Clone)]
    #[serde(default)]
    struct NodeConfig {
        node: String,
    }

    #[tokio::test]
    async fn test_parse_all_groups() {
        let temp_dir = TempDir::new().unwrap();
        let engine_path = temp_dir.path().join("engine.yaml");
        let node_path = temp_dir.path().join("node.yaml");
        fs::write(&engine_path, "speed: 5\n").unwrap();
        fs::write(&node_path, "node: alpha\n").unwrap();

        let engine: Arc<ConfigSource<EngineConfig>> =
            Arc::new(ConfigSource::file("engine", &engine_path));
        let node: Arc<ConfigSource<NodeConfig>> = Arc::new(ConfigSource::file("node", &node_path));

        let mut aggregate = ConfigAggregate::new();
        aggregate.add_group(engine.clone());
        aggregate.add_group(node.clone());

        aggregate.parse().await.unwrap();
        assert_eq!(engine.get().speed, 5);
        assert_eq!(node.get().node, "alpha");
        assert_eq!(aggregate.group_names(), vec!["engine", "node"]);
    }

    #[tokio::test]
    async fn test_parse_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let node_path = temp_dir.path().join("node.yaml");
        fs::write(&node_path, "node: alpha\n").unwrap();

        let broken: Arc<ConfigSource<EngineConfig>> =
            Arc::new(ConfigSource::file("engine", "/nonexistent/engine.yaml"));
        let node: Arc<ConfigSource<NodeConfig>> = Arc::new(ConfigSource::file("node", &node_path));

        let mut aggregate = ConfigAggregate::new();
        aggregate.add_group(broken);
        aggregate.add_group(node.clone());

        assert!(matches!(
            aggregate.parse().await,
            Err(ConfigError::LoadError(_))
        ));
        // The later group was never parsed.
        assert_eq!(node.get().node, "");
    }

    #[tokio::test]
    async fn test_watch_spawns_one_task_per_group() {
        let temp_dir = TempDir::new().unwrap();
        let engine_path = temp_dir.path().join("engine.yaml");
        let node_path = temp_dir.path().join("node.yaml");
        fs::write(&engine_path, "speed: 5\n").unwrap();
        fs::write(&node_path, "node: alpha\n").unwrap();

        let engine: Arc<ConfigSource<EngineConfig>> =
            Arc::new(ConfigSource::file("engine", &engine_path));
        let node: Arc<ConfigSource<NodeConfig>> = Arc::new(ConfigSource::file("node", &node_path));

        let mut aggregate = ConfigAggregate::new();
        aggregate.add_group(engine);
        aggregate.add_group(node);
        aggregate.parse().await.unwrap();

        let cancel = CancellationToken::new();
        let handles = aggregate.watch(&cancel);
        assert_eq!(handles.len(), 2);

        cancel.cancel();
        for handle in handles {
            tokio::time::timeout(std::time::Duration::from_secs(2), handle)
                .await
                .expect("watch task should exit promptly on cancellation")
                .unwrap();
        }
    }
}
