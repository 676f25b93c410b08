//! End-to-end tests for file-backed configuration groups.

use liveconfig::prelude::*;
use serde::Deserialize;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
struct EngineConfig {
    speed: i64,
    time: i64,
}

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_parse_then_read() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("engine.yaml");
    fs::write(&config_path, "speed: 5\ntime: 100\n").unwrap();

    let source: ConfigSource<EngineConfig> = ConfigSource::file("engine", &config_path);
    source.parse().await.unwrap();

    let cfg = source.get();
    assert_eq!(cfg.speed, 5);
    assert_eq!(cfg.time, 100);
}

#[tokio::test]
async fn test_rewrite_triggers_reload() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("engine.yaml");
    fs::write(&config_path, "speed: 5\ntime: 100\n").unwrap();

    let source: Arc<ConfigSource<EngineConfig>> = Arc::new(
        ConfigSource::file("engine", &config_path).with_debounce(Duration::from_millis(50)),
    );
    source.parse().await.unwrap();
    assert_eq!(source.get().speed, 5);

    let cancel = CancellationToken::new();
    let watch_source = source.clone();
    let watch_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        watch_source.watch(watch_cancel).await;
    });

    // Let the watcher register before rewriting.
    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(&config_path, "speed: 9\ntime: 100\n").unwrap();

    assert!(
        wait_for(|| source.get().speed == 9).await,
        "reload should pick up the rewritten file"
    );
    assert_eq!(source.get().time, 100);

    cancel.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("watch loop should exit on cancellation")
        .unwrap();
}

#[tokio::test]
async fn test_bad_rewrite_keeps_last_known_good() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("engine.yaml");
    fs::write(&config_path, "speed: 5\ntime: 100\n").unwrap();

    let source: Arc<ConfigSource<EngineConfig>> = Arc::new(
        ConfigSource::file("engine", &config_path).with_debounce(Duration::from_millis(50)),
    );
    source.parse().await.unwrap();

    let cancel = CancellationToken::new();
    let watch_source = source.clone();
    let watch_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        watch_source.watch(watch_cancel).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(&config_path, "speed: [broken\n").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    // The failed reload was logged and swallowed; values are untouched and
    // the loop is still alive for the next good write.
    assert_eq!(*source.get(), EngineConfig { speed: 5, time: 100 });

    fs::write(&config_path, "speed: 7\ntime: 100\n").unwrap();
    assert!(
        wait_for(|| source.get().speed == 7).await,
        "watch loop should survive a bad update"
    );

    cancel.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("watch loop should exit on cancellation")
        .unwrap();
}

#[tokio::test]
async fn test_cancelled_watch_stops_reloading() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("engine.yaml");
    fs::write(&config_path, "speed: 5\ntime: 100\n").unwrap();

    let source: Arc<ConfigSource<EngineConfig>> = Arc::new(
        ConfigSource::file("engine", &config_path).with_debounce(Duration::from_millis(50)),
    );
    source.parse().await.unwrap();

    let cancel = CancellationToken::new();
    let watch_source = source.clone();
    let watch_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        watch_source.watch(watch_cancel).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("watch loop should exit promptly")
        .unwrap();

    // Writes after cancellation issue no further reloads.
    fs::write(&config_path, "speed: 42\ntime: 100\n").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(source.get().speed, 5);
}

#[tokio::test]
async fn test_aggregate_two_file_groups_reload_independently() {
    #[derive(Debug, Clone, Deserialize, Default, PartialEq)]
    #[serde(default)]
    struct NodeConfig {
        node: String,
        user: String,
        pass: i64,
    }

    let temp_dir = TempDir::new().unwrap();
    let engine_path = temp_dir.path().join("engine.yaml");
    let node_path = temp_dir.path().join("node.yaml");
    fs::write(&engine_path, "speed: 5\ntime: 100\n").unwrap();
    fs::write(&node_path, "node: alpha\nuser: admin\npass: 42\n").unwrap();

    let mut aggregate = ConfigAggregate::new();
    let engine: Arc<ConfigSource<EngineConfig>> = aggregate.add_file_group("engine", &engine_path);
    let node: Arc<ConfigSource<NodeConfig>> = aggregate.add_file_group("node", &node_path);

    aggregate.parse().await.unwrap();
    assert_eq!(engine.get().speed, 5);
    assert_eq!(node.get().node, "alpha");

    let cancel = CancellationToken::new();
    let handles = aggregate.watch(&cancel);

    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(&engine_path, "speed: 9\ntime: 100\n").unwrap();

    assert!(wait_for(|| engine.get().speed == 9).await);
    // The sibling group saw no spurious reload effects.
    assert_eq!(node.get().user, "admin");

    cancel.cancel();
    for handle in handles {
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("watch task should exit on cancellation")
            .unwrap();
    }
}
