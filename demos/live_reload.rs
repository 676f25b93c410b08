//! Example running two configuration groups side by side: a file-backed
//! engine group and a remote-backed node group.
//!
//! The remote store here is the in-process `MemoryKv`, with a background task
//! playing the role of an operator updating the key. Swap in a real `KvClient`
//! implementation to talk to an actual store.
//!
//! Run with: cargo run --example live_reload
//!
//! While running, try editing demo_config/engine.yaml to see file reloads.

use liveconfig::kv::MemoryKv;
use liveconfig::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct EngineConfig {
    speed: i64,
    time: i64,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct NodeConfig {
    node: String,
    user: String,
    pass: i64,
}

const NODE_KEY: &str = "/demo/node";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    println!("=== Live Reload Example ===\n");

    // Create an initial engine config file if it doesn't exist.
    let engine_path = "demo_config/engine.yaml";
    if !std::path::Path::new(engine_path).exists() {
        std::fs::create_dir_all("demo_config")?;
        std::fs::write(engine_path, "speed: 5\ntime: 100\n")?;
        println!("Created {}", engine_path);
    }

    // Seed the "remote" store.
    let kv = Arc::new(MemoryKv::new());
    kv.put(NODE_KEY, b"node: alpha\nuser: admin\npass: 42\n".to_vec())
        .await;

    // One registry shared by every remote watcher in the process.
    let registry = Arc::new(ChangeRegistry::new());

    let mut aggregate = ConfigAggregate::new();
    let engine: Arc<ConfigSource<EngineConfig>> = aggregate.add_file_group("engine", engine_path);
    let node: Arc<ConfigSource<NodeConfig>> = aggregate.add_remote_group(
        "node",
        RemoteSpec::new("etcd", "127.0.0.1:2379", NODE_KEY),
        kv.clone(),
        registry,
    );

    aggregate.parse().await?;
    println!("Parsed groups: {:?}", aggregate.group_names());

    let shutdown = CancellationToken::new();
    let watchers = aggregate.watch(&shutdown);

    // Simulate remote writes every few seconds.
    let writer_kv = kv.clone();
    let writer_stop = shutdown.clone();
    tokio::spawn(async move {
        let mut generation = 0u64;
        loop {
            tokio::select! {
                _ = writer_stop.cancelled() => return,
                _ = tokio::time::sleep(Duration::from_secs(7)) => {
                    generation += 1;
                    let doc = format!("node: alpha-{}\nuser: admin\npass: 42\n", generation);
                    writer_kv.put(NODE_KEY, doc.into_bytes()).await;
                    println!("[remote] wrote generation {}", generation);
                }
            }
        }
    });

    println!(
        "\n===> Try editing {} to see file reloads! <===",
        engine_path
    );
    println!("Press Ctrl+C to exit\n");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(5)) => {
                let engine_cfg = engine.get();
                let node_cfg = node.get();
                println!(
                    "[status] engine: speed={} time={} | node: {}@{} (pass {})",
                    engine_cfg.speed, engine_cfg.time,
                    node_cfg.user, node_cfg.node, node_cfg.pass
                );
            }
        }
    }

    println!("Shutting down...");
    shutdown.cancel();
    for watcher in watchers {
        let _ = watcher.await;
    }
    Ok(())
}
