//! # liveconfig
//!
//! Hot-reloadable application configuration from local files and remote
//! key-value stores.
//!
//! ## Overview
//!
//! `liveconfig` keeps a fixed set of named configuration groups live for the
//! whole process lifetime:
//! - Each group is a [`source::ConfigSource`] backed by a local file or a
//!   remote store key, decoding into its own typed target.
//! - Reads are lock-free snapshots via `arc-swap`; updates are published with
//!   a single atomic swap, so a failed or partial decode never corrupts the
//!   live value.
//! - Remote change streams are bridged into per-key notification channels by
//!   [`remote::open_watch_stream`]; the [`remote::ChangeRegistry`] hands every
//!   watcher of the same key the identical channel and coalesces write bursts
//!   into at most one pending wakeup.
//! - [`aggregate::ConfigAggregate`] fans parse/watch calls out to every group,
//!   one independent task each, all torn down by one cancellation token.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use liveconfig::prelude::*;
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Deserialize, Default, Clone)]
//! #[serde(default)]
//! struct EngineConfig {
//!     speed: i64,
//!     time: i64,
//! }
//!
//! # async fn example() -> liveconfig::error::Result<()> {
//! let engine: Arc<ConfigSource<EngineConfig>> =
//!     Arc::new(ConfigSource::file("engine", "configs/engine.yaml"));
//!
//! let mut aggregate = ConfigAggregate::new();
//! aggregate.add_group(engine.clone());
//! aggregate.parse().await?;
//!
//! let shutdown = tokio_util::sync::CancellationToken::new();
//! let _watchers = aggregate.watch(&shutdown);
//!
//! // Lock-free read, always the latest successfully decoded value.
//! println!("speed = {}", engine.get().speed);
//! # Ok(())
//! # }
//! ```
//!
//! Remote groups take a [`kv::KvClient`] implementation plus the shared
//! [`remote::ChangeRegistry`]; see `demos/live_reload.rs` for a two-group
//! setup mixing a file source with a remote one.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod error;
pub mod kv;
pub mod remote;
pub mod source;
pub mod watch;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::aggregate::{ConfigAggregate, ConfigGroup};
    pub use crate::error::{ConfigError, Result};
    pub use crate::kv::KvClient;
    pub use crate::remote::ChangeRegistry;
    pub use crate::source::{ConfigSource, RemoteSpec, SourceKind};
}
