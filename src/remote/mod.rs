//! Remote change propagation: the per-key notification registry and the
//! bridge that feeds it from a store watch stream.

mod bridge;
mod registry;

pub use bridge::{open_watch_stream, WatchSession};
pub use registry::ChangeRegistry;
