//! Cadence Core - concurrency bridge between API threads and a real-time
//! performance thread
//!
//! Callers reach engine state through three tiers:
//! - **Gate**: coarse API mutex around immediate engine effects
//! - **Channels**: per-channel atomics or spin locks for small in-place values
//! - **Deferred queue**: calls executed by the performance thread between blocks

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod queue;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{BridgeError, BridgeResult, EngineError, EngineResult};
pub use types::*;
