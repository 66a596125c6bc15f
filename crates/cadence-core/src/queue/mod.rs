//! Deferred-call queue for real-time engine control
//!
//! API threads queue [`DeferredCall`]s; the performance thread drains them
//! at block boundaries and runs each one against the [`EngineCore`], the
//! same effects the synchronous gate uses.
//!
//! ```ignore
//! // API thread: queue a call (never blocks the performance thread)
//! bridge.enqueue_table_set(3, 5, 2.5)?;
//!
//! // Performance thread, between blocks
//! bridge.drain_queue();
//! ```
//!
//! [`EngineCore`]: crate::engine::EngineCore

mod call;
mod ring;

pub use call::{CallKind, DeferredCall, TableBuffer};
pub use ring::CallQueue;
