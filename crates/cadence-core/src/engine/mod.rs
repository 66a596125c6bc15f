//! Engine-side plumbing - the bridge handle, engine effects, reclamation
//! and the performance loop
//!
//! - [`Bridge`]: per-engine handle shared by API threads and the performance thread
//! - [`EngineCore`]: the engine effects both the gate and the queue invoke
//! - [`Reclaimer`]: frees deferred-call payloads off the performance thread
//! - [`Performer`] / [`PerformanceThread`]: drain-then-process block loop

mod bridge;
mod effects;
mod gc;
mod performer;

pub use bridge::Bridge;
pub use effects::EngineCore;
pub use gc::Reclaimer;
pub use performer::{BlockProcessor, PerformanceThread, Performer};
