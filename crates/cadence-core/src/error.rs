//! Bridge error types

use thiserror::Error;

use crate::channel::ChannelError;
use crate::queue::DeferredCall;

/// Errors reported by engine effects (score parser, table storage)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Score text or event could not be parsed
    #[error("Score error: {0}")]
    Score(String),

    /// Table number does not exist
    #[error("No such table: {0}")]
    NoSuchTable(i32),

    /// Table index outside the table
    #[error("Index {index} out of range for table {table}")]
    IndexOutOfRange { table: i32, index: i32 },

    /// Engine is not in a state that accepts the call
    #[error("Engine not ready: {0}")]
    NotReady(String),
}

/// Result type for engine effects
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The deferred queue is full; the rejected call is handed back
    #[error("Deferred call queue is full, {} rejected", .0.kind())]
    QueueFull(DeferredCall),

    /// A gated engine effect failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Channel lookup or channel table construction failed
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A background thread could not be started
    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The reclaimer thread exited before handing out its handle
    #[error("Reclaimer thread exited during startup")]
    ReclaimerUnavailable,
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
