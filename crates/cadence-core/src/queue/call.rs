//! Deferred calls sent from API threads to the performance thread
//!
//! Each variant is one operation the performance thread executes at a block
//! boundary, carrying its arguments as typed fields. Heap payloads are
//! `basedrop` pointers: when the performance thread is done with a call,
//! dropping it only enqueues the allocation for the reclaimer thread.

use basedrop::{Owned, Shared};

use crate::engine::EngineCore;
use crate::sync::SpinLock;
use crate::types::{Sample, ScoreEventKind};

/// Shared destination for a deferred table copy-out
///
/// The caller keeps a clone and reads it back after the performance thread
/// has drained the call.
pub type TableBuffer = Shared<SpinLock<Vec<Sample>>>;

/// Tag identifying a deferred operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    InputMessage,
    ReadScore,
    ScoreEvent,
    ScoreEventAbsolute,
    TableCopyOut,
    TableCopyIn,
    TableSet,
}

impl CallKind {
    /// Get the name of this call kind
    pub fn name(&self) -> &'static str {
        match self {
            CallKind::InputMessage => "input-message",
            CallKind::ReadScore => "read-score",
            CallKind::ScoreEvent => "score-event",
            CallKind::ScoreEventAbsolute => "score-event-absolute",
            CallKind::TableCopyOut => "table-copy-out",
            CallKind::TableCopyIn => "table-copy-in",
            CallKind::TableSet => "table-set",
        }
    }
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations executed by the performance thread between blocks
pub enum DeferredCall {
    // ─────────────────────────────────────────────────────────────
    // Score and messages
    // ─────────────────────────────────────────────────────────────
    /// Send a line of score/orchestra text to the engine
    InputMessage { message: Owned<String> },
    /// Parse and schedule a block of score text
    ReadScore { score: Owned<String> },
    /// Insert a score event relative to the current score time
    ScoreEvent {
        kind: ScoreEventKind,
        fields: Owned<Vec<Sample>>,
    },
    /// Insert a score event at an absolute time offset (seconds)
    ScoreEventAbsolute {
        kind: ScoreEventKind,
        fields: Owned<Vec<Sample>>,
        time_offset: f64,
    },

    // ─────────────────────────────────────────────────────────────
    // Function tables
    // ─────────────────────────────────────────────────────────────
    /// Copy a whole table into the caller's shared buffer
    TableCopyOut { table: i32, dest: TableBuffer },
    /// Overwrite a whole table from the caller's buffer
    TableCopyIn {
        table: i32,
        src: Owned<Vec<Sample>>,
    },
    /// Set a single table element
    TableSet { table: i32, index: i32, value: Sample },
}

impl DeferredCall {
    /// Tag of this call
    pub fn kind(&self) -> CallKind {
        match self {
            DeferredCall::InputMessage { .. } => CallKind::InputMessage,
            DeferredCall::ReadScore { .. } => CallKind::ReadScore,
            DeferredCall::ScoreEvent { .. } => CallKind::ScoreEvent,
            DeferredCall::ScoreEventAbsolute { .. } => CallKind::ScoreEventAbsolute,
            DeferredCall::TableCopyOut { .. } => CallKind::TableCopyOut,
            DeferredCall::TableCopyIn { .. } => CallKind::TableCopyIn,
            DeferredCall::TableSet { .. } => CallKind::TableSet,
        }
    }

    /// Run this call against the engine
    ///
    /// Called on the performance thread only. Effect failures have no caller
    /// left to report to, so they are logged and dropped.
    pub fn execute(self, core: &dyn EngineCore) {
        let kind = self.kind();
        let result = match self {
            DeferredCall::InputMessage { message } => {
                core.input_message(&message);
                Ok(())
            }
            DeferredCall::ReadScore { score } => core.read_score(&score),
            DeferredCall::ScoreEvent { kind, fields } => core.score_event(kind, &fields),
            DeferredCall::ScoreEventAbsolute {
                kind,
                fields,
                time_offset,
            } => core.score_event_absolute(kind, &fields, time_offset),
            DeferredCall::TableCopyOut { table, dest } => {
                let mut buffer = dest.lock();
                core.table_copy_out(table, &mut buffer);
                Ok(())
            }
            DeferredCall::TableCopyIn { table, src } => {
                core.table_copy_in(table, &src);
                Ok(())
            }
            DeferredCall::TableSet {
                table,
                index,
                value,
            } => {
                core.table_set(table, index, value);
                Ok(())
            }
        };

        if let Err(e) = result {
            log::warn!("Deferred {} failed: {}", kind, e);
        }
    }
}

impl std::fmt::Debug for DeferredCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferredCall::InputMessage { message } => f
                .debug_struct("InputMessage")
                .field("message", &message.as_str())
                .finish(),
            DeferredCall::ReadScore { score } => f
                .debug_struct("ReadScore")
                .field("score", &score.as_str())
                .finish(),
            DeferredCall::ScoreEvent { kind, fields } => f
                .debug_struct("ScoreEvent")
                .field("kind", kind)
                .field("fields", &fields.as_slice())
                .finish(),
            DeferredCall::ScoreEventAbsolute {
                kind,
                fields,
                time_offset,
            } => f
                .debug_struct("ScoreEventAbsolute")
                .field("kind", kind)
                .field("fields", &fields.as_slice())
                .field("time_offset", time_offset)
                .finish(),
            DeferredCall::TableCopyOut { table, .. } => f
                .debug_struct("TableCopyOut")
                .field("table", table)
                .finish_non_exhaustive(),
            DeferredCall::TableCopyIn { table, src } => f
                .debug_struct("TableCopyIn")
                .field("table", table)
                .field("len", &src.len())
                .finish(),
            DeferredCall::TableSet {
                table,
                index,
                value,
            } => f
                .debug_struct("TableSet")
                .field("table", table)
                .field("index", index)
                .field("value", value)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_size() {
        // Heap payloads are single basedrop pointers, so every variant
        // stays within a couple of words.
        let size = std::mem::size_of::<DeferredCall>();
        assert!(size <= 32, "DeferredCall is {} bytes, expected <= 32", size);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(CallKind::TableSet.to_string(), "table-set");
        assert_eq!(CallKind::ScoreEventAbsolute.name(), "score-event-absolute");
    }
}
