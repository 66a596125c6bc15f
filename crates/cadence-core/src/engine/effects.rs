//! The engine effects the bridge serializes access to
//!
//! Score parsing, table storage and message handling live in the engine
//! itself. The bridge only decides *when* and *under which lock* they run:
//! immediately under the API mutex (gate), or later on the performance
//! thread (deferred queue). Both paths call the same methods, so
//! implementations take `&self` and must be `Sync`.

use crate::error::EngineResult;
use crate::types::{Sample, ScoreEventKind};

/// Engine-side effects invoked by the gate and by queue drains
pub trait EngineCore: Send + Sync {
    /// Handle one line of orchestra/score text
    fn input_message(&self, message: &str);

    /// Parse and schedule a block of score text
    fn read_score(&self, score: &str) -> EngineResult<()>;

    /// Insert a score event relative to the current score time
    fn score_event(&self, kind: ScoreEventKind, fields: &[Sample]) -> EngineResult<()>;

    /// Insert a score event at `time_offset` seconds from the start of performance
    fn score_event_absolute(
        &self,
        kind: ScoreEventKind,
        fields: &[Sample],
        time_offset: f64,
    ) -> EngineResult<()>;

    /// Copy the contents of `table` into `dest`
    fn table_copy_out(&self, table: i32, dest: &mut [Sample]);

    /// Overwrite the contents of `table` from `src`
    fn table_copy_in(&self, table: i32, src: &[Sample]);

    /// Set element `index` of `table`
    fn table_set(&self, table: i32, index: i32, value: Sample);
}
