//! Test double for [`EngineCore`] that records every effect

use std::collections::HashMap;
use std::sync::Mutex;

use crate::engine::EngineCore;
use crate::error::{EngineError, EngineResult};
use crate::types::{Sample, ScoreEventKind};

/// One recorded engine effect, with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    InputMessage(String),
    ReadScore(String),
    ScoreEvent {
        kind: ScoreEventKind,
        fields: Vec<Sample>,
    },
    ScoreEventAbsolute {
        kind: ScoreEventKind,
        fields: Vec<Sample>,
        time_offset: f64,
    },
    TableCopyOut {
        table: i32,
        len: usize,
    },
    TableCopyIn {
        table: i32,
        data: Vec<Sample>,
    },
    TableSet {
        table: i32,
        index: i32,
        value: Sample,
    },
}

type EffectHook = Box<dyn Fn(&Effect) + Send + Sync>;

/// Engine core that records effects and keeps tables in a map
#[derive(Default)]
pub struct RecordingCore {
    effects: Mutex<Vec<Effect>>,
    tables: Mutex<HashMap<i32, Vec<Sample>>>,
    hook: Mutex<Option<EffectHook>>,
}

impl RecordingCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every effect recorded so far, in call order
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().unwrap().clone()
    }

    /// Run `hook` after each recorded effect
    pub fn on_effect(&self, hook: impl Fn(&Effect) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn set_table(&self, table: i32, data: Vec<Sample>) {
        self.tables.lock().unwrap().insert(table, data);
    }

    pub fn table(&self, table: i32) -> Option<Vec<Sample>> {
        self.tables.lock().unwrap().get(&table).cloned()
    }

    fn record(&self, effect: Effect) {
        self.effects.lock().unwrap().push(effect.clone());
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(&effect);
        }
    }
}

impl EngineCore for RecordingCore {
    fn input_message(&self, message: &str) {
        self.record(Effect::InputMessage(message.to_string()));
    }

    fn read_score(&self, score: &str) -> EngineResult<()> {
        self.record(Effect::ReadScore(score.to_string()));
        if score.trim().is_empty() {
            return Err(EngineError::Score("empty score".to_string()));
        }
        Ok(())
    }

    fn score_event(&self, kind: ScoreEventKind, fields: &[Sample]) -> EngineResult<()> {
        self.record(Effect::ScoreEvent {
            kind,
            fields: fields.to_vec(),
        });
        Ok(())
    }

    fn score_event_absolute(
        &self,
        kind: ScoreEventKind,
        fields: &[Sample],
        time_offset: f64,
    ) -> EngineResult<()> {
        self.record(Effect::ScoreEventAbsolute {
            kind,
            fields: fields.to_vec(),
            time_offset,
        });
        Ok(())
    }

    fn table_copy_out(&self, table: i32, dest: &mut [Sample]) {
        if let Some(data) = self.tables.lock().unwrap().get(&table) {
            let n = data.len().min(dest.len());
            dest[..n].copy_from_slice(&data[..n]);
        }
        self.record(Effect::TableCopyOut {
            table,
            len: dest.len(),
        });
    }

    fn table_copy_in(&self, table: i32, src: &[Sample]) {
        self.tables.lock().unwrap().insert(table, src.to_vec());
        self.record(Effect::TableCopyIn {
            table,
            data: src.to_vec(),
        });
    }

    fn table_set(&self, table: i32, index: i32, value: Sample) {
        if let Some(slot) = self
            .tables
            .lock()
            .unwrap()
            .get_mut(&table)
            .and_then(|data| usize::try_from(index).ok().and_then(|i| data.get_mut(i)))
        {
            *slot = value;
        }
        self.record(Effect::TableSet {
            table,
            index,
            value,
        });
    }
}
