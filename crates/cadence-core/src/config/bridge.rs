//! Bridge configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelSpec;
use crate::types::{DEFAULT_BLOCK_SIZE, DEFAULT_QUEUE_CAPACITY};

/// Configuration for a [`Bridge`](crate::engine::Bridge)
///
/// Every field has a default, so a partial YAML file is valid:
///
/// ```yaml
/// realtime: true
/// block_size: 32
/// channels:
///   - { name: cutoff, kind: control }
///   - { name: meter, kind: control, direction: output }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Engine runs with real-time audio input
    /// When set, table copy-in serializes against the init pass.
    /// Default: false
    pub realtime: bool,

    /// Samples per processing block (ksmps); audio channel length
    /// Default: 64
    pub block_size: usize,

    /// Slots in the deferred call queue
    /// Default: 64
    pub queue_capacity: usize,

    /// Wake-up period of the reclaimer thread in milliseconds
    /// Default: 100
    pub reclaim_interval_ms: u64,

    /// Channels to create at startup
    pub channels: Vec<ChannelSpec>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            realtime: false,
            block_size: DEFAULT_BLOCK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reclaim_interval_ms: 100,
            channels: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Set real-time mode
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Set the block size in samples
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the deferred queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Add a channel to create at startup
    pub fn with_channel(mut self, spec: ChannelSpec) -> Self {
        self.channels.push(spec);
        self
    }

    /// Reclaimer wake-up period
    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_millis(self.reclaim_interval_ms.max(1))
    }
}
