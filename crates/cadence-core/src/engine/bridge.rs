//! The engine handle shared by API threads and the performance thread
//!
//! Every public operation takes one of three routes:
//!
//! - **Gate**: take the API mutex, run the engine effect now, return its result
//! - **Channel**: touch one channel payload under that channel's atomic/spin lock
//! - **Deferred**: queue a call; the performance thread runs it at the next
//!   block boundary via [`Bridge::drain_queue`]
//!
//! Gate and deferred paths reach the same [`EngineCore`] methods without
//! mutual exclusion between them. A deployment should route each call kind
//! through one path, or order the two itself.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use basedrop::{Handle, Owned, Shared};

use super::effects::EngineCore;
use super::gc::Reclaimer;
use crate::channel::{ChannelInfo, ChannelResult, ChannelTable, SpectralFrame};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult, EngineResult};
use crate::queue::{CallQueue, DeferredCall, TableBuffer};
use crate::sync::SpinLock;
use crate::types::{ChannelDirection, Sample, ScoreEventKind};

/// Concurrency bridge for one engine instance
///
/// Share it between threads as `Arc<Bridge>`.
pub struct Bridge {
    config: BridgeConfig,
    core: Arc<dyn EngineCore>,
    channels: ChannelTable,
    queue: CallQueue,
    /// Serializes all gate operations
    api_lock: Mutex<()>,
    /// Serializes table copy-in against the engine's init pass (real-time mode)
    init_pass_lock: Mutex<()>,
    // Dropped last so queued payloads get a final collection pass
    reclaimer: Reclaimer,
}

impl Bridge {
    /// Create a bridge for `core`, registering the configured channels
    pub fn new(config: BridgeConfig, core: Arc<dyn EngineCore>) -> BridgeResult<Self> {
        let channels = ChannelTable::new(&config.channels, config.block_size)?;
        let reclaimer = Reclaimer::spawn(config.reclaim_interval())?;

        log::info!(
            "Bridge created: {} channels, block size {}, queue capacity {}, realtime {}",
            channels.len(),
            config.block_size,
            config.queue_capacity,
            config.realtime
        );

        Ok(Self {
            queue: CallQueue::new(config.queue_capacity),
            channels,
            core,
            api_lock: Mutex::new(()),
            init_pass_lock: Mutex::new(()),
            reclaimer,
            config,
        })
    }

    /// Bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Whether table copy-in serializes against the init pass
    pub fn is_realtime(&self) -> bool {
        self.config.realtime
    }

    /// Samples per processing block
    pub fn block_size(&self) -> usize {
        self.channels.block_size()
    }

    /// Channel table, for the performance thread's own reads and writes
    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Deferred call queue
    pub fn queue(&self) -> &CallQueue {
        &self.queue
    }

    /// Handle for allocating payloads reclaimed off the performance thread
    pub fn reclaim_handle(&self) -> Handle {
        self.reclaimer.handle()
    }

    /// Lock held by the engine while it runs an init pass
    ///
    /// In real-time mode, [`table_copy_in`](Self::table_copy_in) waits on it.
    pub fn lock_init_pass(&self) -> MutexGuard<'_, ()> {
        self.init_pass_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_api(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, a panicking holder cannot corrupt it
        self.api_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────
    // Deferred calls
    // ─────────────────────────────────────────────────────────────

    /// Queue a call for the performance thread
    ///
    /// Returns immediately. If the queue is full the call is handed back in
    /// [`BridgeError::QueueFull`].
    pub fn enqueue(&self, call: DeferredCall) -> BridgeResult<()> {
        self.queue.enqueue(call).map_err(|call| {
            log::warn!(
                "Deferred call queue full ({} slots), rejecting {}",
                self.queue.capacity(),
                call.kind()
            );
            BridgeError::QueueFull(call)
        })
    }

    /// Queue an orchestra/score message
    pub fn enqueue_input_message(&self, message: &str) -> BridgeResult<()> {
        let message = Owned::new(&self.reclaimer.handle(), message.to_string());
        self.enqueue(DeferredCall::InputMessage { message })
    }

    /// Queue a block of score text
    pub fn enqueue_read_score(&self, score: &str) -> BridgeResult<()> {
        let score = Owned::new(&self.reclaimer.handle(), score.to_string());
        self.enqueue(DeferredCall::ReadScore { score })
    }

    /// Queue a score event relative to the current score time
    pub fn enqueue_score_event(&self, kind: ScoreEventKind, fields: &[Sample]) -> BridgeResult<()> {
        let fields = Owned::new(&self.reclaimer.handle(), fields.to_vec());
        self.enqueue(DeferredCall::ScoreEvent { kind, fields })
    }

    /// Queue a score event at an absolute time offset
    pub fn enqueue_score_event_absolute(
        &self,
        kind: ScoreEventKind,
        fields: &[Sample],
        time_offset: f64,
    ) -> BridgeResult<()> {
        let fields = Owned::new(&self.reclaimer.handle(), fields.to_vec());
        self.enqueue(DeferredCall::ScoreEventAbsolute {
            kind,
            fields,
            time_offset,
        })
    }

    /// Queue a copy of `table` into `dest`
    ///
    /// `dest` is filled when the performance thread drains the call.
    pub fn enqueue_table_copy_out(&self, table: i32, dest: &TableBuffer) -> BridgeResult<()> {
        self.enqueue(DeferredCall::TableCopyOut {
            table,
            dest: dest.clone(),
        })
    }

    /// Queue an overwrite of `table` with a copy of `src`
    pub fn enqueue_table_copy_in(&self, table: i32, src: &[Sample]) -> BridgeResult<()> {
        let src = Owned::new(&self.reclaimer.handle(), src.to_vec());
        self.enqueue(DeferredCall::TableCopyIn { table, src })
    }

    /// Queue a single table element write
    pub fn enqueue_table_set(&self, table: i32, index: i32, value: Sample) -> BridgeResult<()> {
        self.enqueue(DeferredCall::TableSet {
            table,
            index,
            value,
        })
    }

    /// Allocate a zeroed destination buffer for deferred table copy-out
    ///
    /// The buffer may outlive the bridge; it is freed by the reclaimer
    /// thread once the last clone is dropped.
    pub fn table_buffer(&self, len: usize) -> TableBuffer {
        Shared::new(&self.reclaimer.handle(), SpinLock::new(vec![0.0; len]))
    }

    /// Run every call queued before this drain started
    ///
    /// Performance thread only, once per block boundary. Returns the number
    /// of calls executed.
    pub fn drain_queue(&self) -> usize {
        self.queue.drain(self.core.as_ref())
    }

    // ─────────────────────────────────────────────────────────────
    // Gate operations
    // ─────────────────────────────────────────────────────────────

    /// Send an orchestra/score message now
    pub fn input_message(&self, message: &str) {
        let _api = self.lock_api();
        self.core.input_message(message);
    }

    /// Parse and schedule score text now
    pub fn read_score(&self, score: &str) -> EngineResult<()> {
        let _api = self.lock_api();
        self.core.read_score(score)
    }

    /// Copy `table` into `dest` now
    pub fn table_copy_out(&self, table: i32, dest: &mut [Sample]) {
        let _api = self.lock_api();
        self.core.table_copy_out(table, dest);
    }

    /// Overwrite `table` from `src` now
    ///
    /// Only races with the engine's init pass, so it takes the init-pass
    /// lock in real-time mode and no lock otherwise.
    pub fn table_copy_in(&self, table: i32, src: &[Sample]) {
        let _init_pass = self.config.realtime.then(|| self.lock_init_pass());
        self.core.table_copy_in(table, src);
    }

    /// Set one table element now
    pub fn table_set(&self, table: i32, index: i32, value: Sample) {
        let _api = self.lock_api();
        self.core.table_set(table, index, value);
    }

    /// Insert a score event now
    pub fn score_event(&self, kind: ScoreEventKind, fields: &[Sample]) -> EngineResult<()> {
        let _api = self.lock_api();
        self.core.score_event(kind, fields)
    }

    /// Insert a score event at an absolute time offset now
    pub fn score_event_absolute(
        &self,
        kind: ScoreEventKind,
        fields: &[Sample],
        time_offset: f64,
    ) -> EngineResult<()> {
        let _api = self.lock_api();
        self.core.score_event_absolute(kind, fields, time_offset)
    }

    // ─────────────────────────────────────────────────────────────
    // Channels
    // ─────────────────────────────────────────────────────────────

    /// Read an output control channel
    ///
    /// An empty name reads as 0.0 without a lookup.
    pub fn get_control_channel(&self, name: &str) -> ChannelResult<Sample> {
        if name.is_empty() {
            return Ok(0.0);
        }
        Ok(self.channels.control(name, ChannelDirection::Output)?.get())
    }

    /// Write an input control channel; no-op if the lookup fails
    pub fn set_control_channel(&self, name: &str, value: Sample) {
        match self.channels.control(name, ChannelDirection::Input) {
            Ok(channel) => channel.set(value),
            Err(e) => log::trace!("set_control_channel ignored: {}", e),
        }
    }

    /// Copy one block from an output audio channel into `dest`
    pub fn get_audio_channel(&self, name: &str, dest: &mut [Sample]) {
        if name.is_empty() {
            return;
        }
        match self.channels.audio(name, ChannelDirection::Output) {
            Ok(channel) => {
                channel.read_into(dest);
            }
            Err(e) => log::trace!("get_audio_channel ignored: {}", e),
        }
    }

    /// Copy one block from `src` into an input audio channel
    pub fn set_audio_channel(&self, name: &str, src: &[Sample]) {
        match self.channels.audio(name, ChannelDirection::Input) {
            Ok(channel) => {
                channel.write_from(src);
            }
            Err(e) => log::trace!("set_audio_channel ignored: {}", e),
        }
    }

    /// Copy the text of an output string channel into `dest`
    pub fn get_string_channel(&self, name: &str, dest: &mut String) {
        if name.is_empty() {
            return;
        }
        match self.channels.string(name, ChannelDirection::Output) {
            Ok(channel) => channel.get_into(dest),
            Err(e) => log::trace!("get_string_channel ignored: {}", e),
        }
    }

    /// Replace the text of an input string channel
    pub fn set_string_channel(&self, name: &str, text: &str) {
        match self.channels.string(name, ChannelDirection::Input) {
            Ok(channel) => {
                channel.set(text);
            }
            Err(e) => log::trace!("set_string_channel ignored: {}", e),
        }
    }

    /// Copy an output spectral channel into `dest`
    pub fn get_spectral_channel(&self, name: &str, dest: &mut SpectralFrame) -> ChannelResult<()> {
        self.channels
            .spectral(name, ChannelDirection::Output)?
            .get_into(dest);
        Ok(())
    }

    /// Copy `src` into an input spectral channel
    ///
    /// Fails with [`ChannelError::InvalidFrame`](crate::channel::ChannelError::InvalidFrame)
    /// when the frame's bin count is out of range.
    pub fn set_spectral_channel(&self, name: &str, src: &SpectralFrame) -> ChannelResult<()> {
        self.channels.spectral(name, ChannelDirection::Input)?.set(src)
    }

    /// Name, kind and direction of every channel
    pub fn channel_list(&self) -> Vec<ChannelInfo> {
        self.channels.list()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("pending_calls", &self.queue.pending())
            .finish_non_exhaustive()
    }
}
