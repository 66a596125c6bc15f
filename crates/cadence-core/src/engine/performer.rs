//! Performance loop: drain deferred calls, then process one block
//!
//! The block boundary is the only place deferred calls run, so the signal
//! graph never sees engine state change mid-block.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::bridge::Bridge;
use crate::channel::ChannelTable;
use crate::error::{BridgeError, BridgeResult};

/// Per-block signal processing, supplied by the engine
pub trait BlockProcessor: Send {
    /// Compute one block of `block_size` samples
    ///
    /// Reads input channels and writes output channels through `channels`.
    fn process_block(&mut self, channels: &ChannelTable, block_size: usize);
}

/// Drives one bridge from the performance thread
pub struct Performer {
    bridge: Arc<Bridge>,
    processor: Box<dyn BlockProcessor>,
    blocks: u64,
}

impl Performer {
    pub fn new(bridge: Arc<Bridge>, processor: Box<dyn BlockProcessor>) -> Self {
        Self {
            bridge,
            processor,
            blocks: 0,
        }
    }

    /// Run deferred calls, then one processing block
    ///
    /// Returns the number of deferred calls executed.
    pub fn perform_block(&mut self) -> usize {
        let executed = self.bridge.drain_queue();
        self.processor
            .process_block(self.bridge.channels(), self.bridge.block_size());
        self.blocks += 1;
        executed
    }

    /// Blocks processed so far
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }
}

/// A [`Performer`] running on its own thread at a fixed block period
pub struct PerformanceThread {
    stop: Arc<AtomicBool>,
    blocks: Arc<AtomicU64>,
    thread: Option<JoinHandle<Performer>>,
}

impl PerformanceThread {
    /// Start performing one block every `period`
    pub fn spawn(mut performer: Performer, period: Duration) -> BridgeResult<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let blocks = Arc::new(AtomicU64::new(0));
        let thread_stop = Arc::clone(&stop);
        let thread_blocks = Arc::clone(&blocks);

        let thread = thread::Builder::new()
            .name("cadence-perf".to_string())
            .spawn(move || {
                log::info!("Performance thread started ({:?} per block)", period);
                let mut deadline = Instant::now();
                while !thread_stop.load(Ordering::Acquire) {
                    performer.perform_block();
                    thread_blocks.store(performer.blocks(), Ordering::Relaxed);

                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        // Overran the period; don't try to catch up
                        deadline = now;
                    }
                }
                log::info!("Performance thread stopped after {} blocks", performer.blocks());
                performer
            })
            .map_err(|source| BridgeError::ThreadSpawn {
                name: "performance",
                source,
            })?;

        Ok(Self {
            stop,
            blocks,
            thread: Some(thread),
        })
    }

    /// Blocks processed so far
    pub fn blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Stop after the current block and hand the performer back
    pub fn stop(mut self) -> Option<Performer> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<Performer> {
        self.stop.store(true, Ordering::Release);
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(performer) => Some(performer),
            Err(_) => {
                log::error!("Performance thread panicked");
                None
            }
        }
    }
}

impl Drop for PerformanceThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelSpec;
    use crate::config::BridgeConfig;
    use crate::testing::{Effect, RecordingCore};
    use crate::types::{ChannelDirection, Sample};

    /// Copies the "in" control channel to the "out" control channel each block
    struct Follower;

    impl BlockProcessor for Follower {
        fn process_block(&mut self, channels: &ChannelTable, _block_size: usize) {
            let value = channels
                .control("in", ChannelDirection::Input)
                .map(|c| c.get())
                .unwrap_or(0.0);
            if let Ok(out) = channels.control("out", ChannelDirection::Output) {
                out.set(value);
            }
        }
    }

    fn bridge() -> (Arc<Bridge>, Arc<RecordingCore>) {
        let core = Arc::new(RecordingCore::new());
        let config = BridgeConfig::default()
            .with_channel(ChannelSpec::control("in").with_direction(ChannelDirection::Input))
            .with_channel(ChannelSpec::control("out").with_direction(ChannelDirection::Output));
        let bridge = Arc::new(Bridge::new(config, core.clone()).unwrap());
        (bridge, core)
    }

    #[test]
    fn test_perform_block_drains_before_processing() {
        let (bridge, core) = bridge();
        let mut performer = Performer::new(Arc::clone(&bridge), Box::new(Follower));

        bridge.enqueue_table_set(1, 2, 3.0).unwrap();
        bridge.set_control_channel("in", 0.75);

        assert_eq!(performer.perform_block(), 1);
        assert_eq!(performer.blocks(), 1);
        assert_eq!(bridge.get_control_channel("out").unwrap(), 0.75);
        assert_eq!(
            core.effects(),
            vec![Effect::TableSet {
                table: 1,
                index: 2,
                value: 3.0
            }]
        );

        assert_eq!(performer.perform_block(), 0);
    }

    #[test]
    fn test_thread_executes_calls_from_many_producers() {
        let (bridge, core) = bridge();
        let performer = Performer::new(Arc::clone(&bridge), Box::new(Follower));
        let perf = PerformanceThread::spawn(performer, Duration::from_millis(1)).unwrap();

        let producers: Vec<_> = (0..3)
            .map(|p| {
                let bridge = Arc::clone(&bridge);
                thread::spawn(move || {
                    for i in 0..20 {
                        while bridge.enqueue_table_set(p, i, i as Sample).is_err() {
                            thread::sleep(Duration::from_millis(1));
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        // Wait for the performance thread to catch up
        for _ in 0..500 {
            if core.effects().len() == 60 {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }

        let performer = perf.stop().unwrap();
        assert!(performer.blocks() > 0);
        assert_eq!(core.effects().len(), 60);
        assert_eq!(bridge.queue().pending(), 0);
    }
}
