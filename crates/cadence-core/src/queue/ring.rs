//! Bounded call queue between API threads and the performance thread
//!
//! Storage is an `rtrb` ring buffer, allocated on the first enqueue.
//!
//! - **Producers**: any number of API threads. `rtrb` is single-producer, so
//!   enqueues are serialized by a producer-side mutex held only for the
//!   O(1) slot write. The performance thread never takes this mutex.
//! - **Consumer**: the performance thread alone. The consumer half sits in a
//!   [`SpinLock`] that is only ever `try_lock`ed, so a misplaced second
//!   drainer returns immediately instead of waiting.
//!
//! A full ring rejects the new call and hands it back; nothing already
//! queued is overwritten.

use std::sync::{Mutex, OnceLock, PoisonError};

use super::call::DeferredCall;
use crate::engine::EngineCore;
use crate::sync::SpinLock;

struct QueueStorage {
    producer: Mutex<rtrb::Producer<DeferredCall>>,
    consumer: SpinLock<rtrb::Consumer<DeferredCall>>,
}

/// Deferred-call queue drained once per processing block
pub struct CallQueue {
    capacity: usize,
    storage: OnceLock<QueueStorage>,
}

impl CallQueue {
    /// Create a queue with room for `capacity` pending calls
    ///
    /// No memory is allocated until the first [`enqueue`](Self::enqueue).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            storage: OnceLock::new(),
        }
    }

    /// Maximum number of pending calls
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the ring buffer has been allocated yet
    pub fn is_allocated(&self) -> bool {
        self.storage.get().is_some()
    }

    /// Number of calls waiting to be drained
    pub fn pending(&self) -> usize {
        self.storage
            .get()
            .map(|s| self.capacity - s.lock_producer().slots())
            .unwrap_or(0)
    }

    fn storage(&self) -> &QueueStorage {
        self.storage.get_or_init(|| {
            log::debug!("Allocating deferred call queue ({} slots)", self.capacity);
            let (producer, consumer) = rtrb::RingBuffer::new(self.capacity);
            QueueStorage {
                producer: Mutex::new(producer),
                consumer: SpinLock::new(consumer),
            }
        })
    }

    /// Queue a call for the performance thread
    ///
    /// Never blocks the performance thread. Returns `Err(call)` if the ring
    /// is full; the call is handed back untouched.
    pub fn enqueue(&self, call: DeferredCall) -> Result<(), DeferredCall> {
        let mut producer = self.storage().lock_producer();
        producer.push(call).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Execute every call that was queued when the drain started
    ///
    /// Must only be called from the performance thread, between blocks.
    /// The number of pending calls is snapshotted first; calls published
    /// while draining wait for the next pass. Returns the number executed.
    pub fn drain(&self, core: &dyn EngineCore) -> usize {
        let Some(storage) = self.storage.get() else {
            return 0;
        };
        let Some(mut consumer) = storage.consumer.try_lock() else {
            return 0;
        };

        let target = consumer.slots();
        let mut executed = 0;
        while executed < target {
            match consumer.pop() {
                Ok(call) => call.execute(core),
                Err(rtrb::PopError::Empty) => break,
            }
            executed += 1;
        }
        executed
    }
}

impl QueueStorage {
    fn lock_producer(&self) -> std::sync::MutexGuard<'_, rtrb::Producer<DeferredCall>> {
        // A panic while holding this lock cannot leave the ring half-written
        self.producer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Reclaimer;
    use crate::testing::{Effect, RecordingCore};
    use crate::types::ScoreEventKind;
    use basedrop::Owned;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn table_set(index: i32) -> DeferredCall {
        DeferredCall::TableSet {
            table: 1,
            index,
            value: index as f64,
        }
    }

    #[test]
    fn test_lazy_allocation() {
        let queue = CallQueue::new(8);
        assert!(!queue.is_allocated());

        let core = RecordingCore::new();
        assert_eq!(queue.drain(&core), 0);
        assert!(!queue.is_allocated());

        queue.enqueue(table_set(0)).unwrap();
        assert!(queue.is_allocated());
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_drain_empty_is_noop() {
        let queue = CallQueue::new(8);
        let core = RecordingCore::new();
        queue.enqueue(table_set(0)).unwrap();
        assert_eq!(queue.drain(&core), 1);

        assert_eq!(queue.drain(&core), 0);
        assert_eq!(core.effects().len(), 1);
    }

    #[test]
    fn test_fifo_order_and_exact_arguments() {
        let reclaimer = Reclaimer::spawn(Duration::from_millis(10)).unwrap();
        let handle = reclaimer.handle();
        let queue = CallQueue::new(64);
        let core = RecordingCore::new();

        queue
            .enqueue(DeferredCall::InputMessage {
                message: Owned::new(&handle, "instr 1".to_string()),
            })
            .unwrap();
        queue
            .enqueue(DeferredCall::ScoreEvent {
                kind: ScoreEventKind::Instrument,
                fields: Owned::new(&handle, vec![1.0, 0.0, 2.5]),
            })
            .unwrap();
        queue
            .enqueue(DeferredCall::ScoreEventAbsolute {
                kind: ScoreEventKind::Table,
                fields: Owned::new(&handle, vec![3.0, 0.0, 1024.0, 10.0, 1.0]),
                time_offset: 1.25,
            })
            .unwrap();
        queue.enqueue(table_set(5)).unwrap();

        assert_eq!(queue.drain(&core), 4);
        assert_eq!(
            core.effects(),
            vec![
                Effect::InputMessage("instr 1".to_string()),
                Effect::ScoreEvent {
                    kind: ScoreEventKind::Instrument,
                    fields: vec![1.0, 0.0, 2.5],
                },
                Effect::ScoreEventAbsolute {
                    kind: ScoreEventKind::Table,
                    fields: vec![3.0, 0.0, 1024.0, 10.0, 1.0],
                    time_offset: 1.25,
                },
                Effect::TableSet {
                    table: 1,
                    index: 5,
                    value: 5.0,
                },
            ]
        );
    }

    #[test]
    fn test_full_queue_hands_call_back() {
        let queue = CallQueue::new(2);
        queue.enqueue(table_set(0)).unwrap();
        queue.enqueue(table_set(1)).unwrap();

        let rejected = queue.enqueue(table_set(2)).unwrap_err();
        assert!(matches!(rejected, DeferredCall::TableSet { index: 2, .. }));

        // Nothing already queued was overwritten
        let core = RecordingCore::new();
        assert_eq!(queue.drain(&core), 2);
        assert_eq!(
            core.effects(),
            vec![
                Effect::TableSet { table: 1, index: 0, value: 0.0 },
                Effect::TableSet { table: 1, index: 1, value: 1.0 },
            ]
        );
    }

    #[test]
    fn test_calls_queued_during_drain_wait_for_next_pass() {
        let queue = Arc::new(CallQueue::new(16));
        let core = RecordingCore::new();

        // Every executed call enqueues another one while the drain is running
        {
            let queue = Arc::clone(&queue);
            core.on_effect(move |_| {
                let _ = queue.enqueue(table_set(99));
            });
        }

        queue.enqueue(table_set(0)).unwrap();
        queue.enqueue(table_set(1)).unwrap();

        assert_eq!(queue.drain(&core), 2);
        assert_eq!(queue.pending(), 2);
        assert_eq!(core.effects().len(), 2);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        const PRODUCERS: i32 = 4;
        const PER_PRODUCER: i32 = 500;

        let queue = Arc::new(CallQueue::new(64));
        let core = RecordingCore::new();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut call = DeferredCall::TableSet {
                            table: p,
                            index: i,
                            value: 0.0,
                        };
                        // Back off until the consumer makes room
                        while let Err(rejected) = queue.enqueue(call) {
                            call = rejected;
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let mut drained = 0;
        while drained < (PRODUCERS * PER_PRODUCER) as usize {
            drained += queue.drain(&core);
            thread::yield_now();
        }
        for producer in producers {
            producer.join().unwrap();
        }

        // Per-producer order is preserved
        let effects = core.effects();
        assert_eq!(effects.len(), (PRODUCERS * PER_PRODUCER) as usize);
        for p in 0..PRODUCERS {
            let indices: Vec<i32> = effects
                .iter()
                .filter_map(|e| match e {
                    Effect::TableSet { table, index, .. } if *table == p => Some(*index),
                    _ => None,
                })
                .collect();
            assert_eq!(indices, (0..PER_PRODUCER).collect::<Vec<_>>());
        }
    }
}
