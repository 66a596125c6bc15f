//! RT-safe reclamation of payloads handed to the performance thread
//!
//! Deferred calls carry their heap payloads (score text, p-field arrays,
//! table data) as `basedrop::Owned`/`Shared` pointers. When the performance
//! thread drops a drained call, nothing is freed there: the pointer is
//! enqueued and the allocation is released on the reclaimer thread.
//!
//! Each bridge owns one [`Reclaimer`]. Its collector lives on a dedicated
//! thread (the `Collector` is `!Sync`). Dropping the reclaimer signals the
//! thread to wind down, but payloads may outlive it (a caller's
//! `TableBuffer`, for one): the thread keeps collecting until every handle
//! and every allocation is gone, then frees the collector and exits.
//!
//! ```ignore
//! let reclaimer = Reclaimer::spawn(Duration::from_millis(100))?;
//! let text = basedrop::Owned::new(&reclaimer.handle(), "i 1 0 1".to_string());
//! // Dropping `text` on any thread defers the free to the reclaimer thread
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use basedrop::{Collector, Handle};

use crate::error::{BridgeError, BridgeResult};

/// Owner of the background collection thread
pub struct Reclaimer {
    handle: Handle,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Reclaimer {
    /// Start the reclaimer thread, collecting every `interval`
    pub fn spawn(interval: Duration) -> BridgeResult<Self> {
        // Channel to send the handle from the collector thread back here
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("cadence-reclaim".to_string())
            .spawn(move || {
                // Collector is !Sync, so it is created on the thread that runs it
                let mut collector = Collector::new();
                if tx.send(collector.handle()).is_err() {
                    return;
                }

                log::info!("Reclaimer thread started");
                while !thread_stop.load(Ordering::Acquire) {
                    collector.collect();
                    thread::park_timeout(interval);
                }

                // Drain whatever is still alive once its last owner lets go
                loop {
                    collector.collect();
                    match collector.try_cleanup() {
                        Ok(()) => break,
                        Err(still_in_use) => {
                            log::trace!(
                                "Reclaimer waiting on {} allocations, {} handles",
                                still_in_use.alloc_count(),
                                still_in_use.handle_count()
                            );
                            collector = still_in_use;
                            thread::park_timeout(interval);
                        }
                    }
                }
                log::info!("Reclaimer thread stopped");
            })
            .map_err(|source| BridgeError::ThreadSpawn {
                name: "reclaimer",
                source,
            })?;

        let handle = rx.recv().map_err(|_| BridgeError::ReclaimerUnavailable)?;

        Ok(Self {
            handle,
            stop,
            thread: Some(thread),
        })
    }

    /// Handle for creating `Owned`/`Shared` payloads
    ///
    /// Payloads created here stay valid after the reclaimer is dropped and
    /// are still freed off the calling thread.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Not joined: the thread outlives us while payloads from our handle
        // are still alive
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
        }
    }
}

impl std::fmt::Debug for Reclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reclaimer")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Owned;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_drop_is_deferred_to_reclaimer_thread() {
        let reclaimer = Reclaimer::spawn(Duration::from_millis(5)).unwrap();
        let dropped = Arc::new(AtomicBool::new(false));

        let value = Owned::new(&reclaimer.handle(), DropFlag(Arc::clone(&dropped)));
        drop(value);

        // Dropping only queued the allocation; the collector frees it later
        for _ in 0..200 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_returns_without_waiting_for_interval() {
        let reclaimer = Reclaimer::spawn(Duration::from_secs(60)).unwrap();
        let started = std::time::Instant::now();
        drop(reclaimer);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_payload_outliving_reclaimer_is_freed() {
        let reclaimer = Reclaimer::spawn(Duration::from_millis(5)).unwrap();
        let dropped = Arc::new(AtomicBool::new(false));
        let value = Owned::new(&reclaimer.handle(), DropFlag(Arc::clone(&dropped)));

        drop(reclaimer);
        thread::sleep(Duration::from_millis(20));
        assert!(!dropped.load(Ordering::SeqCst));

        drop(value);
        for _ in 0..200 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(dropped.load(Ordering::SeqCst));
    }
}
