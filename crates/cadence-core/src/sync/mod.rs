//! Synchronization primitives for real-time safe shared state
//!
//! The performance thread must never sleep on a lock held by a caller.
//! Payloads it shares with callers are guarded by [`SpinLock`], whose
//! critical sections are bounded by the size of the payload being copied.

mod spinlock;

pub use spinlock::{SpinLock, SpinLockGuard};
