//! String channels: growth-only text buffers behind a spin lock
//!
//! The buffer keeps a trailing NUL so its capacity is always at least the
//! stored length + 1. Capacity never shrinks: a shorter string is copied in
//! place, a longer one swaps in a new allocation while the lock is held.
//! The replaced buffer is freed after the lock is released.

use crate::sync::SpinLock;

#[derive(Debug)]
struct StringPayload {
    /// Buffer whose length is the channel capacity
    buf: Box<[u8]>,
    /// Stored text length, excluding the terminator
    len: usize,
}

/// Variable-length text channel storage
#[derive(Debug)]
pub struct StringChannel {
    payload: SpinLock<StringPayload>,
}

impl StringChannel {
    /// Create an empty string channel (capacity 1, just the terminator)
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Create an empty string channel with room for `capacity - 1` bytes of text
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            payload: SpinLock::new(StringPayload {
                buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
                len: 0,
            }),
        }
    }

    /// Replace the channel text
    ///
    /// Returns `true` if the buffer had to be reallocated.
    pub fn set(&self, text: &str) -> bool {
        let bytes = text.as_bytes();
        let needed = bytes.len() + 1;

        let mut payload = self.payload.lock();
        let replaced = if needed > payload.buf.len() {
            let mut grown = vec![0u8; needed].into_boxed_slice();
            grown[..bytes.len()].copy_from_slice(bytes);
            Some(std::mem::replace(&mut payload.buf, grown))
        } else {
            payload.buf[..bytes.len()].copy_from_slice(bytes);
            payload.buf[bytes.len()] = 0;
            None
        };
        payload.len = bytes.len();
        drop(payload);

        // Old buffer is released outside the critical section
        replaced.is_some()
    }

    /// Copy the channel text into `dest`, replacing its contents
    pub fn get_into(&self, dest: &mut String) {
        dest.clear();
        let payload = self.payload.lock();
        dest.push_str(&String::from_utf8_lossy(&payload.buf[..payload.len]));
    }

    /// Current text as an owned string
    pub fn get(&self) -> String {
        let mut text = String::new();
        self.get_into(&mut text);
        text
    }

    /// Current buffer capacity in bytes, including the terminator
    pub fn capacity(&self) -> usize {
        self.payload.lock().buf.len()
    }

    /// Address of the current buffer, used to observe reallocation
    pub fn buffer_ptr(&self) -> *const u8 {
        self.payload.lock().buf.as_ptr()
    }
}

impl Default for StringChannel {
    fn default() -> Self {
        Self::new()
    }
}
