//! Control channels: a single engine float behind an atomic
//!
//! Control values are the hottest, most frequently touched channel kind.
//! They are stored as the raw `f64` bits in an `AtomicU64`, so reads and
//! writes never take a lock.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Sample;

/// Lock-free scalar channel storage
#[derive(Debug)]
pub struct ControlChannel {
    bits: AtomicU64,
}

impl ControlChannel {
    /// Create a control channel holding `value`
    pub fn new(value: Sample) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    /// Read the current value
    #[inline]
    pub fn get(&self) -> Sample {
        Sample::from_bits(self.bits.load(Ordering::SeqCst))
    }

    /// Store a new value
    #[inline]
    pub fn set(&self, value: Sample) {
        self.bits.swap(value.to_bits(), Ordering::SeqCst);
    }
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_exact_values() {
        let channel = ControlChannel::default();
        assert_eq!(channel.get(), 0.0);

        for value in [0.0, -0.0, -1.5, 440.0, Sample::MAX, Sample::MIN, Sample::MIN_POSITIVE] {
            channel.set(value);
            assert_eq!(channel.get().to_bits(), value.to_bits());
        }
    }
}
