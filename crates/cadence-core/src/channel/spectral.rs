//! Spectral-frame channels: variable bin-count frames behind a spin lock
//!
//! A frame for N bins holds N+2 interleaved values. The channel buffer only
//! grows, and header plus samples are always copied together inside one
//! critical section so a reader never pairs a new header with old bins.

use super::error::{ChannelError, ChannelResult};
use crate::sync::SpinLock;

/// Largest bin count a spectral channel accepts
pub const MAX_FRAME_BINS: usize = 1 << 20;

/// Frame metadata copied along with the bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    /// Analysis size (bin count N)
    pub n: usize,
    /// Sliding (per-sample) analysis
    pub sliding: bool,
    /// Number of bins in sliding mode
    pub nb: usize,
    /// Hop size in samples
    pub overlap: usize,
    /// Analysis window size in samples
    pub window_size: usize,
    /// Analysis window shape
    pub window_type: i32,
    /// Frame data format (amplitude/frequency, amplitude/phase, ...)
    pub format: i32,
    /// Running frame counter
    pub frame_count: u32,
}

/// A spectral frame: header plus an owned bin buffer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectralFrame {
    pub header: FrameHeader,
    /// Interleaved bin data, at least `header.n + 2` values when in use
    pub frame: Vec<f32>,
}

impl SpectralFrame {
    /// Create a zeroed frame for `n` bins
    pub fn new(n: usize) -> Self {
        Self {
            header: FrameHeader {
                n,
                ..FrameHeader::default()
            },
            frame: vec![0.0; n + 2],
        }
    }

    /// Number of values a frame with this header carries
    ///
    /// Saturates for bin counts no channel would accept.
    pub fn frame_len(&self) -> usize {
        self.header.n.saturating_add(2)
    }
}

/// Spectral frame channel storage
#[derive(Debug)]
pub struct SpectralChannel {
    payload: SpinLock<SpectralFrame>,
}

impl SpectralChannel {
    /// Create an empty spectral channel (N = 0, no bins allocated)
    pub fn new() -> Self {
        Self {
            payload: SpinLock::new(SpectralFrame::default()),
        }
    }

    /// Copy `src` into the channel, growing the bin buffer if needed
    ///
    /// Missing trailing values in a short `src.frame` are written as zero.
    /// Frames with more than [`MAX_FRAME_BINS`] bins are rejected and leave
    /// the channel untouched.
    pub fn set(&self, src: &SpectralFrame) -> ChannelResult<()> {
        if src.header.n > MAX_FRAME_BINS {
            return Err(ChannelError::InvalidFrame {
                bins: src.header.n,
                max: MAX_FRAME_BINS,
            });
        }
        let needed = src.frame_len();
        let copied = src.frame.len().min(needed);

        let mut payload = self.payload.lock();
        if payload.frame.len() < needed {
            payload.frame.resize(needed, 0.0);
        }
        payload.header = src.header;
        payload.frame[..copied].copy_from_slice(&src.frame[..copied]);
        payload.frame[copied..needed].fill(0.0);
        Ok(())
    }

    /// Copy the channel frame into `dest`
    ///
    /// `dest.frame` is grown (never shrunk) to hold N+2 values. Growing happens
    /// outside the lock; if N changed meanwhile the copy is retried.
    pub fn get_into(&self, dest: &mut SpectralFrame) {
        loop {
            let payload = self.payload.lock();
            let needed = payload.frame_len().min(payload.frame.len());
            if dest.frame.len() >= needed {
                dest.header = payload.header;
                dest.frame[..needed].copy_from_slice(&payload.frame[..needed]);
                return;
            }
            drop(payload);
            dest.frame.resize(needed, 0.0);
        }
    }

    /// Current bin buffer capacity in values
    pub fn capacity(&self) -> usize {
        self.payload.lock().frame.len()
    }
}

impl Default for SpectralChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ramp_frame(n: usize, offset: f32) -> SpectralFrame {
        SpectralFrame {
            header: FrameHeader {
                n,
                overlap: n / 4,
                window_size: n,
                window_type: 1,
                frame_count: 7,
                ..FrameHeader::default()
            },
            frame: (0..n + 2).map(|i| offset + i as f32).collect(),
        }
    }

    #[test]
    fn test_set_get_then_grow() {
        let channel = SpectralChannel::new();

        let small = ramp_frame(10, 0.0);
        channel.set(&small).unwrap();
        assert_eq!(channel.capacity(), 12);

        let mut out = SpectralFrame::default();
        channel.get_into(&mut out);
        assert_eq!(out.header.n, 10);
        assert_eq!(out.header, small.header);
        assert_eq!(&out.frame[..12], &small.frame[..]);

        let large = ramp_frame(20, 100.0);
        channel.set(&large).unwrap();
        assert_eq!(channel.capacity(), 22);

        channel.get_into(&mut out);
        assert_eq!(out.header.n, 20);
        assert_eq!(&out.frame[..22], &large.frame[..]);
    }

    #[test]
    fn test_capacity_never_shrinks() {
        let channel = SpectralChannel::new();
        channel.set(&ramp_frame(20, 0.0)).unwrap();
        channel.set(&ramp_frame(4, 50.0)).unwrap();
        assert_eq!(channel.capacity(), 22);

        let mut out = SpectralFrame::new(2);
        channel.get_into(&mut out);
        assert_eq!(out.header.n, 4);
        assert_eq!(&out.frame[..6], &[50.0, 51.0, 52.0, 53.0, 54.0, 55.0]);
    }

    #[test]
    fn test_short_source_frame_zero_fills() {
        let channel = SpectralChannel::new();
        let mut src = ramp_frame(6, 1.0);
        src.frame.truncate(3);
        channel.set(&src).unwrap();

        let mut out = SpectralFrame::default();
        channel.get_into(&mut out);
        assert_eq!(out.frame, vec![1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let channel = SpectralChannel::new();
        channel.set(&ramp_frame(8, 0.0)).unwrap();

        for bins in [usize::MAX, MAX_FRAME_BINS + 1] {
            let src = SpectralFrame {
                header: FrameHeader {
                    n: bins,
                    ..FrameHeader::default()
                },
                frame: vec![1.0; 4],
            };
            assert_eq!(
                channel.set(&src),
                Err(ChannelError::InvalidFrame {
                    bins,
                    max: MAX_FRAME_BINS
                })
            );
        }

        // Previous frame is still intact
        let mut out = SpectralFrame::default();
        channel.get_into(&mut out);
        assert_eq!(out.header.n, 8);
        assert_eq!(channel.capacity(), 10);
    }

    #[test]
    fn test_concurrent_frames_never_tear() {
        const ROUNDS: u32 = 2_000;

        let channel = Arc::new(SpectralChannel::new());

        let writer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                for round in 1..=ROUNDS {
                    // Bin count changes every round, so the buffer keeps growing
                    let n = 4 + (round as usize % 13) * 8;
                    let src = SpectralFrame {
                        header: FrameHeader {
                            n,
                            frame_count: round,
                            ..FrameHeader::default()
                        },
                        frame: vec![round as f32; n + 2],
                    };
                    channel.set(&src).unwrap();
                }
            })
        };

        let reader = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                let mut out = SpectralFrame::default();
                for _ in 0..ROUNDS {
                    channel.get_into(&mut out);
                    if out.header.frame_count == 0 {
                        continue;
                    }
                    let expected = out.header.frame_count as f32;
                    let bins = &out.frame[..out.header.n + 2];
                    assert!(
                        bins.iter().all(|&v| v == expected),
                        "torn frame: header says frame {} with {} bins",
                        out.header.frame_count,
                        out.header.n
                    );
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
    }
}
