//! Audio channels: one processing block of samples behind a spin lock

use crate::sync::SpinLock;
use crate::types::Sample;

/// Block-length sample buffer shared with the performance thread
///
/// The buffer length is fixed at construction to the engine's block size;
/// every get/set copies at most one block inside the lock, so a reader never
/// observes a block that is half old and half new.
#[derive(Debug)]
pub struct AudioChannel {
    samples: SpinLock<Box<[Sample]>>,
    block_size: usize,
}

impl AudioChannel {
    /// Create a silent audio channel of `block_size` samples
    pub fn new(block_size: usize) -> Self {
        Self {
            samples: SpinLock::new(vec![0.0; block_size].into_boxed_slice()),
            block_size,
        }
    }

    /// Number of samples in one block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Copy the current block into `dest`
    ///
    /// Copies `min(dest.len(), block_size)` samples. Returns the count copied.
    pub fn read_into(&self, dest: &mut [Sample]) -> usize {
        let n = dest.len().min(self.block_size);
        let samples = self.samples.lock();
        dest[..n].copy_from_slice(&samples[..n]);
        n
    }

    /// Replace the current block with `src`
    ///
    /// Copies `min(src.len(), block_size)` samples and zeroes the rest of the
    /// block, so no samples of the previous block survive. Returns the count
    /// copied.
    pub fn write_from(&self, src: &[Sample]) -> usize {
        let n = src.len().min(self.block_size);
        let mut samples = self.samples.lock();
        samples[..n].copy_from_slice(&src[..n]);
        samples[n..].fill(0.0);
        n
    }
}
