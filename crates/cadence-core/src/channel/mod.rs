//! Named channels shared between API callers and the performance thread
//!
//! Each channel kind carries its own synchronization strategy:
//! - **Control**: atomic `f64` bits, lock-free
//! - **Audio**: spin lock around a one-block copy
//! - **String / Spectral**: spin lock around growth-only payload mutation
//!
//! The set of channels is fixed when the [`ChannelTable`] is built.

mod audio;
mod control;
mod error;
mod spectral;
mod string;
mod table;

pub use audio::AudioChannel;
pub use control::ControlChannel;
pub use error::{ChannelError, ChannelResult};
pub use spectral::{FrameHeader, SpectralChannel, SpectralFrame, MAX_FRAME_BINS};
pub use string::StringChannel;
pub use table::{Channel, ChannelInfo, ChannelSpec, ChannelTable};
