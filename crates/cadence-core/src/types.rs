//! Common types for Cadence
//!
//! Fundamental types shared by the channel table, the deferred-call queue and
//! the synchronous gate: the engine float, channel kinds and directions, and
//! score event kinds.

use serde::{Deserialize, Serialize};

/// Engine float used for control values, audio samples and table data
///
/// Control channels store this bit-for-bit in an `AtomicU64`, so the width
/// must stay at 64 bits.
pub type Sample = f64;

/// Default processing block length in samples (ksmps)
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Default number of slots in the deferred-call queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Kind of a named channel
///
/// The kind fixes the synchronization strategy of the channel for its
/// whole lifetime:
/// - `Control`: single atomic scalar, no lock
/// - `Audio`, `String`, `Spectral`: spin lock around the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Control,
    Audio,
    String,
    Spectral,
}

impl ChannelKind {
    /// Get the name of this kind
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::Control => "control",
            ChannelKind::Audio => "audio",
            ChannelKind::String => "string",
            ChannelKind::Spectral => "spectral",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a channel, seen from the engine
///
/// `Input` channels are written by callers and read by the engine,
/// `Output` channels are written by the engine and read by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelDirection {
    Input,
    Output,
    #[default]
    Bidirectional,
}

impl ChannelDirection {
    /// Whether a channel with this direction may be accessed as `requested`
    ///
    /// `requested` is always `Input` (caller writes) or `Output` (caller reads).
    pub fn allows(&self, requested: ChannelDirection) -> bool {
        match self {
            ChannelDirection::Bidirectional => true,
            own => *own == requested,
        }
    }

    /// Get the name of this direction
    pub fn name(&self) -> &'static str {
        match self {
            ChannelDirection::Input => "input",
            ChannelDirection::Output => "output",
            ChannelDirection::Bidirectional => "bidirectional",
        }
    }
}

impl std::fmt::Display for ChannelDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Score event kinds accepted by the score-event operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScoreEventKind {
    /// `i`: instrument note event
    Instrument = b'i',
    /// `f`: function table statement
    Table = b'f',
    /// `e`: end of score
    End = b'e',
    /// `a`: advance score time
    Advance = b'a',
    /// `q`: quiet (mute/unmute) an instrument
    Quiet = b'q',
}

impl ScoreEventKind {
    /// Get all event kinds
    pub const ALL: [ScoreEventKind; 5] = [
        ScoreEventKind::Instrument,
        ScoreEventKind::Table,
        ScoreEventKind::End,
        ScoreEventKind::Advance,
        ScoreEventKind::Quiet,
    ];

    /// Parse the conventional opcode letter
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(ScoreEventKind::Instrument),
            'f' => Some(ScoreEventKind::Table),
            'e' => Some(ScoreEventKind::End),
            'a' => Some(ScoreEventKind::Advance),
            'q' => Some(ScoreEventKind::Quiet),
            _ => None,
        }
    }

    /// The opcode letter for this kind
    pub fn as_char(&self) -> char {
        *self as u8 as char
    }
}
