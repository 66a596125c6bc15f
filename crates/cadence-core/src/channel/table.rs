//! Channel table: name → typed channel storage
//!
//! The table is filled once, before the bridge is shared with other threads,
//! and is read-only afterwards. Lookups therefore need no lock; only the
//! payload of each channel is synchronized, according to its kind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::{ChannelError, ChannelResult};
use super::{AudioChannel, ControlChannel, SpectralChannel, StringChannel};
use crate::types::{ChannelDirection, ChannelKind};

/// Declaration of a channel to create at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub kind: ChannelKind,
    #[serde(default)]
    pub direction: ChannelDirection,
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>, kind: ChannelKind, direction: ChannelDirection) -> Self {
        Self {
            name: name.into(),
            kind,
            direction,
        }
    }

    /// Bidirectional control channel
    pub fn control(name: impl Into<String>) -> Self {
        Self::new(name, ChannelKind::Control, ChannelDirection::Bidirectional)
    }

    /// Bidirectional audio channel
    pub fn audio(name: impl Into<String>) -> Self {
        Self::new(name, ChannelKind::Audio, ChannelDirection::Bidirectional)
    }

    /// Bidirectional string channel
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ChannelKind::String, ChannelDirection::Bidirectional)
    }

    /// Bidirectional spectral channel
    pub fn spectral(name: impl Into<String>) -> Self {
        Self::new(name, ChannelKind::Spectral, ChannelDirection::Bidirectional)
    }

    /// Same channel with a different direction
    pub fn with_direction(mut self, direction: ChannelDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Channel storage; the variant fixes the synchronization strategy
#[derive(Debug)]
pub enum Channel {
    /// Atomic scalar, no lock
    Control(ControlChannel),
    /// Spin-locked sample block
    Audio(AudioChannel),
    /// Spin-locked growth-only text
    String(StringChannel),
    /// Spin-locked growth-only spectral frame
    Spectral(SpectralChannel),
}

impl Channel {
    fn for_kind(kind: ChannelKind, block_size: usize) -> Self {
        match kind {
            ChannelKind::Control => Channel::Control(ControlChannel::default()),
            ChannelKind::Audio => Channel::Audio(AudioChannel::new(block_size)),
            ChannelKind::String => Channel::String(StringChannel::new()),
            ChannelKind::Spectral => Channel::Spectral(SpectralChannel::new()),
        }
    }

    /// Kind of this channel
    pub fn kind(&self) -> ChannelKind {
        match self {
            Channel::Control(_) => ChannelKind::Control,
            Channel::Audio(_) => ChannelKind::Audio,
            Channel::String(_) => ChannelKind::String,
            Channel::Spectral(_) => ChannelKind::Spectral,
        }
    }
}

/// Registered channel with its fixed direction
#[derive(Debug)]
struct Entry {
    direction: ChannelDirection,
    channel: Channel,
}

/// Name, kind and direction of a registered channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    pub kind: ChannelKind,
    pub direction: ChannelDirection,
}

/// Fixed set of channels, created once for the engine's lifetime
#[derive(Debug)]
pub struct ChannelTable {
    entries: HashMap<String, Entry>,
    block_size: usize,
}

impl ChannelTable {
    /// Build a table from channel specs
    ///
    /// Audio channels are sized to `block_size` samples.
    pub fn new(specs: &[ChannelSpec], block_size: usize) -> ChannelResult<Self> {
        let mut entries = HashMap::with_capacity(specs.len());
        for spec in specs {
            if spec.name.is_empty() {
                return Err(ChannelError::EmptyName);
            }
            if entries.contains_key(&spec.name) {
                return Err(ChannelError::Duplicate(spec.name.clone()));
            }
            entries.insert(
                spec.name.clone(),
                Entry {
                    direction: spec.direction,
                    channel: Channel::for_kind(spec.kind, block_size),
                },
            );
        }
        Ok(Self {
            entries,
            block_size,
        })
    }

    /// Empty table
    pub fn empty(block_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            block_size,
        }
    }

    /// Samples per audio block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// List all channels, sorted by name
    pub fn list(&self) -> Vec<ChannelInfo> {
        let mut infos: Vec<_> = self
            .entries
            .iter()
            .map(|(name, entry)| ChannelInfo {
                name: name.clone(),
                kind: entry.channel.kind(),
                direction: entry.direction,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Resolve a channel by name, kind and access direction
    pub fn lookup(
        &self,
        name: &str,
        kind: ChannelKind,
        requested: ChannelDirection,
    ) -> ChannelResult<&Channel> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ChannelError::NotFound(name.to_string()))?;

        let found = entry.channel.kind();
        if found != kind {
            return Err(ChannelError::WrongKind {
                name: name.to_string(),
                expected: kind,
                found,
            });
        }
        if !entry.direction.allows(requested) {
            return Err(ChannelError::WrongDirection {
                name: name.to_string(),
                direction: entry.direction,
                requested,
            });
        }
        Ok(&entry.channel)
    }

    /// Resolve a control channel
    pub fn control(
        &self,
        name: &str,
        requested: ChannelDirection,
    ) -> ChannelResult<&ControlChannel> {
        match self.lookup(name, ChannelKind::Control, requested)? {
            Channel::Control(c) => Ok(c),
            other => Err(kind_mismatch(name, ChannelKind::Control, other)),
        }
    }

    /// Resolve an audio channel
    pub fn audio(
        &self,
        name: &str,
        requested: ChannelDirection,
    ) -> ChannelResult<&AudioChannel> {
        match self.lookup(name, ChannelKind::Audio, requested)? {
            Channel::Audio(c) => Ok(c),
            other => Err(kind_mismatch(name, ChannelKind::Audio, other)),
        }
    }

    /// Resolve a string channel
    pub fn string(
        &self,
        name: &str,
        requested: ChannelDirection,
    ) -> ChannelResult<&StringChannel> {
        match self.lookup(name, ChannelKind::String, requested)? {
            Channel::String(c) => Ok(c),
            other => Err(kind_mismatch(name, ChannelKind::String, other)),
        }
    }

    /// Resolve a spectral channel
    pub fn spectral(
        &self,
        name: &str,
        requested: ChannelDirection,
    ) -> ChannelResult<&SpectralChannel> {
        match self.lookup(name, ChannelKind::Spectral, requested)? {
            Channel::Spectral(c) => Ok(c),
            other => Err(kind_mismatch(name, ChannelKind::Spectral, other)),
        }
    }
}

// Unreachable after `lookup` checked the kind, kept total instead of panicking
fn kind_mismatch(name: &str, expected: ChannelKind, found: &Channel) -> ChannelError {
    ChannelError::WrongKind {
        name: name.to_string(),
        expected,
        found: found.kind(),
    }
}
