//! Channel error types

use thiserror::Error;

use crate::types::{ChannelDirection, ChannelKind};

/// Errors from channel lookup and channel table construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// No channel registered under this name
    #[error("Channel not found: {0}")]
    NotFound(String),

    /// Channel exists but has a different kind
    #[error("Channel {name} is a {found} channel, expected {expected}")]
    WrongKind {
        name: String,
        expected: ChannelKind,
        found: ChannelKind,
    },

    /// Channel exists but may not be accessed in this direction
    #[error("Channel {name} is {direction}, cannot be used as {requested}")]
    WrongDirection {
        name: String,
        direction: ChannelDirection,
        requested: ChannelDirection,
    },

    /// Two channel specs share a name
    #[error("Duplicate channel name: {0}")]
    Duplicate(String),

    /// Spectral frame bin count outside what a channel can hold
    #[error("Spectral frame with {bins} bins exceeds the limit of {max}")]
    InvalidFrame { bins: usize, max: usize },

    /// Channel specs must have a non-empty name
    #[error("Channel name must not be empty")]
    EmptyName,
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;
