//! Bridge connection state.
//!
//! The lifecycle is:
//! 1. `Disconnected` until a connect is requested
//! 2. `Connecting` while authenticating and waiting for the ready event
//! 3. `Connected` with or without a resolved channel
//!
//! A dropped gateway or an explicit disconnect returns to `Disconnected`.

use std::fmt;

use crate::common::ChannelHandle;

/// Observable state of the Discord connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected {
        /// Target channel, if it was found in the cache at ready time.
        channel: Option<ChannelHandle>,
    },
}

#[allow(dead_code)]
impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    /// The resolved channel; only ever set while connected.
    pub fn channel(&self) -> Option<&ChannelHandle> {
        match self {
            ConnectionState::Connected { channel } => channel.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected { channel: None } => write!(f, "connected (no channel)"),
            ConnectionState::Connected {
                channel: Some(channel),
            } => write!(f, "connected to #{} ({})", channel.name, channel.id),
        }
    }
}
