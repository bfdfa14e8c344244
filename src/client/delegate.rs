//! Lifecycle callbacks from the client to its owner.

use std::fmt;

use crate::error::ClientError;
use crate::models::event::PusherError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Receives client events. Every method defaults to doing nothing.
///
/// Calls arrive on whichever task fed the client its frames; implementations that own
/// single-threaded state must hand the event off rather than touch that state directly.
pub trait ClientDelegate: Send + Sync {
    fn changed_connection_state(&self, _old: ConnectionState, _new: ConnectionState) {}

    fn subscribed_to_channel(&self, _name: &str) {}

    fn failed_to_subscribe(&self, _name: &str, _error: &ClientError) {}

    fn received_error(&self, _error: &PusherError) {}

    fn debug_log(&self, _message: &str) {}
}
