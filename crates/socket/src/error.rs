//! Error types for the socket controller.
//!
//! Recoverable transport trouble (errors, unexpected closes, heartbeat timeouts)
//! never surfaces here; the controller retries internally. These errors only
//! reach the owner for operations it invoked directly.

use thiserror::Error;

/// Failure reported by a single transport link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The link exists but has not finished its opening handshake.
    #[error("transport is not open yet")]
    NotOpen,

    /// The link has been closed or torn down.
    #[error("transport is closed")]
    Closed,

    /// Underlying network / protocol failure.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Errors returned to the owner of a socket controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// No transport exists right now (reconnect delay window).
    #[error("not connected")]
    NotConnected,

    /// The controller reached its terminal state.
    #[error("socket is closed")]
    Closed,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Invalid socket configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid number for {key}: {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    /// Only one of the heartbeat ping/pong tokens was provided.
    #[error("heartbeat needs both a ping and a pong token")]
    IncompleteHeartbeat,
}
