//! Socket status and its atomic-friendly encoding.

use std::fmt;

/// Lifecycle status of a socket controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// A transport is being opened (or the controller has not connected yet)
    Connecting,
    /// The current transport reported open
    Open,
    /// Terminal - budget exhausted or owner disconnected
    Closed,
}

impl Status {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            Status::Connecting => 0,
            Status::Open => 1,
            Status::Closed => 2,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Status::Open,
            2 => Status::Closed,
            _ => Status::Connecting,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Status::Closed
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Connecting => write!(f, "CONNECTING"),
            Status::Open => write!(f, "OPEN"),
            Status::Closed => write!(f, "CLOSED"),
        }
    }
}
