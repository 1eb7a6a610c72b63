//! Shared, lock-free view of a socket's status.
//!
//! The driver task owns the controller; everyone else reads the status through
//! a [`StatusObserver`] sharing the same atomic cell.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::protocol::Status;

/// Observable socket status for UI binding.
///
/// Cheap to clone; all clones see the same underlying state.
#[derive(Clone)]
pub struct StatusObserver {
    state: Arc<AtomicU8>,
}

impl StatusObserver {
    pub fn new(state: Arc<AtomicU8>) -> Self {
        Self { state }
    }

    pub fn status(&self) -> Status {
        Status::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_open(&self) -> bool {
        self.status() == Status::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status() == Status::Closed
    }
}

impl std::fmt::Debug for StatusObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusObserver")
            .field("status", &self.status())
            .finish()
    }
}

/// Publish a new status to every observer (used by the driver).
pub fn set_status(state_ref: &AtomicU8, status: Status) {
    state_ref.store(status.to_u8(), Ordering::SeqCst);
}
