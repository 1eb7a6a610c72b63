//! Seams between the controller and the outside world.
//!
//! The controller never touches sockets or clocks directly. A `Connector`
//! opens transport links, a `Scheduler` arms one-shot timers, and whoever
//! drives the controller feeds the resulting events back in, tagged with the
//! `LinkId` / `TimerId` that produced them.

use std::fmt;
use std::time::Duration;

use crate::error::TransportError;

/// Identity of one transport link opened by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// Identity of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Transport-level event delivered to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Error(Option<String>),
    Close,
}

/// A live transport link. Dropping it must not emit further events.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Write one opaque text payload.
    fn send(&mut self, payload: &str) -> Result<(), TransportError>;

    /// Detach listeners and initiate close. Must be idempotent.
    fn close(&mut self);
}

/// Opens transport links.
///
/// Events for the returned link are delivered asynchronously, tagged with `link`.
pub trait Connector: Send {
    fn open(&mut self, url: &str, link: LinkId) -> Box<dyn Transport>;
}

/// One-shot timer facility.
///
/// When an armed timer elapses, the driver hands its id to the controller.
/// Cancelled timers must never be delivered, though the controller also
/// ignores ids it no longer tracks.
pub trait Scheduler: Send {
    fn arm(&mut self, after: Duration) -> TimerId;
    fn cancel(&mut self, timer: TimerId);
}
