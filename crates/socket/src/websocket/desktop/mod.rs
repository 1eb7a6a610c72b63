//! Desktop driver built on tokio + tokio-tungstenite.
//!
//! One task owns the [`SocketController`](super::SocketController) and feeds it
//! owner commands, link events and timer fires, one at a time.

mod client;
mod scheduler;
mod transport;

pub use client::SocketClient;
pub use scheduler::TokioScheduler;
pub use transport::{TungsteniteConnector, TungsteniteTransport};

use super::ports::{LinkId, TimerId, TransportEvent};

/// Internal events posted to the driver task by links and timers.
#[derive(Debug)]
pub enum DriverEvent {
    Transport { link: LinkId, event: TransportEvent },
    Timer(TimerId),
}
