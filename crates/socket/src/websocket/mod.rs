//! Reconnecting WebSocket controller.
//!
//! - `controller`: runtime-free state machine (lifecycle, reconnect, heartbeat)
//! - `ports`: the transport / timer seams the controller drives
//! - `desktop`: tokio-tungstenite driver and [`SocketClient`]

mod connection;
mod controller;
mod core;
mod handlers;
mod ports;
mod protocol;
pub(crate) mod shared;

#[cfg(not(target_arch = "wasm32"))]
mod desktop;

pub use connection::{set_status, StatusObserver};
pub use controller::SocketController;
pub use handlers::{Callback, Handlers, InitHook};
pub use ports::{Connector, LinkId, Scheduler, TimerId, Transport, TransportEvent};
pub use protocol::Status;
pub use shared::{
    DEFAULT_HEARTBEAT_GRACE_SECS, DEFAULT_HEARTBEAT_PERIOD_SECS, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_RECONNECT_LIMIT,
};

#[cfg(not(target_arch = "wasm32"))]
pub use desktop::{
    DriverEvent, SocketClient, TokioScheduler, TungsteniteConnector, TungsteniteTransport,
};
