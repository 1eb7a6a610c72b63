//! Network core of the fishing arcade client.
//!
//! A single reconnecting WebSocket with heartbeat supervision. The table
//! scene, bullets, fish and skills live elsewhere and only see opaque string
//! payloads plus coarse lifecycle callbacks.
//!
//! ```no_run
//! use fishing_socket::{Handlers, PingPong, SocketClient, SocketConfig};
//!
//! # async fn run() -> Result<(), fishing_socket::SocketError> {
//! let config = SocketConfig::new("ws://localhost:9000/game")
//!     .with_ping_pong(PingPong::new("ping", "pong"));
//! let handlers = Handlers::new()
//!     .on_init(|| tracing::info!("joined table"))
//!     .on_data(|msg| tracing::info!(%msg, "server event"))
//!     .on_end(|| tracing::warn!("connection lost for good"));
//!
//! let socket = SocketClient::spawn(config, handlers);
//! socket.send(r#"{"cmd":"shoot","angle":0.5}"#).await?;
//! socket.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod websocket;

pub use config::{PingPong, SocketConfig};
pub use error::{ConfigError, SocketError, TransportError};
pub use websocket::{Handlers, SocketController, Status, StatusObserver};

#[cfg(not(target_arch = "wasm32"))]
pub use websocket::SocketClient;
