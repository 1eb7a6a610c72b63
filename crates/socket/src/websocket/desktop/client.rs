//! Desktop socket client: a tokio task that owns the controller.

use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::{DriverEvent, TokioScheduler, TungsteniteConnector};
use crate::config::SocketConfig;
use crate::error::SocketError;
use crate::websocket::connection::{set_status, StatusObserver};
use crate::websocket::controller::SocketController;
use crate::websocket::handlers::Handlers;
use crate::websocket::protocol::Status;

type Controller = SocketController<TungsteniteConnector, TokioScheduler>;

enum Command {
    Connect,
    Send {
        payload: String,
        reply: oneshot::Sender<Result<(), SocketError>>,
    },
    Reconnect,
    Disconnect {
        done: oneshot::Sender<()>,
    },
    UpdateHandlers(Box<dyn FnOnce(&mut Handlers) + Send>),
}

/// Handle to a socket driven by a background tokio task.
///
/// Clones share the same socket. When the last clone is dropped the socket is
/// disconnected and the task exits.
#[derive(Clone)]
pub struct SocketClient {
    url: String,
    commands: mpsc::UnboundedSender<Command>,
    state: Arc<AtomicU8>,
}

impl SocketClient {
    /// Spawn the driver task and start connecting right away.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: SocketConfig, handlers: Handlers) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<DriverEvent>();
        let state = Arc::new(AtomicU8::new(Status::Connecting.to_u8()));

        let url = config.url.clone();
        let controller = SocketController::new(
            config,
            handlers,
            TungsteniteConnector::new(event_tx.clone()),
            TokioScheduler::new(event_tx),
        );

        tokio::spawn(drive(controller, cmd_rx, event_rx, Arc::clone(&state)));

        Self {
            url,
            commands: cmd_tx,
            state,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> Status {
        self.observer().status()
    }

    pub fn observer(&self) -> StatusObserver {
        StatusObserver::new(Arc::clone(&self.state))
    }

    /// Open a link now if none exists (e.g. to skip the reconnect delay).
    pub fn connect(&self) {
        let _ = self.commands.send(Command::Connect);
    }

    /// Force a reconnect cycle; counts against the reconnect budget.
    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Send one text payload. Fails if no link is open; nothing is queued.
    pub async fn send(&self, payload: impl Into<String>) -> Result<(), SocketError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                payload: payload.into(),
                reply,
            })
            .map_err(|_| SocketError::Closed)?;
        rx.await.map_err(|_| SocketError::Closed)?
    }

    /// Close for good. Returns once the socket is `CLOSED`.
    pub async fn disconnect(&self) {
        let (done, rx) = oneshot::channel();
        if self.commands.send(Command::Disconnect { done }).is_ok() {
            let _ = rx.await;
        }
    }

    /// Replace or add callbacks on the live socket.
    pub fn update_handlers<F>(&self, update: F)
    where
        F: FnOnce(&mut Handlers) + Send + 'static,
    {
        let _ = self
            .commands
            .send(Command::UpdateHandlers(Box::new(update)));
    }
}

impl std::fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketClient")
            .field("url", &self.url)
            .field("status", &self.status())
            .finish()
    }
}

async fn drive(
    mut controller: Controller,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<DriverEvent>,
    state: Arc<AtomicU8>,
) {
    controller.connect();
    set_status(&state, controller.status());

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Connect) => controller.connect(),
                Some(Command::Send { payload, reply }) => {
                    let _ = reply.send(controller.send(&payload));
                }
                Some(Command::Reconnect) => controller.reconnect(),
                Some(Command::Disconnect { done }) => {
                    controller.disconnect();
                    set_status(&state, controller.status());
                    let _ = done.send(());
                }
                Some(Command::UpdateHandlers(update)) => update(controller.handlers_mut()),
                None => {
                    tracing::debug!(url = %controller.url(), "all socket handles dropped");
                    controller.disconnect();
                }
            },
            Some(event) = events.recv() => match event {
                DriverEvent::Transport { link, event } => {
                    controller.handle_transport_event(link, event);
                }
                DriverEvent::Timer(timer) => controller.handle_timer(timer),
            },
        }

        set_status(&state, controller.status());
        if controller.status().is_terminal() {
            break;
        }
    }

    tracing::debug!(url = %controller.url(), "socket driver stopped");
}
