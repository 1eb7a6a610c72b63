//! tokio-tungstenite transport links.
//!
//! Each link runs in its own task: it performs the handshake, forwards text
//! frames to the driver as [`TransportEvent`]s and writes queued outbound
//! payloads. Once the controller closes a link it is detached and nothing it
//! does afterwards reaches the driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::DriverEvent;
use crate::error::TransportError;
use crate::websocket::ports::{Connector, LinkId, Transport, TransportEvent};

/// Opens [`TungsteniteTransport`] links that report to the driver's event channel.
pub struct TungsteniteConnector {
    events: mpsc::UnboundedSender<DriverEvent>,
}

impl TungsteniteConnector {
    pub fn new(events: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self { events }
    }
}

impl Connector for TungsteniteConnector {
    fn open(&mut self, url: &str, link: LinkId) -> Box<dyn Transport> {
        Box::new(TungsteniteTransport::spawn(
            url.to_string(),
            link,
            self.events.clone(),
        ))
    }
}

/// Handle to one link task.
pub struct TungsteniteTransport {
    link: LinkId,
    outbound: Option<mpsc::UnboundedSender<String>>,
    open: Arc<AtomicBool>,
    detached: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TungsteniteTransport {
    pub fn spawn(url: String, link: LinkId, events: mpsc::UnboundedSender<DriverEvent>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let open = Arc::new(AtomicBool::new(false));
        let detached = Arc::new(AtomicBool::new(false));

        let sink = LinkEvents {
            link,
            events,
            detached: Arc::clone(&detached),
        };
        let task = tokio::spawn(run_link(url, sink, outbound_rx, Arc::clone(&open)));

        Self {
            link,
            outbound: Some(outbound_tx),
            open,
            detached,
            task,
        }
    }

    pub fn link(&self) -> LinkId {
        self.link
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl Transport for TungsteniteTransport {
    fn send(&mut self, payload: &str) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        outbound
            .send(payload.to_string())
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        self.detached.store(true, Ordering::SeqCst);
        // Dropping the outbound sender asks an open link to send a close frame.
        if self.outbound.take().is_some() && !self.is_open() {
            self.task.abort();
        }
    }
}

impl Drop for TungsteniteTransport {
    fn drop(&mut self) {
        self.close();
    }
}

struct LinkEvents {
    link: LinkId,
    events: mpsc::UnboundedSender<DriverEvent>,
    detached: Arc<AtomicBool>,
}

impl LinkEvents {
    fn emit(&self, event: TransportEvent) {
        if self.detached.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.events.send(DriverEvent::Transport {
            link: self.link,
            event,
        });
    }
}

async fn run_link(
    url: String,
    sink: LinkEvents,
    mut outbound: mpsc::UnboundedReceiver<String>,
    open: Arc<AtomicBool>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::warn!(link = %sink.link, url = %url, error = %e, "failed to open socket");
            sink.emit(TransportEvent::Error(Some(e.to_string())));
            sink.emit(TransportEvent::Close);
            return;
        }
    };

    open.store(true, Ordering::SeqCst);
    sink.emit(TransportEvent::Open);

    let (mut write, mut read) = ws_stream.split();
    loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => sink.emit(TransportEvent::Message(text)),
                Some(Ok(Message::Binary(bytes))) => {
                    tracing::debug!(link = %sink.link, len = bytes.len(), "ignoring binary frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(link = %sink.link, ?frame, "peer closed socket");
                    break;
                }
                // Control frames are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    sink.emit(TransportEvent::Error(Some(e.to_string())));
                    break;
                }
                None => break,
            },
            outgoing = outbound.recv() => match outgoing {
                Some(payload) => {
                    if let Err(e) = write.send(Message::Text(payload)).await {
                        sink.emit(TransportEvent::Error(Some(e.to_string())));
                        break;
                    }
                }
                None => {
                    if let Err(e) = write.close().await {
                        tracing::debug!(link = %sink.link, error = %e, "close handshake failed");
                    }
                    break;
                }
            },
        }
    }

    open.store(false, Ordering::SeqCst);
    sink.emit(TransportEvent::Close);
}
