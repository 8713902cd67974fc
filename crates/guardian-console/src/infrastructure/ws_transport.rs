//! WebSocket client implementing the session's [`Transport`] port.
//!
//! `Transport::open` is synchronous, so each call spawns one Tokio task that
//! owns the socket for that connection:
//!
//! ```text
//!            open(conn-3)
//! Session ───────────────▶ WsTransport ── spawn ──▶ connection task (conn-3)
//!    ▲                         │                       │  connect_async(url)
//!    │                         │ outbound mpsc ───────▶│  sink.send(Text)
//!    └──── event loop ◀────────┴──── TransportEvent ◀──┘  stream.next()
//! ```
//!
//! Every event the task reports carries the [`ConnectionId`] it was spawned
//! for.  The session drops events from superseded connections, so a task
//! that outlives `close()` cannot disturb its successor.

use futures_util::{SinkExt, StreamExt};
use guardian_core::{ConnectionId, Transport, TransportError};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

/// What a connection task observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened(ConnectionId),
    Frame(ConnectionId, String),
    Closed(ConnectionId),
    Failed(ConnectionId, TransportError),
}

/// Capacity of the channel from connection tasks to the event loop.
pub const EVENT_CHANNEL_CAPACITY: usize = 128;

/// [`Transport`] over a WebSocket (tokio-tungstenite).
///
/// Must be used from inside a Tokio runtime: `open` spawns.
#[derive(Debug)]
pub struct WsTransport {
    url: String,
    events: mpsc::Sender<TransportEvent>,
    /// Sender half for the current connection's outbound frames.
    /// Dropping it tells the task to close the socket.
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl WsTransport {
    /// Creates a transport for `url` and the receiver the event loop reads.
    pub fn new(url: impl Into<String>) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let transport = Self {
            url: url.into(),
            events,
            outbound: None,
        };
        (transport, rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WsTransport {
    fn open(&mut self, connection: ConnectionId) -> Result<(), TransportError> {
        self.close();

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);

        let url = self.url.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            run_connection(url, connection, rx, events).await;
        });
        Ok(())
    }

    fn send(&mut self, frame: &str) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        outbound
            .send(frame.to_string())
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if self.outbound.take().is_some() {
            debug!(url = %self.url, "closing WebSocket connection");
        }
    }
}

/// Owns one WebSocket connection from connect to close.
async fn run_connection(
    url: String,
    connection: ConnectionId,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::Sender<TransportEvent>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(%connection, "WebSocket connect to {url} failed: {e}");
            let _ = events
                .send(TransportEvent::Failed(
                    connection,
                    TransportError::Connect(e.to_string()),
                ))
                .await;
            return;
        }
    };

    info!(%connection, "WebSocket connected to {url}");
    if events.send(TransportEvent::Opened(connection)).await.is_err() {
        return;
    }

    let (mut sink, mut source) = stream.split();

    let last_event = loop {
        tokio::select! {
            incoming = source.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    if events.send(TransportEvent::Frame(connection, text)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!(%connection, "server closed the stream: {frame:?}");
                    break TransportEvent::Closed(connection);
                }
                // Pings are answered by tungstenite; binary frames are not
                // part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(%connection, "WebSocket read error: {e}");
                    break TransportEvent::Failed(connection, TransportError::Closed);
                }
                None => break TransportEvent::Closed(connection),
            },
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                        warn!(%connection, "WebSocket send failed: {e}");
                        break TransportEvent::Failed(
                            connection,
                            TransportError::Send(e.to_string()),
                        );
                    }
                }
                // The transport dropped its sender: local close.
                None => {
                    let _ = sink.close().await;
                    debug!(%connection, "WebSocket closed locally");
                    return;
                }
            },
        }
    };

    let _ = events.send(last_event).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
