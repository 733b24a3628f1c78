//! WebSocket transport.
//!
//! Connects to the backend's live socket and turns the message stream into
//! [`TransportEvent`]s. Knows nothing about envelopes or the store.

use crate::error::{SyncError, SyncResult};
use crate::transport::{CloseInfo, Connection, Transport, TransportEvent};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;
use url::Url;

/// Type alias for the WebSocket send half.
pub type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;

/// Type alias for the WebSocket receive half.
pub type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Transport over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Creates a WebSocket transport.
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn connect(&self, url: &Url) -> SyncResult<WebSocketConnection> {
        let target = redacted(url);
        debug!(url = %target, "Connecting to live socket");

        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| SyncError::transport(format!("connect failed: {}", e)))?;

        let (sink, stream) = ws.split();

        debug!(url = %target, "Live socket connected");
        Ok(WebSocketConnection {
            sink,
            stream,
            closed: false,
        })
    }
}

/// An open WebSocket connection.
pub struct WebSocketConnection {
    sink: WsSink,
    stream: WsStream,
    closed: bool,
}

impl Connection for WebSocketConnection {
    async fn next_event(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return TransportEvent::Frame(text.as_str().to_owned());
                }
                Some(Ok(Message::Close(frame))) => {
                    let info = match frame {
                        Some(frame) => CloseInfo::new(u16::from(frame.code), frame.reason.as_str()),
                        None => CloseInfo::abnormal(),
                    };
                    return TransportEvent::Closed(info);
                }
                // Pong is handled by tungstenite; the backend sends text only.
                Some(Ok(_)) => continue,
                Some(Err(e)) => return TransportEvent::Error(format!("socket error: {}", e)),
                None => return TransportEvent::Closed(CloseInfo::abnormal()),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Closing the sink sends the close frame; the peer may already be gone.
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "Live socket close failed");
        }
    }
}

impl std::fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Strips the query so the token never reaches a log line.
fn redacted(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url
}
