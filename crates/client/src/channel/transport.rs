// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for WebSocket communication.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing
//!
//! A transport carries UTF-8 text frames. It knows nothing about envelopes;
//! parsing happens in the connection task so a malformed frame can be
//! dropped without tearing the connection down.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tether_core::CloseFrame;

/// Close code reported when the peer closed without giving one.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Error type for transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Creates a fresh, unconnected transport for each connection attempt.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn Transport> + Send + Sync>;

/// What a connected transport can report.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Message(String),
    /// The connection closed with a code and reason.
    Closed(CloseFrame),
    /// The connection failed.
    Error(String),
}

/// Transport trait for WebSocket-like communication.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send {
    /// Connect to a remote server. Resolves once the connection is open.
    fn connect(&mut self, url: &str) -> TransportFuture<'_, TransportResult<()>>;

    /// Send a text frame.
    fn send(&mut self, text: String) -> TransportFuture<'_, TransportResult<()>>;

    /// Wait for the next event from the server.
    ///
    /// After a `Closed` or `Error` event the transport is no longer connected.
    fn recv(&mut self) -> TransportFuture<'_, TransportEvent>;

    /// Close the connection with the given code and reason.
    fn close(&mut self, frame: CloseFrame) -> TransportFuture<'_, TransportResult<()>>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket transport implementation using tokio-tungstenite.
pub struct WebSocketTransport {
    /// The WebSocket connection, if connected.
    ws: Option<WebSocketConnection>,
}

/// Internal WebSocket connection wrapper.
struct WebSocketConnection {
    sink: futures_util::stream::SplitSink<WsStream, tokio_tungstenite::tungstenite::Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport { ws: None }
    }

    /// A factory producing WebSocket transports, for [`Channel::with_transport`].
    ///
    /// [`Channel::with_transport`]: super::Channel::with_transport
    pub fn factory() -> TransportFactory {
        Arc::new(|| Box::new(WebSocketTransport::new()) as Box<dyn Transport>)
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, TransportResult<()>> {
        let url = url.to_string();
        Box::pin(async move {
            use futures_util::StreamExt;

            let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            self.ws = Some(WebSocketConnection { sink, stream });
            Ok(())
        })
    }

    fn send(&mut self, text: String) -> TransportFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            if let Err(e) = ws.sink.send(Message::Text(text.into())).await {
                // Connection is broken, clear it
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }

            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, TransportEvent> {
        Box::pin(async move {
            use futures_util::{SinkExt, StreamExt};
            use tokio_tungstenite::tungstenite::Message;

            let Some(ws) = self.ws.as_mut() else {
                return TransportEvent::Closed(CloseFrame::abnormal("not connected"));
            };

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return TransportEvent::Message(text.to_string());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        // Flush the close reply tungstenite queued for the peer
                        let _ = ws.sink.close().await;
                        self.ws = None;
                        let frame = match frame {
                            Some(f) => CloseFrame::new(u16::from(f.code), f.reason.to_string()),
                            None => CloseFrame::new(NO_STATUS_RECEIVED, ""),
                        };
                        return TransportEvent::Closed(frame);
                    }
                    Some(Ok(_)) => {
                        // Ignore ping/pong and binary frames
                        continue;
                    }
                    Some(Err(e)) => {
                        // Connection is broken, clear it
                        self.ws = None;
                        return TransportEvent::Error(e.to_string());
                    }
                    None => {
                        // Stream ended without a close frame
                        self.ws = None;
                        return TransportEvent::Closed(CloseFrame::abnormal("stream ended"));
                    }
                }
            }
        })
    }

    fn close(&mut self, frame: CloseFrame) -> TransportFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
            use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
            use tokio_tungstenite::tungstenite::Message;

            if let Some(mut ws) = self.ws.take() {
                let close = WsCloseFrame {
                    code: CloseCode::from(frame.code),
                    reason: frame.reason.into(),
                };
                ws.sink
                    .send(Message::Close(Some(close)))
                    .await
                    .map_err(|e| TransportError::SendFailed(e.to_string()))?;
            }
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}
