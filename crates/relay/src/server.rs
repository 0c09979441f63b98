// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Handles client connections, envelope routing, and broadcast fanout.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tether_core::{ClockSource, Envelope, SystemClock};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::state::RelayState;

pub const PING: &str = "ping";
pub const PONG: &str = "pong";
pub const ERROR: &str = "error";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What to do with one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    /// Send a frame back to the sender only.
    Reply(String),
    /// Fan the frame out to the other peers.
    Broadcast(String),
}

/// Bind and run the relay on the given address.
pub async fn run(addr: SocketAddr, state: RelayState) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", listener.local_addr()?);
    serve(listener, state).await
}

/// Accept connections on an already bound listener.
pub async fn serve(listener: TcpListener, state: RelayState) -> Result<(), BoxError> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: RelayState,
) -> Result<(), BoxError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let mut peer = state.register();
    info!(
        "New WebSocket connection from: {} (peer {}, {} connected)",
        peer_addr,
        peer.id,
        state.connected()
    );

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    loop {
        tokio::select! {
            // Handle incoming frames from the client
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match handle_text(text.as_str(), &SystemClock)? {
                            Action::Reply(frame) => {
                                ws_sink.send(Message::Text(frame.into())).await?;
                            }
                            Action::Broadcast(frame) => state.publish(peer.id, frame),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Client {} disconnected: {:?}", peer_addr, frame);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(_)) => {
                        // Ignore binary and pong frames
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", peer_addr, e);
                        break;
                    }
                    None => {
                        info!("Client {} stream ended", peer_addr);
                        break;
                    }
                }
            }

            // Deliver frames published by other peers
            broadcast = peer.rx.recv() => {
                match broadcast {
                    Ok(relayed) => {
                        if !state.should_deliver(&relayed, peer.id) {
                            continue;
                        }
                        if let Err(e) = ws_sink.send(Message::Text(relayed.frame.into())).await {
                            warn!("Failed to send broadcast to {}: {}", peer_addr, e);
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} lagged by {} messages", peer_addr, n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }

    info!(
        "Connection closed: {} ({} frames relayed since start)",
        peer_addr,
        state.relayed()
    );
    Ok(())
}

/// Route one text frame: answer pings, reject malformed frames, relay the rest.
pub(crate) fn handle_text(text: &str, clock: &dyn ClockSource) -> tether_core::Result<Action> {
    let envelope = match Envelope::from_json(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!("Rejecting malformed frame: {}", e);
            let reply = Envelope::new(ERROR, json!({ "message": e.to_string() }), clock);
            return Ok(Action::Reply(reply.to_json()?));
        }
    };

    debug!("Received {} ({})", envelope.kind(), envelope.id());
    if envelope.kind() == PING {
        let pong = Envelope::new(PONG, envelope.into_payload(), clock);
        return Ok(Action::Reply(pong.to_json()?));
    }

    Ok(Action::Broadcast(envelope.to_json()?))
}
