// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background task that owns a channel's transport.
//!
//! One task runs per `connect()` call. It opens the transport, flushes the
//! outbound queue, then pumps frames in both directions until the connection
//! ends. On an unintentional close it sleeps for the reconnect interval and
//! tries again, up to the configured attempt count.
//!
//! Every task carries the generation it was started for. `connect()` and
//! `disconnect()` bump the generation and cancel the task's token, so a task
//! that wakes up late sees it has been superseded and stops without touching
//! state or emitting events.
//!
//! While the session is live the facade hands envelopes to the task over an
//! unbounded channel instead of the queue. That channel is installed only
//! once the flush has emptied the queue, under the same lock, so queued and
//! live envelopes can never overtake each other.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tether_core::{ClockSource, CloseFrame, Envelope};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::TtlCache;
use super::client::ConnectionState;
use super::dispatch::Dispatcher;
use super::events::{self, ChannelEvent};
use super::queue::OutboundQueue;
use super::transport::{Transport, TransportError, TransportEvent, TransportFactory, TransportResult};
use crate::config::ChannelConfig;
use crate::error::Result;

/// Reason carried by the close frame of an explicit disconnect.
pub(crate) const DISCONNECT_REASON: &str = "client disconnect";

/// A pending `connect()` call.
pub(crate) type Waiter = oneshot::Sender<Result<()>>;

/// State shared between the facade, the connection task and the sweeper.
pub(crate) struct Shared {
    pub(crate) config: ChannelConfig,
    pub(crate) core: Mutex<Core>,
    pub(crate) cache: Mutex<TtlCache<Value>>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) clock: Arc<dyn ClockSource>,
    pub(crate) factory: TransportFactory,
}

/// Connection bookkeeping guarded by one lock.
pub(crate) struct Core {
    pub(crate) state: ConnectionState,
    pub(crate) queue: OutboundQueue,
    /// Bumped by every `connect()` and `disconnect()`.
    pub(crate) generation: u64,
    /// Reconnection attempts since the last successful open.
    pub(crate) attempts: u32,
    /// Sender into the live session. `Some` only while the queue is empty.
    pub(crate) live: Option<mpsc::UnboundedSender<Envelope>>,
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) task: Option<JoinHandle<()>>,
    pub(crate) waiters: Vec<Waiter>,
    pub(crate) sweeper: bool,
}

impl Core {
    pub(crate) fn new() -> Self {
        Core {
            state: ConnectionState::Disconnected,
            queue: OutboundQueue::new(),
            generation: 0,
            attempts: 0,
            live: None,
            cancel: None,
            task: None,
            waiters: Vec::new(),
            sweeper: false,
        }
    }

    /// Supersede the running task, if any, and go back to `Disconnected`.
    ///
    /// Pending `connect()` calls fail with `ConnectionCancelled`.
    pub(crate) fn reset(&mut self) {
        self.generation += 1;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.live = None;
        self.attempts = 0;
        self.waiters.clear();
        self.state = ConnectionState::Disconnected;
    }
}

impl Shared {
    pub(crate) fn core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn cache(&self) -> MutexGuard<'_, TtlCache<Value>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Dispatch an event. Messages go out under `"message"` and then under
    /// the envelope's own type, once per subscriber even if the type is
    /// `"message"` itself.
    pub(crate) fn emit(&self, event: ChannelEvent) {
        match &event {
            ChannelEvent::Message(envelope) => {
                self.dispatcher.emit(events::MESSAGE, &event);
                if envelope.kind() != events::MESSAGE {
                    self.dispatcher.emit(envelope.kind(), &event);
                }
            }
            _ => {
                self.dispatcher.emit(event.name(), &event);
            }
        }
    }
}

/// How a session ended.
enum SessionEnd {
    /// `disconnect()` or a newer `connect()` took over.
    Superseded,
    /// The transport closed or failed.
    Lost {
        frame: CloseFrame,
        /// An envelope taken from the live channel that never made it out.
        unsent: Option<Envelope>,
    },
}

/// What the driver loop does next.
enum Outcome {
    Reconnect,
    Stop,
}

/// The connection task for one generation.
pub(crate) struct Connection {
    shared: Arc<Shared>,
    generation: u64,
    cancel: CancellationToken,
}

impl Connection {
    pub(crate) fn new(shared: Arc<Shared>, generation: u64, cancel: CancellationToken) -> Self {
        Connection {
            shared,
            generation,
            cancel,
        }
    }

    /// Run until disconnected, superseded or out of reconnection attempts.
    pub(crate) async fn run(self) {
        loop {
            let mut transport = (self.shared.factory)();
            let opened = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = transport.connect(&self.shared.config.url) => result,
            };

            let outcome = match opened {
                Ok(()) => self.session(transport).await,
                Err(e) => self.connect_failed(e),
            };

            if matches!(outcome, Outcome::Stop) || !self.wait_for_retry().await {
                return;
            }
        }
    }

    fn is_current(&self, core: &Core) -> bool {
        core.generation == self.generation
    }

    /// Resolve every pending `connect()` call of this generation.
    fn settle(&self, result: TransportResult<()>) {
        let waiters = {
            let mut core = self.shared.core();
            if !self.is_current(&core) {
                return;
            }
            mem::take(&mut core.waiters)
        };
        for waiter in waiters {
            let _ = waiter.send(result.clone().map_err(Into::into));
        }
    }

    fn connect_failed(&self, error: TransportError) -> Outcome {
        if !self.is_current(&self.shared.core()) {
            return Outcome::Stop;
        }
        warn!(url = %self.shared.config.url, error = %error, "connection attempt failed");
        self.shared.emit(ChannelEvent::Error {
            message: error.to_string(),
        });
        self.settle(Err(error));
        Outcome::Reconnect
    }

    async fn session(&self, mut transport: Box<dyn Transport>) -> Outcome {
        let attempts = {
            let mut core = self.shared.core();
            if self.is_current(&core) {
                core.state = ConnectionState::Connected;
                Some(mem::take(&mut core.attempts))
            } else {
                None
            }
        };
        let Some(attempts) = attempts else {
            let _ = transport.close(CloseFrame::normal(DISCONNECT_REASON)).await;
            return Outcome::Stop;
        };

        info!(url = %self.shared.config.url, "connected");
        self.shared.emit(ChannelEvent::Connected);
        if attempts > 0 {
            info!(attempts, "reconnected");
            self.shared.emit(ChannelEvent::Reconnected { attempts });
        }

        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let flushed = self.flush(transport.as_mut(), live_tx).await;
        self.settle(Ok(()));

        let end = match flushed {
            Some(end) => end,
            None => self.pump(transport.as_mut(), &mut live_rx).await,
        };

        match end {
            SessionEnd::Superseded => {
                self.shutdown(transport.as_mut(), &mut live_rx).await;
                Outcome::Stop
            }
            SessionEnd::Lost { frame, unsent } => self.connection_lost(frame, unsent, &mut live_rx),
        }
    }

    /// Send queued envelopes in order, then open the live channel.
    ///
    /// Returns `None` once the live channel is installed.
    async fn flush(
        &self,
        transport: &mut dyn Transport,
        live_tx: mpsc::UnboundedSender<Envelope>,
    ) -> Option<SessionEnd> {
        let mut live_tx = Some(live_tx);
        let mut sent = 0usize;

        loop {
            let next = {
                let mut core = self.shared.core();
                if !self.is_current(&core) {
                    return Some(SessionEnd::Superseded);
                }
                match core.queue.front() {
                    Some(envelope) => envelope.clone(),
                    None => {
                        core.live = live_tx.take();
                        break;
                    }
                }
            };

            if !transport.is_connected() {
                return Some(SessionEnd::Lost {
                    frame: CloseFrame::abnormal("transport closed during flush"),
                    unsent: None,
                });
            }

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Some(SessionEnd::Superseded),
                result = self.transmit(transport, &next) => result,
            };

            if let Err(e) = result {
                let remaining = self.shared.core().queue.len();
                warn!(error = %e, remaining, "flush interrupted");
                self.shared.emit(ChannelEvent::Error {
                    message: e.to_string(),
                });
                return Some(SessionEnd::Lost {
                    frame: CloseFrame::abnormal(e.to_string()),
                    unsent: None,
                });
            }

            {
                let mut core = self.shared.core();
                if self.is_current(&core) && core.queue.front().map(Envelope::id) == Some(next.id())
                {
                    core.queue.pop_front();
                }
            }
            sent += 1;
        }

        if sent > 0 {
            debug!(sent, "flushed outbound queue");
        }
        None
    }

    async fn pump(
        &self,
        transport: &mut dyn Transport,
        live_rx: &mut mpsc::UnboundedReceiver<Envelope>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return SessionEnd::Superseded,
                event = transport.recv() => match event {
                    TransportEvent::Message(text) => self.on_frame(&text),
                    TransportEvent::Closed(frame) => {
                        return SessionEnd::Lost { frame, unsent: None };
                    }
                    TransportEvent::Error(message) => {
                        warn!(error = %message, "transport error");
                        self.shared.emit(ChannelEvent::Error {
                            message: message.clone(),
                        });
                        return SessionEnd::Lost {
                            frame: CloseFrame::abnormal(message),
                            unsent: None,
                        };
                    }
                },
                envelope = live_rx.recv() => {
                    let Some(envelope) = envelope else {
                        return SessionEnd::Superseded;
                    };
                    if let Err(e) = self.transmit(transport, &envelope).await {
                        warn!(id = envelope.id(), error = %e, "send failed");
                        self.shared.emit(ChannelEvent::Error {
                            message: e.to_string(),
                        });
                        return SessionEnd::Lost {
                            frame: CloseFrame::abnormal(e.to_string()),
                            unsent: Some(envelope),
                        };
                    }
                }
            }
        }
    }

    async fn transmit(&self, transport: &mut dyn Transport, envelope: &Envelope) -> TransportResult<()> {
        let text = envelope
            .to_json()
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        debug!(id = envelope.id(), kind = envelope.kind(), "sending");
        transport.send(text).await
    }

    fn on_frame(&self, text: &str) {
        let envelope = match Envelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, len = text.len(), "dropping malformed frame");
                return;
            }
        };

        debug!(id = envelope.id(), kind = envelope.kind(), "received");
        if self.shared.config.is_cacheable(envelope.kind()) {
            self.shared
                .cache()
                .set(envelope.id(), envelope.payload().clone(), None);
        }
        self.shared.emit(ChannelEvent::Message(envelope));
    }

    /// Graceful close after `disconnect()`.
    ///
    /// Envelopes already handed to the live channel still go out; whatever
    /// cannot be sent goes back to the front of the queue.
    async fn shutdown(
        &self,
        transport: &mut dyn Transport,
        live_rx: &mut mpsc::UnboundedReceiver<Envelope>,
    ) {
        live_rx.close();
        let mut unsent = Vec::new();
        while let Ok(envelope) = live_rx.try_recv() {
            if unsent.is_empty() && transport.is_connected() {
                match self.transmit(transport, &envelope).await {
                    Ok(()) => continue,
                    Err(e) => debug!(error = %e, "send during shutdown failed"),
                }
            }
            unsent.push(envelope);
        }
        if !unsent.is_empty() {
            self.shared.core().queue.requeue_front(unsent);
        }

        if let Err(e) = transport.close(CloseFrame::normal(DISCONNECT_REASON)).await {
            debug!(error = %e, "close handshake failed");
        }
        debug!(url = %self.shared.config.url, "connection closed");
    }

    fn connection_lost(
        &self,
        frame: CloseFrame,
        unsent: Option<Envelope>,
        live_rx: &mut mpsc::UnboundedReceiver<Envelope>,
    ) -> Outcome {
        let reconnect = !frame.is_intentional();
        {
            let mut core = self.shared.core();
            let current = self.is_current(&core);
            if current {
                core.live = None;
            }

            let mut pending: Vec<Envelope> = unsent.into_iter().collect();
            live_rx.close();
            while let Ok(envelope) = live_rx.try_recv() {
                pending.push(envelope);
            }
            if !pending.is_empty() {
                debug!(count = pending.len(), "requeueing unsent envelopes");
                core.queue.requeue_front(pending);
            }

            if !current {
                return Outcome::Stop;
            }
            core.state = if reconnect {
                ConnectionState::Reconnecting {
                    attempt: core.attempts + 1,
                }
            } else {
                ConnectionState::Disconnected
            };
        }

        if reconnect {
            warn!(code = frame.code, reason = %frame.reason, "connection lost");
        } else {
            info!(reason = %frame.reason, "server closed the connection");
        }
        self.shared.emit(ChannelEvent::Disconnected(frame));

        if reconnect {
            Outcome::Reconnect
        } else {
            Outcome::Stop
        }
    }

    /// Count an attempt and sleep out the reconnect interval.
    ///
    /// Returns false when the task should stop.
    async fn wait_for_retry(&self) -> bool {
        let max = self.shared.config.reconnect_attempts;
        let attempt = {
            let mut core = self.shared.core();
            if !self.is_current(&core) {
                return false;
            }
            if core.attempts >= max {
                core.state = ConnectionState::Failed;
                core.waiters.clear();
                None
            } else {
                core.attempts += 1;
                core.state = ConnectionState::Reconnecting {
                    attempt: core.attempts,
                };
                Some(core.attempts)
            }
        };

        let Some(attempt) = attempt else {
            warn!(attempts = max, url = %self.shared.config.url, "giving up on reconnection");
            self.shared
                .emit(ChannelEvent::ReconnectFailed { attempts: max });
            return false;
        };

        info!(
            attempt,
            max,
            delay_ms = self.shared.config.reconnect_interval_ms,
            "reconnecting"
        );
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            _ = tokio::time::sleep(self.shared.config.reconnect_interval()) => {}
        }

        let mut core = self.shared.core();
        if !self.is_current(&core) {
            return false;
        }
        core.state = ConnectionState::Connecting;
        true
    }
}
