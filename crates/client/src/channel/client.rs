// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The channel facade.
//!
//! [`Channel`] is a cheap, cloneable handle. Every method except
//! [`Channel::connect`] and [`Channel::close`] is synchronous; the network
//! work happens on a background task spawned by `connect()`, so a channel
//! must be used from inside a Tokio runtime.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use serde_json::Value;
use tether_core::{ClockSource, CloseFrame, Envelope, SystemClock};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::cache::{CacheStats, TtlCache};
use super::connection::{Connection, Core, Shared, DISCONNECT_REASON};
use super::dispatch::{Callback, Dispatcher, Subscription};
use super::events::ChannelEvent;
use super::transport::{TransportFactory, WebSocketTransport};
use crate::config::ChannelConfig;
use crate::error::{Error, Result};

/// Connection state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected, and not trying to be.
    Disconnected,
    /// Opening a transport.
    Connecting,
    /// Connected to the server.
    Connected,
    /// Waiting to retry after an unintentional close.
    Reconnecting { attempt: u32 },
    /// Reconnection gave up. Only `connect()` leaves this state.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// Options for [`Channel::send_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Memoize the envelope under `msg_<id>`.
    pub cache: bool,
    /// TTL of the memoized envelope. Defaults to the channel's cache TTL.
    pub ttl: Option<Duration>,
}

impl SendOptions {
    /// Cache the envelope with the default TTL.
    pub fn cached() -> Self {
        SendOptions {
            cache: true,
            ttl: None,
        }
    }

    /// Cache the envelope for `ttl`.
    pub fn cached_for(ttl: Duration) -> Self {
        SendOptions {
            cache: true,
            ttl: Some(ttl),
        }
    }
}

/// A resilient real-time channel.
///
/// Clones share one connection, queue, cache and dispatcher. When the last
/// clone is dropped the connection is closed.
///
/// Callbacks are owned by the channel, so a callback that captures a clone
/// keeps the channel alive. Capture a [`WeakChannel`] instead.
#[derive(Clone)]
pub struct Channel {
    handle: Arc<Handle>,
}

/// A non-owning reference to a [`Channel`], from [`Channel::downgrade`].
#[derive(Clone)]
pub struct WeakChannel {
    handle: Weak<Handle>,
}

impl WeakChannel {
    /// The channel, if any strong handle is still alive.
    pub fn upgrade(&self) -> Option<Channel> {
        self.handle.upgrade().map(|handle| Channel { handle })
    }
}

impl fmt::Debug for WeakChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakChannel")
            .field("alive", &(self.handle.strong_count() > 0))
            .finish()
    }
}

struct Handle {
    shared: Arc<Shared>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.shared.core().reset();
    }
}

impl Channel {
    /// Create a channel that connects over WebSocket.
    pub fn new(config: ChannelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_transport(
            config,
            WebSocketTransport::factory(),
            Arc::new(SystemClock),
        ))
    }

    /// Create a channel with a custom transport and clock (for testing).
    ///
    /// The config is used as given; only [`Channel::new`] validates it.
    pub fn with_transport(
        config: ChannelConfig,
        factory: TransportFactory,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let cache = TtlCache::new(
            config.cache_ttl(),
            config.max_cache_entries,
            Arc::clone(&clock),
        );
        let shared = Shared {
            config,
            core: Mutex::new(Core::new()),
            cache: Mutex::new(cache),
            dispatcher: Dispatcher::new(),
            clock,
            factory,
        };
        Channel {
            handle: Arc::new(Handle {
                shared: Arc::new(shared),
            }),
        }
    }

    fn shared(&self) -> &Arc<Shared> {
        &self.handle.shared
    }

    /// A reference that does not keep the channel open, for use inside
    /// callbacks.
    pub fn downgrade(&self) -> WeakChannel {
        WeakChannel {
            handle: Arc::downgrade(&self.handle),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared().config
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared().core().state
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Open the connection.
    ///
    /// Resolves once the transport is open and the outbound queue has been
    /// flushed. Fails if that first attempt fails, in which case reconnection
    /// carries on in the background. Does nothing if already connected; joins
    /// the in-flight attempt if one is running. From any other state this
    /// starts over with a fresh attempt counter.
    pub async fn connect(&self) -> Result<()> {
        let shared = self.shared();
        let ready = {
            let mut core = shared.core();
            match core.state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => {
                    debug!("joining in-flight connection attempt");
                }
                _ => self.start(&mut core),
            }
            let (ready_tx, ready_rx) = oneshot::channel();
            core.waiters.push(ready_tx);
            ready_rx
        };

        self.ensure_sweeper();
        ready.await.map_err(|_| Error::ConnectionCancelled)?
    }

    fn start(&self, core: &mut Core) {
        let shared = self.shared();
        let waiters = std::mem::take(&mut core.waiters);
        core.reset();
        core.waiters = waiters;
        core.state = ConnectionState::Connecting;

        let cancel = CancellationToken::new();
        let connection = Connection::new(Arc::clone(shared), core.generation, cancel.clone());
        core.cancel = Some(cancel);
        core.task = Some(tokio::spawn(connection.run()));
        info!(url = %shared.config.url, "connecting");
    }

    /// Start the periodic cache sweep once per channel.
    fn ensure_sweeper(&self) {
        let shared = self.shared();
        let Some(period) = shared.config.cleanup_interval() else {
            return;
        };
        {
            let mut core = shared.core();
            if core.sweeper {
                return;
            }
            core.sweeper = true;
        }
        tokio::spawn(sweep_periodically(Arc::downgrade(shared), period));
    }

    /// Close the connection with code 1000 and stop reconnecting.
    ///
    /// Cancels any pending reconnect timer. Emits `disconnected` if the
    /// channel was connected. Queued envelopes stay queued.
    pub fn disconnect(&self) {
        let shared = self.shared();
        let previous = {
            let mut core = shared.core();
            let previous = core.state;
            core.reset();
            previous
        };

        if previous == ConnectionState::Connected {
            info!(url = %shared.config.url, "disconnected");
            shared.emit(ChannelEvent::Disconnected(CloseFrame::normal(
                DISCONNECT_REASON,
            )));
        } else {
            debug!(state = %previous, "disconnect");
        }
    }

    /// Disconnect and wait for the connection task to finish its close
    /// handshake.
    pub async fn close(&self) {
        let task = self.shared().core().task.take();
        self.disconnect();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Send an envelope of type `kind`. Returns the envelope id.
    ///
    /// Never blocks and never fails: while disconnected the envelope is
    /// queued and goes out on the next connect.
    pub fn send(&self, kind: &str, payload: Value) -> String {
        self.send_with(kind, payload, SendOptions::default())
    }

    /// Send an envelope, optionally memoizing it in the cache.
    pub fn send_with(&self, kind: &str, payload: Value, options: SendOptions) -> String {
        let shared = self.shared();
        let envelope = Envelope::new(kind, payload, shared.clock.as_ref());
        let id = envelope.id().to_string();

        if options.cache {
            shared
                .cache()
                .set(envelope.cache_key(), envelope.to_value(), options.ttl);
        }

        let mut core = shared.core();
        let envelope = match &core.live {
            Some(live) => match live.send(envelope) {
                Ok(()) => return id,
                Err(mpsc::error::SendError(envelope)) => envelope,
            },
            None => envelope,
        };
        debug!(id = %id, kind, state = %core.state, "queued");
        core.queue.push(envelope);
        id
    }

    /// Register a callback for an event.
    ///
    /// `event` is a lifecycle name from [`super::event`] or an envelope type.
    /// A callback holding a strong [`Channel`] clone keeps the channel open
    /// until it is removed; hold a [`WeakChannel`] to call back in.
    pub fn on<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.shared().dispatcher.on(event, callback)
    }

    /// Register a shared callback, which can later be removed with
    /// [`Channel::off_callback`].
    ///
    /// The same ownership rule as [`Channel::on`] applies.
    pub fn on_callback(&self, event: &str, callback: Callback) -> Subscription {
        self.shared().dispatcher.on_callback(event, callback)
    }

    /// Remove one registration.
    pub fn off(&self, subscription: &Subscription) -> bool {
        self.shared().dispatcher.off(subscription)
    }

    /// Remove every registration of a shared callback for an event.
    pub fn off_callback(&self, event: &str, callback: &Callback) -> usize {
        self.shared().dispatcher.off_callback(event, callback)
    }

    /// Receive an event on a channel instead of a callback.
    ///
    /// The registration goes away on the first event after the receiver is
    /// dropped.
    pub fn subscribe(&self, event: &str) -> mpsc::UnboundedReceiver<ChannelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let registration: Arc<OnceLock<Subscription>> = Arc::new(OnceLock::new());
        let shared: Weak<Shared> = Arc::downgrade(self.shared());

        let slot = Arc::clone(&registration);
        let subscription = self.on(event, move |event| {
            if tx.send(event.clone()).is_err() {
                if let (Some(shared), Some(subscription)) = (shared.upgrade(), slot.get()) {
                    shared.dispatcher.off(subscription);
                }
            }
        });
        let _ = registration.set(subscription);
        rx
    }

    /// Number of envelopes waiting for a connection.
    pub fn queue_size(&self) -> usize {
        self.shared().core().queue.len()
    }

    /// Copy of the queued envelopes, front first.
    pub fn queued(&self) -> Vec<Envelope> {
        self.shared().core().queue.snapshot()
    }

    /// Drop every queued envelope. Returns how many were dropped.
    pub fn clear_queue(&self) -> usize {
        let dropped = self.shared().core().queue.clear();
        if dropped > 0 {
            info!(dropped, "cleared outbound queue");
        }
        dropped
    }

    /// Look up a live cache entry.
    ///
    /// Inbound envelopes of a cacheable type are stored under their id;
    /// envelopes sent with [`SendOptions::cache`] under `msg_<id>`.
    pub fn cached(&self, key: &str) -> Option<Value> {
        self.shared().cache().get(key)
    }

    /// Store a value in the channel cache.
    pub fn cache(&self, key: &str, data: Value, ttl: Option<Duration>) {
        self.shared().cache().set(key, data, ttl);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared().cache().stats()
    }

    pub fn clear_cache(&self) {
        self.shared().cache().clear();
    }

    /// Drop expired cache entries now. Returns how many were removed.
    pub fn sweep_cache(&self) -> usize {
        self.shared().cache().sweep()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("url", &self.config().url)
            .field("state", &self.state())
            .field("queued", &self.queue_size())
            .finish()
    }
}

async fn sweep_periodically(shared: Weak<Shared>, period: Duration) {
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let removed = shared.cache().sweep();
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
    }
}
