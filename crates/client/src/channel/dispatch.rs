// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatcher: `event name -> ordered callbacks`.
//!
//! Registering the same callback twice is allowed and invokes it twice
//! (at-least-once-per-registration). Every registration gets its own
//! [`Subscription`] handle, which removes exactly that registration.
//!
//! A dispatch pass runs over a snapshot of the callbacks, so callbacks may
//! subscribe, unsubscribe or call back into the channel. A panicking
//! callback is logged and skipped; the rest of the pass still runs.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::error;

use super::events::ChannelEvent;

/// A shared subscriber callback.
pub type Callback = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

/// Handle to one registration, returned by [`Dispatcher::on`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    event: String,
    id: u64,
}

impl Subscription {
    /// The event this registration listens to.
    pub fn event(&self) -> &str {
        &self.event
    }
}

struct Listener {
    id: u64,
    callback: Callback,
}

/// Typed publish/subscribe registry.
#[derive(Default)]
pub struct Dispatcher {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event.
    pub fn on<F>(&self, event: &str, callback: F) -> Subscription
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        self.on_callback(event, Arc::new(callback))
    }

    /// Register a shared callback for an event.
    pub fn on_callback(&self, event: &str, callback: Callback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(event.to_string())
            .or_default()
            .push(Listener { id, callback });
        Subscription {
            event: event.to_string(),
            id,
        }
    }

    /// Remove one registration. Returns false if it was already gone.
    pub fn off(&self, subscription: &Subscription) -> bool {
        let mut listeners = self.lock();
        let Some(list) = listeners.get_mut(&subscription.event) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != subscription.id);
        let removed = list.len() < before;
        if list.is_empty() {
            listeners.remove(&subscription.event);
        }
        removed
    }

    /// Remove every registration of `callback` for an event.
    ///
    /// Callbacks are matched by pointer identity. Returns how many were removed.
    pub fn off_callback(&self, event: &str, callback: &Callback) -> usize {
        let mut listeners = self.lock();
        let Some(list) = listeners.get_mut(event) else {
            return 0;
        };
        let before = list.len();
        list.retain(|l| !Arc::ptr_eq(&l.callback, callback));
        let removed = before - list.len();
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Invoke every callback registered for `event`, in registration order.
    ///
    /// Returns the number of callbacks that returned normally.
    pub fn emit(&self, event: &str, data: &ChannelEvent) -> usize {
        let callbacks: Vec<Callback> = self
            .lock()
            .get(event)
            .map(|list| list.iter().map(|l| Arc::clone(&l.callback)).collect())
            .unwrap_or_default();

        let mut completed = 0;
        for callback in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(data))) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    error!(
                        event = %event,
                        panic = %panic_message(payload.as_ref()),
                        "subscriber callback panicked"
                    );
                }
            }
        }
        completed
    }

    /// Number of registrations for an event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    /// Remove every registration for every event.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Listener>>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.lock();
        let mut counts: Vec<(&String, usize)> =
            listeners.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("Dispatcher")
            .field("listeners", &counts)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
