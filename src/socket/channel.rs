use super::transport::{Connection, Frame, FrameSink, Transport};
use super::ConnectionState;
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

pub(super) struct Inner {
    endpoint: String,
    state: watch::Sender<ConnectionState>,
    handlers: Mutex<HashMap<String, Vec<(u64, Handler)>>>,
    next_handler: AtomicU64,
    connection: Mutex<Option<Box<dyn Connection>>>,
    closed: AtomicBool,
}

impl Inner {
    pub(super) fn dispatch(&self, frame: Frame) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        match frame {
            Frame::Opened => {
                log::info!("[socket] Connected to {}", self.endpoint);
                self.state.send_replace(ConnectionState::Connected);
            }
            Frame::Closed { reason } => {
                match reason {
                    Some(reason) => log::info!("[socket] Disconnected from {}: {reason}", self.endpoint),
                    None => log::info!("[socket] Disconnected from {}", self.endpoint),
                }
                self.state.send_replace(ConnectionState::Disconnected);
            }
            Frame::Event { name, payload } => {
                // Snapshot so handlers may subscribe or unsubscribe while running
                let handlers: Vec<Handler> = {
                    let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
                    match handlers.get(&name) {
                        Some(list) => list.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
                        None => Vec::new(),
                    }
                };

                if handlers.is_empty() {
                    log::debug!("[socket] No handler for '{name}' event");
                }
                for handler in handlers {
                    handler(&payload);
                }
            }
        }
    }

    fn remove_handler(&self, event: &str, id: u64) {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = handlers.get_mut(event) {
            list.retain(|(handler_id, _)| *handler_id != id);
            if list.is_empty() {
                handlers.remove(event);
            }
        }
    }
}

/// Shared handle to one bidirectional event link.
///
/// Clones observe the same link. Only the connection manager closes it.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

impl Channel {
    pub(crate) fn open(transport: &dyn Transport, endpoint: &str, token: &str) -> Result<Self> {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let inner = Arc::new(Inner {
            endpoint: endpoint.to_string(),
            state,
            handlers: Mutex::new(HashMap::new()),
            next_handler: AtomicU64::new(1),
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let sink = FrameSink {
            inner: Arc::downgrade(&inner),
        };
        let connection = transport.open(endpoint, token, sink)?;
        *inner.connection.lock().unwrap_or_else(|e| e.into_inner()) = Some(connection);

        Ok(Self { inner })
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch connection state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Register `handler` for inbound `event` frames until the subscription is released
    pub fn on<F>(&self, event: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.inner.next_handler.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            inner: Arc::downgrade(&self.inner),
            event: event.to_string(),
            id,
            active: true,
        }
    }

    /// Number of handlers currently registered for `event`
    pub fn handler_count(&self, event: &str) -> usize {
        let handlers = self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers.get(event).map_or(0, Vec::len)
    }

    /// Close the link. Only the first call reaches the transport.
    pub(crate) fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let connection = self
            .inner
            .connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(mut connection) = connection {
            connection.close();
        }

        self.inner.state.send_replace(ConnectionState::Disconnected);
        log::info!("[socket] Closed channel to {}", self.inner.endpoint);
    }
}

/// Registration of one event handler. Dropping it deregisters the handler.
#[must_use = "dropping a Subscription deregisters its handler"]
pub struct Subscription {
    inner: Weak<Inner>,
    event: String,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.inner.upgrade() {
            inner.remove_handler(&self.event, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
