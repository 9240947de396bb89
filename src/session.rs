//! Session scope
//!
//! A session owns the connection manager and, once provided, the notification
//! provider. Consumers reach both through `use_socket` and `use_notification`.
//! Ending the session deregisters the notification handler and then closes the
//! channel.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::notifications::{NotificationProvider, NotificationStore};
use crate::socket::{Channel, ConnectionState, SocketManager, Transport};
use crate::storage::Storage;
use std::sync::Arc;

/// What socket consumers see
#[derive(Debug, Clone)]
pub struct SocketContext {
    pub channel: Option<Channel>,
    pub connected: bool,
    pub state: ConnectionState,
}

pub struct Session {
    // Field order matters: the handler is deregistered before the channel closes
    notifications: Option<NotificationProvider>,
    socket: SocketManager,
}

impl Session {
    pub fn mount(config: &Config, storage: &dyn Storage, transport: Arc<dyn Transport>) -> Self {
        let mut socket = SocketManager::new(config, transport);
        socket.mount(storage);

        Self {
            notifications: None,
            socket,
        }
    }

    /// Mount the notification provider. Calling it again returns the existing store.
    pub fn provide_notifications(&mut self) -> NotificationStore {
        let provider = self
            .notifications
            .get_or_insert_with(|| NotificationProvider::mount(&self.socket));
        provider.store().clone()
    }

    pub fn remove_notifications(&mut self) {
        if let Some(provider) = self.notifications.take() {
            provider.unmount();
        }
    }

    pub fn use_socket(&self) -> SocketContext {
        SocketContext {
            channel: self.socket.channel().cloned(),
            connected: self.socket.connected(),
            state: self.socket.state(),
        }
    }

    /// The notification store, or an error when no provider is mounted
    pub fn use_notification(&self) -> Result<NotificationStore> {
        self.notifications
            .as_ref()
            .map(|provider| provider.store().clone())
            .ok_or(Error::OutsideProvider("use_notification"))
    }

    pub fn unmount(mut self) {
        self.remove_notifications();
        self.socket.unmount();
    }
}
