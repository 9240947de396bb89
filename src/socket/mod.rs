//! Connection manager for the real-time notification socket
//!
//! The manager owns at most one live [`Channel`]. Mounting reads the session
//! credential from persisted storage; without one it stays idle and never
//! contacts the server. With a token it opens a single channel through the
//! configured [`Transport`]. Unmounting (or dropping the manager) closes the
//! channel. There is no automatic reconnect: a closed link stays closed until
//! the next mount.
//!
//! ```text
//! Uninitialized --token--> Connecting --> Connected --> Disconnected
//! Uninitialized --no token--> Idle
//! ```

pub mod channel;
pub mod transport;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::Config;
use crate::storage::{read_token, Storage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use channel::{Channel, Subscription};
pub use transport::{endpoint, Connection, Frame, FrameSink, Transport};
pub use websocket::WebSocketTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Uninitialized,
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unmounted,
    Idle,
    Failed,
    Open,
}

pub struct SocketManager {
    endpoint: String,
    transport: Arc<dyn Transport>,
    channel: Option<Channel>,
    phase: Phase,
}

impl SocketManager {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint(&config.server_url),
            transport,
            channel: None,
            phase: Phase::Unmounted,
        }
    }

    /// Read the credential and open the channel if there is one.
    ///
    /// A previous channel is closed first. Transport errors are not returned:
    /// they leave the manager disconnected.
    pub fn mount(&mut self, storage: &dyn Storage) {
        self.unmount();

        let Some(token) = read_token(storage) else {
            log::debug!("[socket] No credential stored, staying offline");
            self.phase = Phase::Idle;
            return;
        };

        match Channel::open(self.transport.as_ref(), &self.endpoint, &token) {
            Ok(channel) => {
                self.channel = Some(channel);
                self.phase = Phase::Open;
            }
            Err(err) => {
                log::warn!("[socket] Could not open channel to {}: {err}", self.endpoint);
                self.phase = Phase::Failed;
            }
        }
    }

    /// Close the channel if one exists
    pub fn unmount(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        self.phase = Phase::Unmounted;
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    pub fn connected(&self) -> bool {
        self.channel.as_ref().is_some_and(Channel::connected)
    }

    pub fn state(&self) -> ConnectionState {
        match (self.phase, &self.channel) {
            (Phase::Unmounted, _) => ConnectionState::Uninitialized,
            (Phase::Idle, _) => ConnectionState::Idle,
            (Phase::Failed, _) | (Phase::Open, None) => ConnectionState::Disconnected,
            (Phase::Open, Some(channel)) => channel.state(),
        }
    }
}

impl Drop for SocketManager {
    fn drop(&mut self) {
        self.unmount();
    }
}
