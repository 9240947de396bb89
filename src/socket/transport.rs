use super::channel::Inner;
use crate::error::Result;
use serde_json::Value;
use std::sync::Weak;

/// Path of the notification socket on the server
pub const NOTIFICATION_PATH: &str = "/ws/notifications";

/// Something the transport observed on the link
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Opened,
    Event { name: String, payload: Value },
    Closed { reason: Option<String> },
}

/// Where a transport delivers frames for one channel.
///
/// Frames are dispatched on the caller's task in the order they are delivered.
/// Once the channel is closed or dropped, delivered frames are ignored.
#[derive(Clone)]
pub struct FrameSink {
    pub(super) inner: Weak<Inner>,
}

impl FrameSink {
    pub fn deliver(&self, frame: Frame) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dispatch(frame);
        }
    }
}

/// A live link opened by a [`Transport`]
pub trait Connection: Send {
    fn close(&mut self);
}

/// Opens bidirectional event links to the server.
///
/// `open` must return without waiting for the handshake: the outcome is
/// reported through the sink as `Opened` or `Closed`.
pub trait Transport: Send + Sync {
    fn open(&self, endpoint: &str, token: &str, sink: FrameSink) -> Result<Box<dyn Connection>>;
}

/// Build the websocket address of the notification socket from the server address.
///
/// Expected format: http://host:port or https://host:port
pub fn endpoint(server_url: &str) -> String {
    let server_url = server_url.trim().trim_end_matches('/');

    let (scheme, base, default_port) = if let Some(base) = server_url
        .strip_prefix("https://")
        .or_else(|| server_url.strip_prefix("wss://"))
    {
        ("wss", base, 443)
    } else {
        let base = server_url
            .strip_prefix("http://")
            .or_else(|| server_url.strip_prefix("ws://"))
            .unwrap_or(server_url);
        ("ws", base, 80)
    };

    // drop any path the address carries
    let base = base.split('/').next().unwrap_or(base);

    let (host, port) = match base.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().unwrap_or(default_port)),
        None => (base, default_port),
    };

    format!("{scheme}://{host}:{port}{NOTIFICATION_PATH}")
}
