use super::transport::{Connection, Frame, FrameSink, Transport};
use crate::error::{Error, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        Message,
    },
};

/// Inbound message envelope: `{"event": "notification", "data": {...}}`
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

fn decode(text: &str) -> Option<Frame> {
    match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => Some(Frame::Event {
            name: envelope.event,
            payload: envelope.data,
        }),
        Err(err) => {
            log::debug!("[socket] Dropping undecodable message: {err}");
            None
        }
    }
}

/// Websocket transport authenticating with `Authorization: Bearer <token>`.
///
/// Each `open` spawns one task on the current tokio runtime that performs the
/// handshake and pumps inbound messages into the sink until the server closes
/// the link, the stream fails, or the connection is closed locally.
#[derive(Debug, Default, Clone)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

struct WebSocketConnection {
    shutdown: Option<oneshot::Sender<()>>,
}

impl Connection for WebSocketConnection {
    fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, endpoint: &str, token: &str, sink: FrameSink) -> Result<Box<dyn Connection>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Transport(format!("no async runtime: {e}")))?;

        let mut request = endpoint
            .into_client_request()
            .map_err(|e| Error::Transport(format!("invalid endpoint {endpoint}: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| Error::Transport(format!("invalid token: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (shutdown, shutdown_rx) = oneshot::channel();
        log::info!("[socket] Connecting to {endpoint}");
        runtime.spawn(run(request, sink, shutdown_rx));

        Ok(Box::new(WebSocketConnection {
            shutdown: Some(shutdown),
        }))
    }
}

async fn run(
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    sink: FrameSink,
    mut shutdown: oneshot::Receiver<()>,
) {
    let ws_stream = tokio::select! {
        _ = &mut shutdown => return,
        result = connect_async(request) => match result {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                sink.deliver(Frame::Closed {
                    reason: Some(format!("handshake failed: {e}")),
                });
                return;
            }
        },
    };

    sink.deliver(Frame::Opened);
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            // Local close, or the connection handle was dropped
            _ = &mut shutdown => {
                let _ = ws_sender.send(Message::Close(None)).await;
                return;
            }

            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(frame) = decode(&text) {
                        sink.deliver(frame);
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws_sender.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    sink.deliver(Frame::Closed {
                        reason: Some("server closed connection".to_string()),
                    });
                    return;
                }
                Some(Err(e)) => {
                    sink.deliver(Frame::Closed {
                        reason: Some(format!("websocket error: {e}")),
                    });
                    return;
                }
                None => {
                    sink.deliver(Frame::Closed {
                        reason: Some("stream ended".to_string()),
                    });
                    return;
                }
                _ => {}
            }
        }
    }
}
