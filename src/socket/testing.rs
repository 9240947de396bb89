//! In-process transport for tests: frames are injected by the test and
//! delivered synchronously to the latest opened channel.

use super::transport::{Connection, Frame, FrameSink, Transport};
use crate::error::{Error, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    tokens: Vec<String>,
    endpoints: Vec<String>,
    sinks: Vec<FrameSink>,
    closes: usize,
    refuse: bool,
}

#[derive(Clone, Default)]
pub struct Loopback {
    state: Arc<Mutex<State>>,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `open` fails outright
    pub fn refusing() -> Self {
        let loopback = Self::default();
        loopback.state.lock().unwrap().refuse = true;
        loopback
    }

    pub fn opens(&self) -> usize {
        self.state.lock().unwrap().sinks.len()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().tokens.clone()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.state.lock().unwrap().endpoints.clone()
    }

    pub fn emit(&self, frame: Frame) {
        let sink = self.state.lock().unwrap().sinks.last().cloned();
        if let Some(sink) = sink {
            sink.deliver(frame);
        }
    }

    pub fn notify(&self, payload: Value) {
        self.emit(Frame::Event {
            name: "notification".to_string(),
            payload,
        });
    }
}

struct LoopbackConnection {
    state: Arc<Mutex<State>>,
}

impl Connection for LoopbackConnection {
    fn close(&mut self) {
        self.state.lock().unwrap().closes += 1;
    }
}

impl Transport for Loopback {
    fn open(&self, endpoint: &str, token: &str, sink: FrameSink) -> Result<Box<dyn Connection>> {
        let mut state = self.state.lock().unwrap();
        if state.refuse {
            return Err(Error::Transport("connection refused".to_string()));
        }

        state.tokens.push(token.to_string());
        state.endpoints.push(endpoint.to_string());
        state.sinks.push(sink);

        Ok(Box::new(LoopbackConnection {
            state: Arc::clone(&self.state),
        }))
    }
}
