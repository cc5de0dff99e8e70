//! In-process message ports
//!
//! A [`MessagePort`] is one end of an entangled pair: what one end posts,
//! the other receives, in order. Messages travel as JSON values so both
//! ends only agree on the wire format, never on Rust types.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::error::ProtocolError;

use super::channel::FrameSide;

/// One end of a message channel
#[derive(Debug)]
pub struct MessagePort {
    tx: UnboundedSender<Value>,
    rx: UnboundedReceiver<Value>,
}

/// Create an entangled pair of ports
pub fn message_channel() -> (MessagePort, MessagePort) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();
    (
        MessagePort { tx: a_tx, rx: b_rx },
        MessagePort { tx: b_tx, rx: a_rx },
    )
}

impl MessagePort {
    /// Serialize and send `message` to the other end
    pub fn post<T: Serialize>(&self, message: &T) -> Result<(), ProtocolError> {
        let value = serde_json::to_value(message)?;
        self.tx.send(value).map_err(|_| ProtocolError::Disconnected)
    }

    /// Next raw message, without waiting
    pub fn try_recv(&mut self) -> Option<Value> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next raw message; `None` once the other end is gone
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Every message currently queued, decoded as `T`
    pub fn drain<T: DeserializeOwned>(&mut self) -> Vec<Result<T, ProtocolError>> {
        std::iter::from_fn(|| self.try_recv()).map(decode).collect()
    }

    /// Whether the other end has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Decode a raw message
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(value)?)
}

/// A handshake as seen by the host: who sent it, what it said, and the port
/// it transferred
#[derive(Debug)]
pub struct Envelope {
    pub side: FrameSide,
    pub message: Value,
    pub port: Option<MessagePort>,
}

/// Host-side receiver for handshake messages from every frame
#[derive(Debug)]
pub struct HostInbox {
    tx: UnboundedSender<Envelope>,
    rx: UnboundedReceiver<Envelope>,
}

impl Default for HostInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl HostInbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Handle a frame on `side` uses to reach the host
    ///
    /// The side is stamped by the transport, not claimed by the frame.
    pub fn parent_for(&self, side: FrameSide) -> ParentWindow {
        ParentWindow {
            side,
            tx: self.tx.clone(),
        }
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

/// A frame's handle on the host window
#[derive(Debug, Clone)]
pub struct ParentWindow {
    side: FrameSide,
    tx: UnboundedSender<Envelope>,
}

impl ParentWindow {
    pub fn side(&self) -> FrameSide {
        self.side
    }

    /// Post `message` to the host, transferring `port` along with it
    pub fn post<T: Serialize>(&self, message: &T, port: Option<MessagePort>) -> Result<(), ProtocolError> {
        let envelope = Envelope {
            side: self.side,
            message: serde_json::to_value(message)?,
            port,
        };
        self.tx.send(envelope).map_err(|_| ProtocolError::Disconnected)
    }
}
