//! Error types for the navigator bridge
//!
//! No failure here is fatal to a frame or to the host. Components recover at
//! their boundary (log and drop one decoration, one message or one layout
//! pass); these types exist so that recovery point can see what went wrong.

use thiserror::Error;

use crate::protocol::{ChannelName, FrameSide};

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Decoration error: {0}")]
    Decoration(#[from] DecorationError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while resolving or instantiating one decoration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecorationError {
    /// Neither a selector nor a text quote was given
    #[error("Decoration {0} has no anchor")]
    MissingAnchor(String),

    /// Selector matched nothing
    #[error("Selector not found: {0}")]
    SelectorNotFound(String),

    /// Text quote matched nothing within the scope
    #[error("Text quote not found: {0:?}")]
    QuoteNotFound(String),

    /// Anchor resolved to a collapsed range
    #[error("Anchor of decoration {0} resolved to an empty range")]
    EmptyRange(String),

    /// No template registered for the style key
    #[error("Unknown decoration style: {0}")]
    UnknownStyle(String),

    /// Element markup did not produce an element
    #[error("Malformed decoration markup: {0}")]
    MalformedMarkup(String),
}

/// Failures on the message channels
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Channel {channel} is not available on side {side}")]
    Unavailable { channel: ChannelName, side: FrameSide },

    #[error("Peer endpoint disconnected")]
    Disconnected,
}
