//! Navigator Bridge
//!
//! The rendering bridge between a reading host and the one or two content
//! frames it displays: decorations laid out inside each frame, text
//! selection extraction, fixed-layout fitting, and the channel handshake
//! that connects them.
//!
//! # Modules
//!
//! - `geometry`: points, rects, frame/host coordinate transforms
//! - `dom`: the document abstraction frames work against
//! - `decoration`: anchoring, layout, hit-testing and diffing of decorations
//! - `selection`: frame-side selection snapshots
//! - `protocol`: channel names, wire messages, ports and readiness tracking
//! - `frame`: the bridge running inside each frame
//! - `host`: the area manager and channel bridges on the host side
//! - `replay`: in-process scenario runner used by the binary

pub mod config;
pub mod decoration;
pub mod dom;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod host;
pub mod protocol;
pub mod replay;
pub mod selection;

pub use config::BridgeConfig;
pub use error::{BridgeError, DecorationError, ProtocolError, Result};
pub use frame::FrameBridge;
pub use host::{AreaManager, Fit, HostEnvironment, NavigatorEvent, NavigatorListener};
