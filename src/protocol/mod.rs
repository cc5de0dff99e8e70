//! Cross-frame messaging
//!
//! Each frame opens three named channels to the host by posting an
//! `openChannel` handshake with a freshly created port. The host binds the
//! port to the channel's bridge and counts handshakes per channel until every
//! expected side has completed, at which point the channel is available.
//! Handshakes carry the load-cycle token so late messages from a previous
//! load are ignored.

mod channel;
mod messages;
mod port;

pub use channel::{ChannelName, FrameSide, HandshakeOutcome, ReadinessTracker};
pub use messages::{AreaEvent, DecorationCommand, HandshakeMessage, SelectionCommand, SelectionReply};
pub use port::{decode, message_channel, Envelope, HostInbox, MessagePort, ParentWindow};
