//! Host side of the navigator
//!
//! [`AreaManager`] loads pages into slots, waits for every loaded frame to
//! complete its channel handshakes, fits the pages into the viewport and
//! converts frame events into host space before handing them to a
//! [`NavigatorListener`].

mod area;
mod bridges;
mod fit;
mod listener;

pub use area::{AreaManager, AreaState, LayoutMode};
pub use bridges::{AreaBridge, ChannelBridge, DecorationBridge, SelectionBridge};
pub use fit::{compute_scale, Fit, ViewportDirective};
pub use listener::{HostEnvironment, NavigatorEvent, NavigatorListener};
