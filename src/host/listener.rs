//! Host-facing callbacks and the environment the navigator drives

use serde::Serialize;

use crate::geometry::{Point, Rect};
use crate::protocol::{ChannelName, FrameSide, ParentWindow};
use crate::selection::Selection;

use super::fit::ViewportDirective;

/// Everything the navigator reports to the embedding application
///
/// Points and rects are in host space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NavigatorEvent {
    Tap {
        side: FrameSide,
        point: Point,
    },
    LinkActivated {
        side: FrameSide,
        href: String,
        #[serde(rename = "outerHtml")]
        outer_html: String,
        point: Point,
    },
    DecorationActivated {
        side: FrameSide,
        id: String,
        group: String,
        rect: Rect,
        point: Point,
    },
    LayoutComplete,
    ChannelAvailable {
        channel: ChannelName,
    },
    SelectionAvailable {
        side: FrameSide,
        #[serde(rename = "requestId")]
        request_id: String,
        selection: Option<Selection>,
    },
}

impl NavigatorEvent {
    /// Deliver to the matching listener callback
    pub fn dispatch<L: NavigatorListener + ?Sized>(self, listener: &mut L) {
        match self {
            NavigatorEvent::Tap { side, point } => listener.on_tap(side, point),
            NavigatorEvent::LinkActivated {
                side,
                href,
                outer_html,
                point,
            } => listener.on_link_activated(side, &href, &outer_html, point),
            NavigatorEvent::DecorationActivated {
                side,
                id,
                group,
                rect,
                point,
            } => listener.on_decoration_activated(side, &id, &group, rect, point),
            NavigatorEvent::LayoutComplete => listener.on_layout_complete(),
            NavigatorEvent::ChannelAvailable { channel } => listener.on_channel_available(channel),
            NavigatorEvent::SelectionAvailable {
                side,
                request_id,
                selection,
            } => listener.on_selection_available(side, &request_id, selection),
        }
    }
}

/// Callbacks from the navigator; all default to no-ops
pub trait NavigatorListener {
    fn on_tap(&mut self, _side: FrameSide, _point: Point) {}

    fn on_link_activated(&mut self, _side: FrameSide, _href: &str, _outer_html: &str, _point: Point) {}

    fn on_decoration_activated(
        &mut self,
        _side: FrameSide,
        _id: &str,
        _group: &str,
        _rect: Rect,
        _point: Point,
    ) {
    }

    fn on_layout_complete(&mut self) {}

    fn on_channel_available(&mut self, _channel: ChannelName) {}

    fn on_selection_available(&mut self, _side: FrameSide, _request_id: &str, _selection: Option<Selection>) {}
}

/// Records every event, in order
impl NavigatorListener for Vec<NavigatorEvent> {
    fn on_tap(&mut self, side: FrameSide, point: Point) {
        self.push(NavigatorEvent::Tap { side, point });
    }

    fn on_link_activated(&mut self, side: FrameSide, href: &str, outer_html: &str, point: Point) {
        self.push(NavigatorEvent::LinkActivated {
            side,
            href: href.to_string(),
            outer_html: outer_html.to_string(),
            point,
        });
    }

    fn on_decoration_activated(&mut self, side: FrameSide, id: &str, group: &str, rect: Rect, point: Point) {
        self.push(NavigatorEvent::DecorationActivated {
            side,
            id: id.to_string(),
            group: group.to_string(),
            rect,
            point,
        });
    }

    fn on_layout_complete(&mut self) {
        self.push(NavigatorEvent::LayoutComplete);
    }

    fn on_channel_available(&mut self, channel: ChannelName) {
        self.push(NavigatorEvent::ChannelAvailable { channel });
    }

    fn on_selection_available(&mut self, side: FrameSide, request_id: &str, selection: Option<Selection>) {
        self.push(NavigatorEvent::SelectionAvailable {
            side,
            request_id: request_id.to_string(),
            selection,
        });
    }
}

/// What the host page offers the navigator
pub trait HostEnvironment {
    /// Start loading `url` into the slot for `side`
    ///
    /// `parent` is the handle the loaded frame must use for its handshakes;
    /// `cycle` is the load-cycle token it must echo.
    fn load_url(&mut self, side: FrameSide, url: &str, cycle: u64, parent: ParentWindow);

    /// Apply a zoom directive to the host document
    fn write_viewport(&mut self, directive: &ViewportDirective);

    /// Position and show or hide the slot for `side`, in host CSS px
    fn place_slot(&mut self, side: FrameSide, rect: Rect, visible: bool);
}
