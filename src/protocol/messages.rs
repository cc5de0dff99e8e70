//! Wire messages exchanged on each channel
//!
//! Every message is a JSON object tagged by `kind`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decoration::{Decoration, DecorationTemplate};
use crate::geometry::{Point, Rect, Size};
use crate::selection::Selection;

use super::channel::ChannelName;

/// Frame to host, on the handshake window; carries the frame's port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HandshakeMessage {
    OpenChannel { channel: ChannelName, cycle: u64 },
}

/// Frame to host, on the area channel
///
/// Points and rects are frame-local client coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AreaEvent {
    Tap {
        point: Point,
    },
    LinkActivated {
        href: String,
        #[serde(rename = "outerHtml")]
        outer_html: String,
        point: Point,
    },
    DecorationActivated {
        id: String,
        group: String,
        rect: Rect,
        point: Point,
    },
    /// Natural size of the loaded page, sent once after the handshake
    ContentSize {
        size: Size,
    },
}

/// Host to frame, on the selection channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SelectionCommand {
    RequestSelection {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    ClearSelection,
}

/// Frame to host, on the selection channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SelectionReply {
    SelectionAvailable {
        #[serde(rename = "requestId")]
        request_id: String,
        selection: Option<Selection>,
    },
}

/// Host to frame, on the decorations channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DecorationCommand {
    RegisterTemplates {
        templates: BTreeMap<String, DecorationTemplate>,
    },
    AddDecoration {
        decoration: Decoration,
        group: String,
    },
    RemoveDecoration {
        id: String,
        group: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handshake_wire_format() {
        let message = HandshakeMessage::OpenChannel {
            channel: ChannelName::Decorations,
            cycle: 3,
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"kind": "openChannel", "channel": "decorations", "cycle": 3})
        );
    }

    #[test]
    fn test_link_event_wire_format() {
        let event: AreaEvent = serde_json::from_value(json!({
            "kind": "linkActivated",
            "href": "chapter2.xhtml",
            "outerHtml": "<a href=\"chapter2.xhtml\">next</a>",
            "point": {"x": 4.0, "y": 8.0}
        }))
        .unwrap();

        assert_eq!(
            event,
            AreaEvent::LinkActivated {
                href: "chapter2.xhtml".into(),
                outer_html: "<a href=\"chapter2.xhtml\">next</a>".into(),
                point: Point::new(4.0, 8.0),
            }
        );
    }

    #[test]
    fn test_selection_messages() {
        assert_eq!(
            serde_json::to_value(SelectionCommand::ClearSelection).unwrap(),
            json!({"kind": "clearSelection"})
        );

        let reply: SelectionReply = serde_json::from_value(json!({
            "kind": "selectionAvailable",
            "requestId": "r1",
            "selection": null
        }))
        .unwrap();
        assert_eq!(
            reply,
            SelectionReply::SelectionAvailable {
                request_id: "r1".into(),
                selection: None,
            }
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<DecorationCommand, _> =
            serde_json::from_value(json!({"kind": "explode", "group": "x"}));
        assert!(result.is_err());
    }
}
