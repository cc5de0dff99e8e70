//! Frame-side bridge
//!
//! Runs inside one content frame: opens the three channels to the host,
//! executes decoration and selection commands against the document, and
//! reports gestures, link and decoration activations and the page's natural
//! size on the area channel. Everything it posts is frame-local; the host
//! converts to its own space.

use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::decoration::DecorationEngine;
use crate::dom::ContentDocument;
use crate::error::ProtocolError;
use crate::geometry::Point;
use crate::protocol::{
    message_channel, AreaEvent, ChannelName, DecorationCommand, FrameSide, HandshakeMessage,
    MessagePort, ParentWindow, SelectionCommand, SelectionReply,
};
use crate::selection::SelectionManager;

/// Bridge between one frame document and the host
pub struct FrameBridge<D: ContentDocument> {
    document: D,
    side: FrameSide,
    cycle: u64,
    decorations: DecorationEngine,
    selection: SelectionManager,
    area: Option<MessagePort>,
    selection_port: Option<MessagePort>,
    decoration_port: Option<MessagePort>,
}

impl<D: ContentDocument> FrameBridge<D> {
    /// `cycle` is the load-cycle token the host handed out with the URL
    pub fn new(document: D, side: FrameSide, cycle: u64, config: &BridgeConfig) -> Self {
        Self {
            document,
            side,
            cycle,
            decorations: DecorationEngine::new(config),
            selection: SelectionManager::new(config),
            area: None,
            selection_port: None,
            decoration_port: None,
        }
    }

    /// Open every channel to the host, then report the content size
    ///
    /// Reflowable documents have no declared size and report their viewport.
    pub fn initialize(&mut self, parent: &ParentWindow) -> Result<(), ProtocolError> {
        for channel in ChannelName::ALL {
            let (local, remote) = message_channel();
            parent.post(
                &HandshakeMessage::OpenChannel {
                    channel,
                    cycle: self.cycle,
                },
                Some(remote),
            )?;
            match channel {
                ChannelName::Area => self.area = Some(local),
                ChannelName::Selection => self.selection_port = Some(local),
                ChannelName::Decorations => self.decoration_port = Some(local),
            }
        }
        debug!(side = %self.side, cycle = self.cycle, "Opened frame channels");

        let size = self
            .document
            .natural_size()
            .unwrap_or_else(|| self.document.viewport_size());
        self.post_area(&AreaEvent::ContentSize { size })
    }

    /// Execute every queued host command; returns how many were handled
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;

        let commands = match self.decoration_port.as_mut() {
            Some(port) => port.drain::<DecorationCommand>(),
            None => Vec::new(),
        };
        for command in commands {
            match command {
                Ok(command) => {
                    self.handle_decoration_command(command);
                    handled += 1;
                }
                Err(e) => warn!(side = %self.side, "Dropping decoration message: {}", e),
            }
        }

        let commands = match self.selection_port.as_mut() {
            Some(port) => port.drain::<SelectionCommand>(),
            None => Vec::new(),
        };
        for command in commands {
            match command {
                Ok(command) => {
                    if let Err(e) = self.handle_selection_command(command) {
                        warn!(side = %self.side, "Failed to answer selection command: {}", e);
                    }
                    handled += 1;
                }
                Err(e) => warn!(side = %self.side, "Dropping selection message: {}", e),
            }
        }

        handled
    }

    /// Route a tap at a client point
    ///
    /// A decoration under the point wins over a link, and a link wins over a
    /// plain tap.
    pub fn handle_tap(&mut self, point: Point) -> Result<(), ProtocolError> {
        let event = if let Some(hit) = self
            .decorations
            .handle_decoration_click_event(&self.document, point)
        {
            AreaEvent::DecorationActivated {
                id: hit.id,
                group: hit.group,
                rect: hit.bounding_rect,
                point,
            }
        } else if let Some(link) = self.document.link_at(point) {
            AreaEvent::LinkActivated {
                href: link.href,
                outer_html: link.outer_html,
                point,
            }
        } else {
            AreaEvent::Tap { point }
        };

        self.post_area(&event)
    }

    /// The document was resized; decorations relayout on the next frame
    pub fn notify_resize(&mut self) {
        self.decorations.notify_resize();
    }

    /// Animation-frame tick; returns whether decorations were relaid out
    pub fn on_animation_frame(&mut self) -> bool {
        self.decorations.on_animation_frame(&mut self.document)
    }

    pub fn side(&self) -> FrameSide {
        self.side
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn decorations(&self) -> &DecorationEngine {
        &self.decorations
    }

    fn handle_decoration_command(&mut self, command: DecorationCommand) {
        match command {
            DecorationCommand::RegisterTemplates { templates } => {
                self.decorations
                    .register_templates(&mut self.document, templates);
            }
            DecorationCommand::AddDecoration { decoration, group } => {
                let id = decoration.id.clone();
                if let Err(e) = self
                    .decorations
                    .add_decoration(&mut self.document, decoration, &group)
                {
                    warn!(side = %self.side, group = %group, id = %id, "Skipping decoration: {}", e);
                }
            }
            DecorationCommand::RemoveDecoration { id, group } => {
                if !self
                    .decorations
                    .remove_decoration(&mut self.document, &id, &group)
                {
                    debug!(group = %group, id = %id, "Decoration to remove not found");
                }
            }
        }
    }

    fn handle_selection_command(&mut self, command: SelectionCommand) -> Result<(), ProtocolError> {
        match command {
            SelectionCommand::RequestSelection { request_id } => {
                let selection = self.selection.current_selection(&self.document);
                let port = self.port(ChannelName::Selection)?;
                port.post(&SelectionReply::SelectionAvailable {
                    request_id,
                    selection,
                })
            }
            SelectionCommand::ClearSelection => {
                self.selection.clear(&mut self.document);
                Ok(())
            }
        }
    }

    fn post_area(&self, event: &AreaEvent) -> Result<(), ProtocolError> {
        self.port(ChannelName::Area)?.post(event)
    }

    fn port(&self, channel: ChannelName) -> Result<&MessagePort, ProtocolError> {
        let port = match channel {
            ChannelName::Area => self.area.as_ref(),
            ChannelName::Selection => self.selection_port.as_ref(),
            ChannelName::Decorations => self.decoration_port.as_ref(),
        };
        port.ok_or(ProtocolError::Unavailable {
            channel,
            side: self.side,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::{Decoration, DecorationTemplate, TemplateLayout, TemplateWidth, TextQuote};
    use crate::dom::{MemoryDocument, TextRange};
    use crate::geometry::{Rect, Size};
    use crate::protocol::{decode, HostInbox};
    use std::collections::BTreeMap;

    struct Harness {
        frame: FrameBridge<MemoryDocument>,
        area: MessagePort,
        selection: MessagePort,
        decorations: MessagePort,
    }

    fn harness(doc: MemoryDocument) -> Harness {
        let mut inbox = HostInbox::new();
        let mut frame = FrameBridge::new(doc, FrameSide::Single, 7, &BridgeConfig::default());
        frame.initialize(&inbox.parent_for(FrameSide::Single)).unwrap();

        let mut ports = BTreeMap::new();
        while let Some(envelope) = inbox.try_recv() {
            let HandshakeMessage::OpenChannel { channel, cycle } =
                decode::<HandshakeMessage>(envelope.message).unwrap();
            assert_eq!(cycle, 7);
            ports.insert(channel, envelope.port.unwrap());
        }

        Harness {
            frame,
            area: ports.remove(&ChannelName::Area).unwrap(),
            selection: ports.remove(&ChannelName::Selection).unwrap(),
            decorations: ports.remove(&ChannelName::Decorations).unwrap(),
        }
    }

    fn document() -> MemoryDocument {
        let mut doc = MemoryDocument::new(Size::new(400.0, 300.0));
        let range = doc.push_block(Some("#p1"), "Read the next chapter now");
        doc.add_link(TextRange::new(range.start + 9, range.start + 21), "chapter2.xhtml");
        doc
    }

    fn next_area_event(port: &mut MessagePort) -> AreaEvent {
        decode(port.try_recv().unwrap()).unwrap()
    }

    #[test]
    fn test_initialize_opens_channels_and_reports_size() {
        let mut h = harness(document().with_natural_size(Size::new(600.0, 800.0)));

        assert_eq!(
            next_area_event(&mut h.area),
            AreaEvent::ContentSize {
                size: Size::new(600.0, 800.0)
            }
        );
    }

    #[test]
    fn test_reflowable_reports_viewport() {
        let mut h = harness(document());
        assert_eq!(
            next_area_event(&mut h.area),
            AreaEvent::ContentSize {
                size: Size::new(400.0, 300.0)
            }
        );
    }

    #[test]
    fn test_tap_routing() {
        let mut h = harness(document());
        h.area.try_recv();

        h.frame.handle_tap(Point::new(395.0, 100.0)).unwrap();
        assert_eq!(
            next_area_event(&mut h.area),
            AreaEvent::Tap {
                point: Point::new(395.0, 100.0)
            }
        );

        h.frame.handle_tap(Point::new(100.0, 10.0)).unwrap();
        assert!(matches!(
            next_area_event(&mut h.area),
            AreaEvent::LinkActivated { href, .. } if href == "chapter2.xhtml"
        ));

        let template = DecorationTemplate::new(TemplateLayout::Bounds, TemplateWidth::Wrap);
        h.decorations
            .post(&DecorationCommand::RegisterTemplates {
                templates: BTreeMap::from([("highlight".to_string(), template)]),
            })
            .unwrap();
        h.decorations
            .post(&DecorationCommand::AddDecoration {
                decoration: Decoration::new("h1", "highlight", "<div></div>")
                    .with_quote(TextQuote::new("next chapter")),
                group: "user".into(),
            })
            .unwrap();
        assert_eq!(h.frame.poll(), 2);

        h.frame.handle_tap(Point::new(100.0, 10.0)).unwrap();
        assert_eq!(
            next_area_event(&mut h.area),
            AreaEvent::DecorationActivated {
                id: "h1".into(),
                group: "user".into(),
                rect: Rect::new(90.0, 0.0, 120.0, 20.0),
                point: Point::new(100.0, 10.0),
            }
        );
    }

    #[test]
    fn test_bad_decoration_does_not_stop_the_batch() {
        let mut h = harness(document());
        let template = DecorationTemplate::new(TemplateLayout::Boxes, TemplateWidth::Wrap);

        h.decorations
            .post(&DecorationCommand::RegisterTemplates {
                templates: BTreeMap::from([("highlight".to_string(), template)]),
            })
            .unwrap();
        h.decorations
            .post(&DecorationCommand::AddDecoration {
                decoration: Decoration::new("bad", "highlight", "<div></div>")
                    .with_quote(TextQuote::new("not in the text")),
                group: "user".into(),
            })
            .unwrap();
        h.decorations.post(&serde_json::json!({"kind": "bogus"})).unwrap();
        h.decorations
            .post(&DecorationCommand::AddDecoration {
                decoration: Decoration::new("good", "highlight", "<div></div>")
                    .with_quote(TextQuote::new("Read")),
                group: "user".into(),
            })
            .unwrap();

        h.frame.poll();

        assert!(h.frame.decorations().item("user", "bad").is_none());
        assert!(h.frame.decorations().item("user", "good").is_some());
        assert_eq!(h.frame.document().group_items("user"), vec!["good"]);
    }

    #[test]
    fn test_selection_request_and_clear() {
        let mut h = harness(document());
        h.frame.document_mut().set_selection(Some(TextRange::new(9, 13)));

        h.selection
            .post(&SelectionCommand::RequestSelection {
                request_id: "r1".into(),
            })
            .unwrap();
        h.frame.poll();

        let SelectionReply::SelectionAvailable {
            request_id,
            selection,
        } = decode::<SelectionReply>(h.selection.try_recv().unwrap()).unwrap();
        assert_eq!(request_id, "r1");
        assert_eq!(selection.unwrap().selected_text, "next");

        h.selection.post(&SelectionCommand::ClearSelection).unwrap();
        h.frame.poll();
        assert!(h.frame.document().selection().is_none());
    }
}
