//! Area manager
//!
//! Owns the page slots of the host (one for a single page, two for a
//! spread), the channel bridges bound to the frames loaded into them, and
//! the fit computation that turns natural page sizes into a zoom directive.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::decoration::{
    diff_decorations, unique_by_id, Decoration, DecorationChange, DecorationTemplate,
};
use crate::error::ProtocolError;
use crate::geometry::{
    point_to_host_space, rect_to_host_space, Insets, Point, Rect, Size, ViewportTransform,
};
use crate::protocol::{
    decode, AreaEvent, ChannelName, FrameSide, HandshakeMessage, HandshakeOutcome, HostInbox,
    ReadinessTracker,
};

use super::bridges::{AreaBridge, ChannelBridge, DecorationBridge, SelectionBridge};
use super::fit::{compute_scale, Fit, ViewportDirective};
use super::listener::{HostEnvironment, NavigatorEvent, NavigatorListener};

/// Lifecycle of the area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaState {
    /// Nothing loaded yet
    Uninitialized,
    /// Waiting for every loaded side to report its size
    AwaitingContent,
    /// Laid out at least once for the current load
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Single,
    Spread,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    url: Option<String>,
    natural_size: Option<Size>,
    frame_rect: Rect,
}

impl Slot {
    fn is_loaded(&self) -> bool {
        self.url.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewportState {
    size: Size,
    insets: Insets,
}

/// Host side of the navigator
pub struct AreaManager<E: HostEnvironment> {
    env: E,
    state: AreaState,
    mode: LayoutMode,
    slots: BTreeMap<FrameSide, Slot>,
    viewport: Option<ViewportState>,
    fit: Fit,
    visual_viewport: ViewportTransform,
    directive: Option<ViewportDirective>,
    inbox: HostInbox,
    readiness: ReadinessTracker,
    area: AreaBridge,
    selection: SelectionBridge,
    decorations: DecorationBridge,
    applied: HashMap<(FrameSide, String), Vec<Decoration>>,
    events: Vec<NavigatorEvent>,
}

impl<E: HostEnvironment> AreaManager<E> {
    pub fn new(env: E, config: &BridgeConfig) -> Self {
        Self {
            env,
            state: AreaState::Uninitialized,
            mode: LayoutMode::Single,
            slots: BTreeMap::new(),
            viewport: None,
            fit: config.default_fit,
            visual_viewport: ViewportTransform::default(),
            directive: None,
            inbox: HostInbox::new(),
            readiness: ReadinessTracker::new(),
            area: AreaBridge::default(),
            selection: SelectionBridge::default(),
            decorations: DecorationBridge::default(),
            applied: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Load one page into a single slot
    pub fn load_resource(&mut self, url: &str) -> u64 {
        self.begin_cycle(LayoutMode::Single, vec![(FrameSide::Single, Some(url))])
    }

    /// Load a two-page spread; either side may be absent
    pub fn load_spread(&mut self, left: Option<&str>, right: Option<&str>) -> u64 {
        self.begin_cycle(
            LayoutMode::Spread,
            vec![(FrameSide::Left, left), (FrameSide::Right, right)],
        )
    }

    /// Set the available viewport; relayouts unless unchanged
    pub fn set_viewport(&mut self, size: Size, insets: Insets) {
        let viewport = Some(ViewportState { size, insets });
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        self.layout();
    }

    /// Change the fit policy; relayouts unless unchanged
    pub fn set_fit(&mut self, fit: Fit) {
        if self.fit == fit {
            return;
        }
        self.fit = fit;
        self.layout();
    }

    /// Record the host's current pinch-zoom scale and scroll offset
    pub fn set_visual_viewport(&mut self, transform: ViewportTransform) {
        self.visual_viewport = transform;
    }

    /// Process everything the frames sent and deliver the resulting events
    ///
    /// Handshakes are handled first so that a port bound in this pass is
    /// drained in the same pass.
    pub fn poll<L: NavigatorListener + ?Sized>(&mut self, listener: &mut L) {
        self.process_handshakes();

        for (side, event) in self.area.drain() {
            self.handle_area_event(side, event);
        }

        for (side, request_id, selection) in self.selection.drain() {
            let selection = selection.map(|mut selection| {
                selection.selection_rect = self.rect_to_host(side, &selection.selection_rect);
                selection
            });
            self.events.push(NavigatorEvent::SelectionAvailable {
                side,
                request_id,
                selection,
            });
        }

        for event in std::mem::take(&mut self.events) {
            event.dispatch(listener);
        }
    }

    /// Ask the frame on `side` for its selection; the reply arrives through
    /// [`NavigatorListener::on_selection_available`] with the returned id
    pub fn request_selection(&mut self, side: FrameSide) -> Result<String, ProtocolError> {
        self.selection.request(side)
    }

    pub fn clear_selection(&mut self, side: FrameSide) -> Result<(), ProtocolError> {
        self.selection.clear(side)
    }

    /// Register decoration styles with every current and future frame
    pub fn register_decoration_templates(&mut self, templates: BTreeMap<String, DecorationTemplate>) {
        self.decorations.register_templates(templates);
    }

    /// Replace the decorations of `group` on `side`, sending only the changes
    ///
    /// When the channel is unavailable nothing is recorded, so the next call
    /// diffs against what the frame actually has. Repeated ids keep their
    /// last occurrence.
    pub fn apply_decorations(
        &mut self,
        side: FrameSide,
        group: &str,
        decorations: Vec<Decoration>,
    ) -> Result<Vec<DecorationChange>, ProtocolError> {
        let decorations = unique_by_id(&decorations);
        let key = (side, group.to_string());
        let previous = self.applied.get(&key).map(Vec::as_slice).unwrap_or_default();
        let changes = diff_decorations(previous, &decorations);

        self.decorations.apply_changes(side, group, &changes)?;
        self.applied.insert(key, decorations);
        Ok(changes)
    }

    pub fn state(&self) -> AreaState {
        self.state
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn fit(&self) -> Fit {
        self.fit
    }

    pub fn cycle(&self) -> u64 {
        self.readiness.cycle()
    }

    /// Last zoom directive written to the host
    pub fn directive(&self) -> Option<&ViewportDirective> {
        self.directive.as_ref()
    }

    /// Slot rect of `side` in host CSS px
    pub fn frame_rect(&self, side: FrameSide) -> Option<Rect> {
        self.slots.get(&side).map(|slot| slot.frame_rect)
    }

    pub fn visual_viewport(&self) -> ViewportTransform {
        self.visual_viewport
    }

    pub fn is_channel_available(&self, channel: ChannelName) -> bool {
        self.readiness.is_available(channel)
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn begin_cycle(&mut self, mode: LayoutMode, slots: Vec<(FrameSide, Option<&str>)>) -> u64 {
        let loaded: Vec<FrameSide> = slots
            .iter()
            .filter(|(_, url)| url.is_some())
            .map(|(side, _)| *side)
            .collect();
        let cycle = self.readiness.reset(loaded.iter().copied());

        self.area.reset();
        self.selection.reset();
        self.decorations.reset();
        self.applied.clear();

        self.mode = mode;
        self.state = AreaState::AwaitingContent;
        self.slots = slots
            .iter()
            .map(|(side, url)| {
                let slot = Slot {
                    url: url.map(str::to_string),
                    ..Slot::default()
                };
                (*side, slot)
            })
            .collect();

        info!(cycle, ?mode, sides = loaded.len(), "Loading resources");

        for (side, url) in slots {
            self.env.place_slot(side, Rect::default(), false);
            if let Some(url) = url {
                let parent = self.inbox.parent_for(side);
                self.env.load_url(side, url, cycle, parent);
            }
        }

        cycle
    }

    fn process_handshakes(&mut self) {
        while let Some(envelope) = self.inbox.try_recv() {
            let message = match decode::<HandshakeMessage>(envelope.message) {
                Ok(message) => message,
                Err(e) => {
                    warn!(side = %envelope.side, "Ignoring malformed handshake: {}", e);
                    continue;
                }
            };
            let HandshakeMessage::OpenChannel { channel, cycle } = message;

            let Some(port) = envelope.port else {
                warn!(side = %envelope.side, %channel, "Handshake without an endpoint");
                continue;
            };

            let outcome = self.readiness.record(cycle, envelope.side, channel);
            if !outcome.accepted() {
                debug!(side = %envelope.side, %channel, cycle, ?outcome, "Ignoring handshake");
                continue;
            }

            let bridge: &mut dyn ChannelBridge = match channel {
                ChannelName::Area => &mut self.area,
                ChannelName::Selection => &mut self.selection,
                ChannelName::Decorations => &mut self.decorations,
            };
            bridge.bind(envelope.side, port);

            if outcome == HandshakeOutcome::Available {
                bridge.set_available(true);
                info!(%channel, cycle, "Channel available");
                self.events.push(NavigatorEvent::ChannelAvailable { channel });
            }
        }
    }

    fn handle_area_event(&mut self, side: FrameSide, event: AreaEvent) {
        match event {
            AreaEvent::ContentSize { size } => {
                match self.slots.get_mut(&side) {
                    Some(slot) if slot.is_loaded() => slot.natural_size = Some(size),
                    _ => {
                        warn!(side = %side, "Content size from a side that is not loaded");
                        return;
                    }
                }
                debug!(side = %side, width = size.width, height = size.height, "Content size reported");
                self.layout();
            }
            AreaEvent::Tap { point } => {
                let point = self.point_to_host(side, point);
                self.events.push(NavigatorEvent::Tap { side, point });
            }
            AreaEvent::LinkActivated {
                href,
                outer_html,
                point,
            } => {
                let point = self.point_to_host(side, point);
                self.events.push(NavigatorEvent::LinkActivated {
                    side,
                    href,
                    outer_html,
                    point,
                });
            }
            AreaEvent::DecorationActivated {
                id,
                group,
                rect,
                point,
            } => {
                let rect = self.rect_to_host(side, &rect);
                let point = self.point_to_host(side, point);
                self.events.push(NavigatorEvent::DecorationActivated {
                    side,
                    id,
                    group,
                    rect,
                    point,
                });
            }
        }
    }

    /// Fit the loaded pages into the viewport
    ///
    /// Does nothing until a viewport is set and every loaded side has
    /// reported its size. Returns whether a layout happened.
    fn layout(&mut self) -> bool {
        if self.state == AreaState::Uninitialized {
            return false;
        }
        let Some(viewport) = self.viewport else {
            return false;
        };

        let loaded: Vec<&Slot> = self.slots.values().filter(|slot| slot.is_loaded()).collect();
        if loaded.is_empty() || loaded.iter().any(|slot| slot.natural_size.is_none()) {
            return false;
        }

        let sizes: Vec<(FrameSide, Size)> = match self.mode {
            LayoutMode::Single => self
                .slots
                .iter()
                .filter_map(|(side, slot)| slot.natural_size.map(|size| (*side, size)))
                .collect(),
            LayoutMode::Spread => {
                let left = self.natural_size(FrameSide::Left);
                let right = self.natural_size(FrameSide::Right);
                match (left.or(right), right.or(left)) {
                    (Some(left), Some(right)) => vec![(FrameSide::Left, left), (FrameSide::Right, right)],
                    _ => return false,
                }
            }
        };

        let content = Size::new(
            sizes.iter().map(|(_, size)| size.width).sum(),
            sizes.iter().map(|(_, size)| size.height).fold(0.0, f64::max),
        );
        let available = viewport.insets.inset(viewport.size);
        let scale = compute_scale(self.fit, content, available);
        let directive = ViewportDirective::new(content, scale);

        self.env.write_viewport(&directive);

        let mut x = 0.0;
        for (side, size) in sizes {
            let rect = Rect::new(x, 0.0, size.width, size.height);
            x += size.width;
            if let Some(slot) = self.slots.get_mut(&side) {
                slot.frame_rect = rect;
                self.env.place_slot(side, rect, slot.is_loaded());
            }
        }

        info!(
            scale,
            width = content.width,
            height = content.height,
            fit = ?self.fit,
            "Layout complete"
        );

        self.directive = Some(directive);
        self.visual_viewport = ViewportTransform::new(scale, Point::default());
        self.state = AreaState::Ready;
        self.events.push(NavigatorEvent::LayoutComplete);
        true
    }

    fn natural_size(&self, side: FrameSide) -> Option<Size> {
        self.slots.get(&side).and_then(|slot| slot.natural_size)
    }

    fn point_to_host(&self, side: FrameSide, point: Point) -> Point {
        let frame_rect = self.frame_rect(side).unwrap_or_default();
        point_to_host_space(point, &frame_rect, &self.visual_viewport)
    }

    fn rect_to_host(&self, side: FrameSide, rect: &Rect) -> Rect {
        let frame_rect = self.frame_rect(side).unwrap_or_default();
        rect_to_host_space(rect, &frame_rect, &self.visual_viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{message_channel, MessagePort, ParentWindow};

    /// Keeps the parent window handed to every load
    #[derive(Default)]
    struct Host {
        loads: Vec<(FrameSide, u64, ParentWindow)>,
    }

    impl HostEnvironment for Host {
        fn load_url(&mut self, side: FrameSide, _url: &str, cycle: u64, parent: ParentWindow) {
            self.loads.push((side, cycle, parent));
        }

        fn write_viewport(&mut self, _directive: &ViewportDirective) {}

        fn place_slot(&mut self, _side: FrameSide, _rect: Rect, _visible: bool) {}
    }

    /// Open every channel as a frame would; returns the frame ends by channel
    fn open_channels(parent: &ParentWindow, cycle: u64) -> BTreeMap<ChannelName, MessagePort> {
        ChannelName::ALL
            .iter()
            .map(|&channel| {
                let (local, remote) = message_channel();
                parent
                    .post(&HandshakeMessage::OpenChannel { channel, cycle }, Some(remote))
                    .unwrap();
                (channel, local)
            })
            .collect()
    }

    fn tap(ports: &BTreeMap<ChannelName, MessagePort>, x: f64) {
        ports[&ChannelName::Area]
            .post(&AreaEvent::Tap { point: Point::new(x, 0.0) })
            .unwrap();
    }

    #[test]
    fn test_handshake_from_superseded_load_is_ignored() {
        let mut manager = AreaManager::new(Host::default(), &BridgeConfig::default());
        let first = manager.load_resource("a.xhtml");
        let second = manager.load_resource("b.xhtml");
        assert_eq!(second, first + 1);

        let (_, _, old_parent) = &manager.environment().loads[0];
        let old_ports = open_channels(old_parent, first);
        tap(&old_ports, 1.0);

        let mut events: Vec<NavigatorEvent> = Vec::new();
        manager.poll(&mut events);

        assert!(events.is_empty());
        for channel in ChannelName::ALL {
            assert!(!manager.is_channel_available(channel));
        }

        let (_, _, parent) = &manager.environment().loads[1];
        let ports = open_channels(parent, second);
        tap(&ports, 2.0);
        manager.poll(&mut events);

        let taps: Vec<&NavigatorEvent> = events
            .iter()
            .filter(|e| matches!(e, NavigatorEvent::Tap { .. }))
            .collect();
        assert_eq!(
            taps,
            vec![&NavigatorEvent::Tap {
                side: FrameSide::Single,
                point: Point::new(2.0, 0.0),
            }]
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, NavigatorEvent::ChannelAvailable { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn test_apply_decorations_with_repeated_ids() {
        let mut manager = AreaManager::new(Host::default(), &BridgeConfig::default());
        let cycle = manager.load_resource("a.xhtml");
        let (_, _, parent) = &manager.environment().loads[0];
        let _ports = open_channels(parent, cycle);
        manager.poll(&mut Vec::<NavigatorEvent>::new());

        let first = Decoration::new("a", "highlight", "<div></div>");
        let last = Decoration::new("a", "underline", "<div></div>");
        let changes = manager
            .apply_decorations(FrameSide::Single, "user", vec![first, last.clone()])
            .unwrap();

        assert_eq!(changes, vec![DecorationChange::Added { decoration: last.clone(), index: 0 }]);
        assert!(manager
            .apply_decorations(FrameSide::Single, "user", vec![last])
            .unwrap()
            .is_empty());
    }
}
