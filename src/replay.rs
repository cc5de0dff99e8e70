//! Scenario replay
//!
//! Runs a host and its frames in one process from a JSON scenario: each page
//! is a [`MemoryDocument`], each loaded page gets a [`FrameBridge`], and the
//! host is a regular [`AreaManager`]. Every event the host reports is
//! collected in order.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::decoration::{Decoration, DecorationTemplate};
use crate::dom::{ContentDocument, MemoryDocument, TextRange, WritingMode};
use crate::error::{BridgeError, Result};
use crate::frame::FrameBridge;
use crate::geometry::{Insets, Point, Rect, Size, ViewportTransform};
use crate::host::{AreaManager, Fit, HostEnvironment, NavigatorEvent, ViewportDirective};
use crate::protocol::{FrameSide, ParentWindow};

/// Upper bound on host/frame round trips while settling one step
const MAX_ROUNDS: usize = 16;

/// A replayable session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Overrides the environment configuration when present
    #[serde(default)]
    pub config: Option<BridgeConfig>,
    pub viewport: Size,
    #[serde(default)]
    pub insets: Insets,
    #[serde(default)]
    pub fit: Option<Fit>,
    /// Page documents by URL
    pub pages: HashMap<String, PageSpec>,
    pub steps: Vec<Step>,
}

/// Content of one page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpec {
    pub viewport: Size,
    #[serde(default)]
    pub natural_size: Option<Size>,
    #[serde(default)]
    pub writing_mode: WritingMode,
    #[serde(default)]
    pub zoom: Option<f64>,
    #[serde(default)]
    pub column_count: Option<u32>,
    pub blocks: Vec<BlockSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSpec {
    #[serde(default)]
    pub selector: Option<String>,
    pub text: String,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

/// A hyperlink over the first occurrence of `text` in its block
#[derive(Debug, Clone, Deserialize)]
pub struct LinkSpec {
    pub text: String,
    pub href: String,
}

/// One scripted action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Step {
    LoadResource {
        url: String,
    },
    #[serde(rename_all = "camelCase")]
    LoadSpread {
        #[serde(default)]
        left: Option<String>,
        #[serde(default)]
        right: Option<String>,
        /// Order in which the frames finish loading; defaults to left, right
        #[serde(default)]
        load_order: Option<Vec<FrameSide>>,
    },
    SetViewport {
        size: Size,
        #[serde(default)]
        insets: Insets,
    },
    SetFit {
        fit: Fit,
    },
    SetVisualViewport {
        scale: f64,
        #[serde(default)]
        offset: Point,
    },
    RegisterTemplates {
        templates: BTreeMap<String, DecorationTemplate>,
    },
    ApplyDecorations {
        side: FrameSide,
        group: String,
        decorations: Vec<Decoration>,
    },
    /// Tap at a frame-local client point
    Tap {
        side: FrameSide,
        point: Point,
    },
    /// Select the first occurrence of `text` in the frame
    Select {
        side: FrameSide,
        text: String,
    },
    RequestSelection {
        side: FrameSide,
    },
    ClearSelection {
        side: FrameSide,
    },
    /// Resize the frame's own viewport
    Resize {
        side: FrameSide,
        viewport: Size,
    },
}

impl PageSpec {
    pub fn build(&self) -> MemoryDocument {
        let mut doc = MemoryDocument::new(self.viewport).with_writing_mode(self.writing_mode);
        if let Some(size) = self.natural_size {
            doc = doc.with_natural_size(size);
        }
        if let Some(zoom) = self.zoom {
            doc = doc.with_zoom(zoom);
        }
        if let Some(count) = self.column_count {
            doc = doc.with_column_count(count);
        }

        for block in &self.blocks {
            let range = doc.push_block(block.selector.as_deref(), &block.text);
            for link in &block.links {
                match block.text.find(&link.text) {
                    Some(offset) => {
                        let start = range.start + offset;
                        doc.add_link(TextRange::new(start, start + link.text.len()), &link.href);
                    }
                    None => warn!(href = %link.href, "Link text {:?} not found in block", link.text),
                }
            }
        }

        doc
    }
}

/// Read and parse a scenario file
pub async fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

struct PendingLoad {
    side: FrameSide,
    url: String,
    cycle: u64,
    parent: ParentWindow,
}

/// In-process host page: frames are created from the scenario's pages
pub struct ReplayEnvironment {
    config: BridgeConfig,
    pages: HashMap<String, PageSpec>,
    pending: Vec<PendingLoad>,
    frames: BTreeMap<FrameSide, FrameBridge<MemoryDocument>>,
    directives: Vec<ViewportDirective>,
    placements: Vec<(FrameSide, Rect, bool)>,
}

impl ReplayEnvironment {
    pub fn new(config: BridgeConfig, pages: HashMap<String, PageSpec>) -> Self {
        Self {
            config,
            pages,
            pending: Vec::new(),
            frames: BTreeMap::new(),
            directives: Vec::new(),
            placements: Vec::new(),
        }
    }

    /// Finish loading the page requested for `side`
    ///
    /// Returns false when nothing was pending or the page is unknown; an
    /// unknown page never completes its handshakes.
    pub fn complete_load(&mut self, side: FrameSide) -> bool {
        let Some(index) = self.pending.iter().position(|load| load.side == side) else {
            return false;
        };
        let load = self.pending.remove(index);

        let Some(page) = self.pages.get(&load.url) else {
            warn!(side = %side, url = %load.url, "No such page in scenario");
            return false;
        };

        let mut frame = FrameBridge::new(page.build(), load.side, load.cycle, &self.config);
        if let Err(e) = frame.initialize(&load.parent) {
            warn!(side = %side, "Frame failed to initialize: {}", e);
            return false;
        }
        debug!(side = %side, url = %load.url, cycle = load.cycle, "Frame loaded");
        self.frames.insert(side, frame);
        true
    }

    /// Finish every pending load, in request order
    pub fn complete_all(&mut self) {
        let sides: Vec<FrameSide> = self.pending.iter().map(|load| load.side).collect();
        for side in sides {
            self.complete_load(side);
        }
    }

    /// Let every frame handle its queued commands and run an animation frame
    pub fn pump_frames(&mut self) -> usize {
        let mut handled = 0;
        for frame in self.frames.values_mut() {
            handled += frame.poll();
            frame.on_animation_frame();
        }
        handled
    }

    pub fn frame(&self, side: FrameSide) -> Option<&FrameBridge<MemoryDocument>> {
        self.frames.get(&side)
    }

    pub fn frame_mut(&mut self, side: FrameSide) -> Option<&mut FrameBridge<MemoryDocument>> {
        self.frames.get_mut(&side)
    }

    pub fn directives(&self) -> &[ViewportDirective] {
        &self.directives
    }

    /// Every slot placement, in order
    pub fn placements(&self) -> &[(FrameSide, Rect, bool)] {
        &self.placements
    }
}

impl HostEnvironment for ReplayEnvironment {
    fn load_url(&mut self, side: FrameSide, url: &str, cycle: u64, parent: ParentWindow) {
        self.frames.remove(&side);
        self.pending.retain(|load| load.side != side);
        self.pending.push(PendingLoad {
            side,
            url: url.to_string(),
            cycle,
            parent,
        });
    }

    fn write_viewport(&mut self, directive: &ViewportDirective) {
        debug!(meta = %directive.to_meta_content(), "Viewport directive");
        self.directives.push(*directive);
    }

    fn place_slot(&mut self, side: FrameSide, rect: Rect, visible: bool) {
        self.placements.push((side, rect, visible));
    }
}

/// Drives one scenario
pub struct Replay {
    area: AreaManager<ReplayEnvironment>,
    events: Vec<NavigatorEvent>,
}

impl Replay {
    pub fn new(scenario: &Scenario, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let env = ReplayEnvironment::new(config.clone(), scenario.pages.clone());
        let mut area = AreaManager::new(env, &config);

        if let Some(fit) = scenario.fit {
            area.set_fit(fit);
        }
        area.set_viewport(scenario.viewport, scenario.insets);

        Ok(Self {
            area,
            events: Vec::new(),
        })
    }

    /// Run every step of `scenario` and return the reported events
    pub fn run(scenario: Scenario, config: BridgeConfig) -> Result<Vec<NavigatorEvent>> {
        let mut replay = Replay::new(&scenario, config)?;
        for step in scenario.steps {
            replay.step(step)?;
        }
        Ok(replay.events)
    }

    /// Apply one step and let host and frames settle
    ///
    /// Commands rejected because a channel is not available yet are logged
    /// and dropped, as a live host would.
    pub fn step(&mut self, step: Step) -> Result<()> {
        match step {
            Step::LoadResource { url } => {
                self.area.load_resource(&url);
                self.area.environment_mut().complete_all();
            }
            Step::LoadSpread {
                left,
                right,
                load_order,
            } => {
                self.area.load_spread(left.as_deref(), right.as_deref());
                let order = load_order.unwrap_or_else(|| vec![FrameSide::Left, FrameSide::Right]);
                for side in order {
                    self.area.environment_mut().complete_load(side);
                    self.settle();
                }
            }
            Step::SetViewport { size, insets } => self.area.set_viewport(size, insets),
            Step::SetFit { fit } => self.area.set_fit(fit),
            Step::SetVisualViewport { scale, offset } => {
                self.area
                    .set_visual_viewport(ViewportTransform::new(scale, offset));
            }
            Step::RegisterTemplates { templates } => self.area.register_decoration_templates(templates),
            Step::ApplyDecorations {
                side,
                group,
                decorations,
            } => {
                if let Err(e) = self.area.apply_decorations(side, &group, decorations) {
                    warn!(side = %side, group = %group, "Decorations not applied: {}", e);
                }
            }
            Step::Tap { side, point } => {
                if let Err(e) = self.frame_mut(side)?.handle_tap(point) {
                    warn!(side = %side, "Tap not delivered: {}", e);
                }
            }
            Step::Select { side, text } => {
                let frame = self.frame_mut(side)?;
                let document = frame.document_mut();
                let start = document.text().find(&text).ok_or_else(|| {
                    BridgeError::Scenario(format!("{:?} not found on side {}", text, side))
                })?;
                document.set_selection(Some(TextRange::new(start, start + text.len())));
            }
            Step::RequestSelection { side } => {
                if let Err(e) = self.area.request_selection(side) {
                    warn!(side = %side, "Selection not requested: {}", e);
                }
            }
            Step::ClearSelection { side } => {
                if let Err(e) = self.area.clear_selection(side) {
                    warn!(side = %side, "Selection not cleared: {}", e);
                }
            }
            Step::Resize { side, viewport } => {
                let frame = self.frame_mut(side)?;
                frame.document_mut().set_viewport(viewport);
                frame.notify_resize();
            }
        }

        self.settle();
        Ok(())
    }

    /// Exchange messages until neither side has anything left to handle
    pub fn settle(&mut self) {
        for _ in 0..MAX_ROUNDS {
            self.area.poll(&mut self.events);
            if self.area.environment_mut().pump_frames() == 0 {
                self.area.poll(&mut self.events);
                return;
            }
        }
        warn!("Host and frames did not settle after {} rounds", MAX_ROUNDS);
    }

    pub fn area(&self) -> &AreaManager<ReplayEnvironment> {
        &self.area
    }

    pub fn events(&self) -> &[NavigatorEvent] {
        &self.events
    }

    /// Hand over the events collected so far
    pub fn take_events(&mut self) -> Vec<NavigatorEvent> {
        std::mem::take(&mut self.events)
    }

    fn frame_mut(&mut self, side: FrameSide) -> Result<&mut FrameBridge<MemoryDocument>> {
        self.area
            .environment_mut()
            .frame_mut(side)
            .ok_or_else(|| BridgeError::Scenario(format!("No frame loaded on side {}", side)))
    }
}
