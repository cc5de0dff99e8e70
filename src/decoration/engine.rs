//! Frame-side decoration engine
//!
//! One engine per frame document. Holds the template table and the
//! decoration groups, lays items out into overlay elements and answers
//! hit-tests for taps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::dom::{ContentDocument, TextRange};
use crate::error::DecorationError;
use crate::geometry::{bounding_rect, Point, Rect, Size};

use super::anchor::resolve_anchor;
use super::layout::{compute_placements, LayoutContext};
use super::markup::ElementTemplate;
use super::types::{Decoration, DecorationTemplate, TemplateRegistry};

/// A laid-out decoration
///
/// Derived state: rebuilt from `decoration` on every relayout.
#[derive(Debug, Clone)]
pub struct DecorationItem {
    pub id: String,
    pub decoration: Decoration,
    /// Range the anchor resolved to at the last layout
    pub range: Option<TextRange>,
    /// Element rects, document coordinates
    pub elements: Vec<Rect>,
    /// Hit-test rects, document coordinates
    pub clickable: Vec<Rect>,
}

#[derive(Debug)]
struct DecorationGroup {
    name: String,
    items: Vec<DecorationItem>,
}

/// Result of a successful decoration hit-test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecorationHit {
    pub id: String,
    pub group: String,
    /// Client rect of the element that was hit
    pub bounding_rect: Rect,
}

struct LaidOut {
    range: TextRange,
    elements: Vec<Rect>,
    clickable: Vec<Rect>,
    html: Vec<String>,
}

/// Decoration state of one frame document
#[derive(Debug)]
pub struct DecorationEngine {
    templates: TemplateRegistry,
    groups: Vec<DecorationGroup>,
    click_tolerance: f64,
    activation_attribute: String,
    relayout_pending: bool,
    last_body_size: Option<Size>,
}

impl DecorationEngine {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            templates: TemplateRegistry::new(),
            groups: Vec::new(),
            click_tolerance: config.click_tolerance,
            activation_attribute: config.activation_attribute.clone(),
            relayout_pending: false,
            last_body_size: None,
        }
    }

    /// Register style templates and inject their stylesheets
    pub fn register_templates<D: ContentDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        templates: BTreeMap<String, DecorationTemplate>,
    ) {
        let stylesheet = self.templates.register(templates);
        if !stylesheet.is_empty() {
            doc.inject_stylesheet(&stylesheet);
        }
        tracing::debug!(count = self.templates.len(), "Registered decoration templates");
    }

    /// Resolve, lay out and mount a decoration
    ///
    /// An existing item with the same id in `group` is replaced. On error the
    /// engine is left untouched.
    pub fn add_decoration<D: ContentDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        decoration: Decoration,
        group: &str,
    ) -> Result<(), DecorationError> {
        let laid_out = self.layout(doc, &decoration)?;

        self.remove_decoration(doc, &decoration.id, group);
        doc.mount_overlay(group, &decoration.id, laid_out.html);

        let item = DecorationItem {
            id: decoration.id.clone(),
            decoration,
            range: Some(laid_out.range),
            elements: laid_out.elements,
            clickable: laid_out.clickable,
        };
        self.group_mut(group).items.push(item);
        Ok(())
    }

    /// Remove a decoration; returns whether anything was removed
    pub fn remove_decoration<D: ContentDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        id: &str,
        group: &str,
    ) -> bool {
        let Some(group_state) = self.groups.iter_mut().find(|g| g.name == group) else {
            return false;
        };
        let before = group_state.items.len();
        group_state.items.retain(|item| item.id != id);
        let removed = group_state.items.len() != before;
        if removed {
            doc.unmount_overlay(group, id);
        }
        removed
    }

    /// Body size changed; relayout on the next animation frame
    pub fn notify_resize(&mut self) {
        self.relayout_pending = true;
    }

    /// Animation-frame tick. Returns whether a relayout ran.
    pub fn on_animation_frame<D: ContentDocument + ?Sized>(&mut self, doc: &mut D) -> bool {
        if !std::mem::take(&mut self.relayout_pending) {
            return false;
        }
        let size = doc.body_size();
        if self.last_body_size == Some(size) {
            return false;
        }
        self.last_body_size = Some(size);
        self.relayout_all(doc);
        true
    }

    /// Re-resolve and re-lay out every item from its anchor
    pub fn relayout_all<D: ContentDocument + ?Sized>(&mut self, doc: &mut D) {
        let mut groups = std::mem::take(&mut self.groups);

        for group in &mut groups {
            doc.clear_group(&group.name);
            for item in &mut group.items {
                match self.layout(doc, &item.decoration) {
                    Ok(laid_out) => {
                        doc.mount_overlay(&group.name, &item.id, laid_out.html);
                        item.range = Some(laid_out.range);
                        item.elements = laid_out.elements;
                        item.clickable = laid_out.clickable;
                    }
                    Err(e) => {
                        tracing::debug!(id = %item.id, group = %group.name, error = %e, "Decoration no longer resolves");
                        item.range = None;
                        item.elements.clear();
                        item.clickable.clear();
                    }
                }
            }
        }

        self.groups = groups;
        self.last_body_size = Some(doc.body_size());
    }

    /// Find the decoration under a client point
    ///
    /// Groups are tested in creation order, items most-recent first.
    pub fn handle_decoration_click_event<D: ContentDocument + ?Sized>(
        &self,
        doc: &D,
        point: Point,
    ) -> Option<DecorationHit> {
        let ctx = LayoutContext::from_document(doc);

        for group in &self.groups {
            for item in group.items.iter().rev() {
                for rect in &item.clickable {
                    let client = ctx.to_client(rect);
                    if client.contains(point, self.click_tolerance) {
                        return Some(DecorationHit {
                            id: item.id.clone(),
                            group: group.name.clone(),
                            bounding_rect: client,
                        });
                    }
                }
            }
        }

        None
    }

    /// Laid-out item, for inspection
    pub fn item(&self, group: &str, id: &str) -> Option<&DecorationItem> {
        self.groups
            .iter()
            .find(|g| g.name == group)
            .and_then(|g| g.items.iter().find(|item| item.id == id))
    }

    /// Group names in creation order
    pub fn groups(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    fn group_mut(&mut self, name: &str) -> &mut DecorationGroup {
        let index = match self.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.groups.push(DecorationGroup {
                    name: name.to_string(),
                    items: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    fn layout<D: ContentDocument + ?Sized>(
        &self,
        doc: &D,
        decoration: &Decoration,
    ) -> Result<LaidOut, DecorationError> {
        let template = self.templates.get(&decoration.style)?;
        let element = ElementTemplate::parse(&decoration.element, &self.activation_attribute)?;
        let range = resolve_anchor(doc, decoration)?;

        let ctx = LayoutContext::from_document(doc);
        let elements = compute_placements(template, &doc.client_rects(range), &ctx);
        if elements.is_empty() {
            return Err(DecorationError::EmptyRange(decoration.id.clone()));
        }

        let html = elements
            .iter()
            .map(|rect| element.instantiate(rect))
            .collect::<Result<Vec<_>, _>>()?;

        // without an explicit marker the whole item container is clickable
        let clickable = if element.has_activable() {
            elements.clone()
        } else {
            bounding_rect(&elements).into_iter().collect()
        };

        Ok(LaidOut {
            range,
            elements,
            clickable,
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::{TemplateLayout, TemplateWidth, TextQuote};
    use crate::dom::{MemoryDocument, WritingMode};

    fn templates() -> BTreeMap<String, DecorationTemplate> {
        let mut map = BTreeMap::new();
        map.insert(
            "highlight".to_string(),
            DecorationTemplate::new(TemplateLayout::Boxes, TemplateWidth::Wrap)
                .with_stylesheet(".hl { background: yellow; }"),
        );
        map.insert(
            "pageNumber".to_string(),
            DecorationTemplate::new(TemplateLayout::Bounds, TemplateWidth::Page),
        );
        map
    }

    fn setup() -> (DecorationEngine, MemoryDocument) {
        let mut doc = MemoryDocument::new(Size::new(400.0, 400.0));
        doc.push_block(Some("#p1"), "It was the best of times, it was the worst of times.");
        doc.push_block(Some("#p2"), "It was the age of wisdom.");
        let mut engine = DecorationEngine::new(&BridgeConfig::default());
        engine.register_templates(&mut doc, templates());
        (engine, doc)
    }

    fn highlight(id: &str, quote: &str) -> Decoration {
        Decoration::new(id, "highlight", "<div class=\"hl\"></div>").with_quote(TextQuote::new(quote))
    }

    #[test]
    fn test_register_injects_one_style_block() {
        let (_, doc) = setup();
        assert_eq!(doc.stylesheets(), [".hl { background: yellow; }".to_string()]);
    }

    #[test]
    fn test_add_then_click_returns_decoration() {
        let (mut engine, mut doc) = setup();
        engine.add_decoration(&mut doc, highlight("h1", "worst"), "highlights").unwrap();

        let item = engine.item("highlights", "h1").unwrap();
        let rect = item.elements[0];
        let hit = engine
            .handle_decoration_click_event(&doc, Point::new(rect.left + 1.0, rect.top + 1.0))
            .unwrap();

        assert_eq!(hit.id, "h1");
        assert_eq!(hit.group, "highlights");
        assert_eq!(doc.group_items("highlights"), vec!["h1"]);
    }

    #[test]
    fn test_click_tolerance_and_miss() {
        let (mut engine, mut doc) = setup();
        engine.add_decoration(&mut doc, highlight("h1", "best"), "highlights").unwrap();
        let rect = engine.item("highlights", "h1").unwrap().elements[0];

        assert!(engine
            .handle_decoration_click_event(&doc, Point::new(rect.right + 0.5, rect.top))
            .is_some());
        assert!(engine
            .handle_decoration_click_event(&doc, Point::new(rect.right + 5.0, rect.top))
            .is_none());
    }

    #[test]
    fn test_most_recent_item_wins_overlap() {
        let (mut engine, mut doc) = setup();
        engine.add_decoration(&mut doc, highlight("older", "best of times"), "highlights").unwrap();
        engine.add_decoration(&mut doc, highlight("newer", "best"), "highlights").unwrap();
        let rect = engine.item("highlights", "newer").unwrap().elements[0];

        let hit = engine
            .handle_decoration_click_event(&doc, Point::new(rect.left + 2.0, rect.top + 2.0))
            .unwrap();

        assert_eq!(hit.id, "newer");
    }

    #[test]
    fn test_groups_tested_in_creation_order() {
        let (mut engine, mut doc) = setup();
        engine.add_decoration(&mut doc, highlight("a", "best"), "first").unwrap();
        engine.add_decoration(&mut doc, highlight("b", "best"), "second").unwrap();
        let rect = engine.item("first", "a").unwrap().elements[0];

        let hit = engine
            .handle_decoration_click_event(&doc, Point::new(rect.left + 2.0, rect.top + 2.0))
            .unwrap();

        assert_eq!(hit.group, "first");
        assert_eq!(engine.groups(), vec!["first", "second"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut engine, mut doc) = setup();
        engine.add_decoration(&mut doc, highlight("h1", "age"), "highlights").unwrap();

        assert!(engine.remove_decoration(&mut doc, "h1", "highlights"));
        assert!(!engine.remove_decoration(&mut doc, "h1", "highlights"));
        assert!(!engine.remove_decoration(&mut doc, "h1", "unknown-group"));
        assert!(engine.item("highlights", "h1").is_none());
        assert!(doc.group_items("highlights").is_empty());
    }

    #[test]
    fn test_failures_leave_state_untouched() {
        let (mut engine, mut doc) = setup();

        let unknown = Decoration::new("x", "sparkle", "<div></div>").with_selector("#p1");
        assert_eq!(
            engine.add_decoration(&mut doc, unknown, "g").unwrap_err(),
            DecorationError::UnknownStyle("sparkle".into())
        );

        let malformed = Decoration::new("y", "highlight", "no element here").with_selector("#p1");
        assert!(matches!(
            engine.add_decoration(&mut doc, malformed, "g").unwrap_err(),
            DecorationError::MalformedMarkup(_)
        ));

        assert!(matches!(
            engine.add_decoration(&mut doc, highlight("z", "nowhere"), "g").unwrap_err(),
            DecorationError::QuoteNotFound(_)
        ));

        assert!(engine.groups().is_empty());
        assert!(doc.group_items("g").is_empty());
    }

    #[test]
    fn test_readding_same_id_replaces_item() {
        let (mut engine, mut doc) = setup();
        engine.add_decoration(&mut doc, highlight("h1", "best"), "highlights").unwrap();
        engine.add_decoration(&mut doc, highlight("h1", "wisdom"), "highlights").unwrap();

        assert_eq!(doc.group_items("highlights"), vec!["h1"]);
        let range = engine.item("highlights", "h1").unwrap().range.unwrap();
        assert_eq!(&doc.text()[range.start..range.end], "wisdom");
    }

    #[test]
    fn test_page_template_in_two_columns() {
        let mut doc = MemoryDocument::new(Size::new(400.0, 400.0)).with_column_count(2);
        doc.push_block(Some("#page"), "aaaaabbbbb");
        let mut engine = DecorationEngine::new(&BridgeConfig::default());
        engine.register_templates(&mut doc, templates());

        let decoration = Decoration::new("n1", "pageNumber", "<div class=\"pn\"></div>")
            .with_selector("#page")
            .with_quote(TextQuote::new("bbbbb"));
        engine.add_decoration(&mut doc, decoration, "pageNumbers").unwrap();

        let item = engine.item("pageNumbers", "n1").unwrap();
        // quote starts at x=50, page width 200
        assert_eq!(doc.client_rects(item.range.unwrap())[0].left, 50.0);
        assert_eq!(item.elements, vec![Rect::new(0.0, 0.0, 200.0, 20.0)]);
        let html = &doc.overlay("pageNumbers", "n1").unwrap()[0];
        assert!(html.contains("left: 0px;"));
        assert!(html.contains("width: 200px;"));
    }

    #[test]
    fn test_vertical_rl_boxes_follow_columns_right_to_left() {
        let mut doc = MemoryDocument::new(Size::new(100.0, 30.0)).with_writing_mode(WritingMode::VerticalRl);
        doc.push_block(Some("#p"), "abcd");
        let mut engine = DecorationEngine::new(&BridgeConfig::default());
        engine.register_templates(&mut doc, templates());

        engine.add_decoration(&mut doc, highlight("h1", "abcd"), "g").unwrap();

        let item = engine.item("g", "h1").unwrap();
        assert_eq!(
            item.elements,
            vec![Rect::new(80.0, 0.0, 20.0, 30.0), Rect::new(60.0, 0.0, 20.0, 10.0)]
        );
    }

    #[test]
    fn test_boxes_without_marker_use_container_bounds() {
        let mut doc = MemoryDocument::new(Size::new(100.0, 400.0));
        doc.push_block(Some("#p"), "aaaaaaaaaabbbbb");
        let mut engine = DecorationEngine::new(&BridgeConfig::default());
        engine.register_templates(&mut doc, templates());

        let plain = Decoration::new("plain", "highlight", "<div></div>").with_selector("#p");
        engine.add_decoration(&mut doc, plain, "g").unwrap();
        let marked = Decoration::new("marked", "highlight", "<div data-activable=\"1\"></div>")
            .with_selector("#p");
        engine.add_decoration(&mut doc, marked, "g").unwrap();

        let plain = engine.item("g", "plain").unwrap();
        assert_eq!(plain.elements.len(), 2);
        assert_eq!(plain.clickable, vec![Rect::new(0.0, 0.0, 100.0, 40.0)]);

        let marked = engine.item("g", "marked").unwrap();
        assert_eq!(marked.clickable, marked.elements);
    }

    #[test]
    fn test_resize_relayout_is_debounced_and_skipped_when_unchanged() {
        let (mut engine, mut doc) = setup();
        engine.add_decoration(&mut doc, highlight("h1", "wisdom"), "highlights").unwrap();
        let before = engine.item("highlights", "h1").unwrap().elements.clone();

        // no pending notification: nothing happens
        assert!(!engine.on_animation_frame(&mut doc));

        doc.set_viewport(Size::new(100.0, 400.0));
        engine.notify_resize();
        engine.notify_resize();
        assert!(engine.on_animation_frame(&mut doc));
        let after = engine.item("highlights", "h1").unwrap().elements.clone();
        assert_ne!(before, after);

        // same size again: skipped
        engine.notify_resize();
        assert!(!engine.on_animation_frame(&mut doc));
        assert_eq!(doc.group_items("highlights"), vec!["h1"]);
    }
}
