//! Decoration data model
//!
//! Field names follow the wire format (`cssSelector`, `textQuote`,
//! `quotedText`, ...) so these records travel unchanged over the
//! decoration channel.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DecorationError;

/// Text quote with surrounding context, used for fuzzy anchoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextQuote {
    /// The exact text being decorated
    pub quoted_text: String,
    /// Text immediately before the quote
    #[serde(default)]
    pub text_before: String,
    /// Text immediately after the quote
    #[serde(default)]
    pub text_after: String,
}

impl TextQuote {
    pub fn new(quoted_text: &str) -> Self {
        Self {
            quoted_text: quoted_text.to_string(),
            ..Default::default()
        }
    }

    pub fn with_context(quoted_text: &str, text_before: &str, text_after: &str) -> Self {
        Self {
            quoted_text: quoted_text.to_string(),
            text_before: text_before.to_string(),
            text_after: text_after.to_string(),
        }
    }
}

/// A visual annotation to render at an anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decoration {
    /// Unique within its group
    pub id: String,
    /// Template key
    pub style: String,
    /// Markup of the element cloned for each placement
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_quote: Option<TextQuote>,
}

impl Decoration {
    pub fn new(id: &str, style: &str, element: &str) -> Self {
        Self {
            id: id.to_string(),
            style: style.to_string(),
            element: element.to_string(),
            css_selector: None,
            text_quote: None,
        }
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.css_selector = Some(selector.to_string());
        self
    }

    pub fn with_quote(mut self, quote: TextQuote) -> Self {
        self.text_quote = Some(quote);
        self
    }

    /// Same anchor (selector and quote)
    pub fn same_anchor(&self, other: &Decoration) -> bool {
        self.css_selector == other.css_selector && self.text_quote == other.text_quote
    }

    /// Same rendering: style, markup and anchor. Identity is ignored.
    pub fn same_content(&self, other: &Decoration) -> bool {
        self.style == other.style && self.element == other.element && self.same_anchor(other)
    }
}

/// How a decoration is split into elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateLayout {
    /// One element over the range's bounding rect
    Bounds,
    /// One element per line box of the range
    Boxes,
}

/// Cross-axis extent of each element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateWidth {
    /// Exactly the rect
    Wrap,
    /// The whole viewport band containing the rect
    Viewport,
    /// The range's bounding rect
    Bounds,
    /// One column of the viewport
    Page,
}

/// Declarative description of how a style is laid out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationTemplate {
    pub layout: TemplateLayout,
    pub width: TemplateWidth,
    #[serde(default)]
    pub stylesheet: String,
}

impl DecorationTemplate {
    pub fn new(layout: TemplateLayout, width: TemplateWidth) -> Self {
        Self {
            layout,
            width,
            stylesheet: String::new(),
        }
    }

    pub fn with_stylesheet(mut self, stylesheet: &str) -> Self {
        self.stylesheet = stylesheet.to_string();
        self
    }
}

/// Closed table of style key → template for one frame session
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, DecorationTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register templates, returning the combined stylesheet of the newly
    /// added ones. Keys already registered keep their first template.
    pub fn register(&mut self, templates: BTreeMap<String, DecorationTemplate>) -> String {
        let mut stylesheet = String::new();

        for (key, template) in templates {
            match self.templates.entry(key) {
                Entry::Occupied(existing) => {
                    if existing.get() != &template {
                        tracing::warn!(style = %existing.key(), "Ignoring re-registration of decoration template");
                    }
                }
                Entry::Vacant(slot) => {
                    if !template.stylesheet.trim().is_empty() {
                        if !stylesheet.is_empty() {
                            stylesheet.push('\n');
                        }
                        stylesheet.push_str(template.stylesheet.trim());
                    }
                    slot.insert(template);
                }
            }
        }

        stylesheet
    }

    pub fn get(&self, style: &str) -> Result<&DecorationTemplate, DecorationError> {
        self.templates
            .get(style)
            .ok_or_else(|| DecorationError::UnknownStyle(style.to_string()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoration_wire_format() {
        let json = serde_json::json!({
            "id": "h1",
            "style": "highlight",
            "element": "<div class=\"hl\"></div>",
            "textQuote": { "quotedText": "world", "textBefore": "hello " }
        });
        let decoration: Decoration = serde_json::from_value(json).unwrap();

        assert_eq!(decoration.css_selector, None);
        let quote = decoration.text_quote.unwrap();
        assert_eq!(quote.quoted_text, "world");
        assert_eq!(quote.text_after, "");
    }

    #[test]
    fn test_template_wire_format() {
        let template: DecorationTemplate =
            serde_json::from_str(r#"{"layout":"boxes","width":"page"}"#).unwrap();
        assert_eq!(template, DecorationTemplate::new(TemplateLayout::Boxes, TemplateWidth::Page));
    }

    #[test]
    fn test_same_content_ignores_id() {
        let a = Decoration::new("a", "highlight", "<div></div>").with_selector("#p1");
        let mut b = a.clone();
        b.id = "b".into();
        assert!(a.same_content(&b));

        b.style = "underline".into();
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_registry_concatenates_new_stylesheets_once() {
        let mut registry = TemplateRegistry::new();
        let mut templates = BTreeMap::new();
        templates.insert(
            "highlight".to_string(),
            DecorationTemplate::new(TemplateLayout::Boxes, TemplateWidth::Wrap)
                .with_stylesheet(".hl { background: yellow; }"),
        );
        templates.insert(
            "margin".to_string(),
            DecorationTemplate::new(TemplateLayout::Bounds, TemplateWidth::Page)
                .with_stylesheet(".mg { border-left: 2px solid red; }"),
        );

        let css = registry.register(templates.clone());
        assert_eq!(css, ".hl { background: yellow; }\n.mg { border-left: 2px solid red; }");

        // same keys again: nothing new to inject
        assert_eq!(registry.register(templates), "");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_unknown_style() {
        let registry = TemplateRegistry::new();
        assert_eq!(
            registry.get("nope").unwrap_err(),
            DecorationError::UnknownStyle("nope".into())
        );
    }
}
