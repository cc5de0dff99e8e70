//! Decoration element markup
//!
//! The markup fragment of a decoration is validated once and then cloned
//! for every placement, with the first element receiving the absolute
//! position styles. Uses lol_html so fragments never need a full DOM.

use std::cell::Cell;

use lol_html::{element, rewrite_str, RewriteStrSettings};

use crate::error::DecorationError;
use crate::geometry::Rect;

/// A validated element fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementTemplate {
    markup: String,
    has_activable: bool,
}

impl ElementTemplate {
    /// Validate `markup` and look for elements carrying
    /// `activation_attribute="1"`
    pub fn parse(markup: &str, activation_attribute: &str) -> Result<Self, DecorationError> {
        let markup = markup.trim();
        let element_count = Cell::new(0usize);
        let activable = Cell::new(false);

        rewrite_str(
            markup,
            RewriteStrSettings {
                element_content_handlers: vec![element!("*", |el| {
                    element_count.set(element_count.get() + 1);
                    if el.get_attribute(activation_attribute).as_deref() == Some("1") {
                        activable.set(true);
                    }
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|e| DecorationError::MalformedMarkup(format!("{}: {}", markup, e)))?;

        if element_count.get() == 0 {
            return Err(DecorationError::MalformedMarkup(markup.to_string()));
        }

        Ok(Self {
            markup: markup.to_string(),
            has_activable: activable.get(),
        })
    }

    /// Whether some element is explicitly marked clickable
    pub fn has_activable(&self) -> bool {
        self.has_activable
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Clone the fragment with its first element absolutely positioned at
    /// `placement`
    pub fn instantiate(&self, placement: &Rect) -> Result<String, DecorationError> {
        let positioned = Cell::new(false);
        let position = format!(
            "position: absolute; pointer-events: none; left: {}px; top: {}px; width: {}px; height: {}px;",
            placement.left, placement.top, placement.width, placement.height
        );

        let html = rewrite_str(
            &self.markup,
            RewriteStrSettings {
                element_content_handlers: vec![element!("*", |el| {
                    if positioned.replace(true) {
                        return Ok(());
                    }
                    let style = match el.get_attribute("style") {
                        Some(existing) if !existing.trim().is_empty() => {
                            format!("{}; {}", existing.trim().trim_end_matches(';'), position)
                        }
                        _ => position.clone(),
                    };
                    el.set_attribute("style", &style)?;
                    Ok(())
                })],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|e| DecorationError::MalformedMarkup(format!("{}: {}", self.markup, e)));
        html
    }
}
