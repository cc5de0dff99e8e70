//! Frame-side text selection extraction

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::dom::ContentDocument;
use crate::geometry::Rect;

/// The user's current selection with surrounding context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub selected_text: String,
    pub text_before: String,
    pub text_after: String,
    /// Bounding rect; frame-local on the wire, host space once delivered
    pub selection_rect: Rect,
}

/// Reads and clears the selection of one frame document
#[derive(Debug, Clone)]
pub struct SelectionManager {
    context_chars: usize,
}

impl SelectionManager {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            context_chars: config.selection_context_chars,
        }
    }

    /// Snapshot the current selection; `None` when collapsed or blank
    pub fn current_selection<D: ContentDocument + ?Sized>(&self, doc: &D) -> Option<Selection> {
        let range = doc.selection()?;
        if range.is_collapsed() {
            return None;
        }

        let text = doc.text();
        let selected = text.get(range.start..range.end)?;
        if selected.trim().is_empty() {
            return None;
        }

        let selection_rect = doc.bounding_client_rect(range)?;

        Some(Selection {
            selected_text: selected.to_string(),
            text_before: tail_chars(&text[..range.start], self.context_chars),
            text_after: head_chars(&text[range.end..], self.context_chars),
            selection_rect,
        })
    }

    pub fn clear<D: ContentDocument + ?Sized>(&self, doc: &mut D) {
        doc.clear_selection();
    }
}

fn head_chars(text: &str, count: usize) -> String {
    text.chars().take(count).collect()
}

fn tail_chars(text: &str, count: usize) -> String {
    let skip = text.chars().count().saturating_sub(count);
    text.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, TextRange};
    use crate::geometry::Size;

    fn document() -> MemoryDocument {
        let mut doc = MemoryDocument::new(Size::new(400.0, 400.0));
        doc.push_block(None, "Call me Ishmael. Some years ago");
        doc
    }

    #[test]
    fn test_selection_with_context() {
        let mut doc = document();
        doc.set_selection(Some(TextRange::new(8, 15)));
        let config = BridgeConfig {
            selection_context_chars: 5,
            ..BridgeConfig::default()
        };

        let selection = SelectionManager::new(&config).current_selection(&doc).unwrap();

        assert_eq!(selection.selected_text, "Ishmael");
        assert_eq!(selection.text_before, "l me ");
        assert_eq!(selection.text_after, ". Som");
        assert_eq!(selection.selection_rect, Rect::new(80.0, 0.0, 70.0, 20.0));
    }

    #[test]
    fn test_no_selection() {
        let mut doc = document();
        let manager = SelectionManager::new(&BridgeConfig::default());
        assert!(manager.current_selection(&doc).is_none());

        doc.set_selection(Some(TextRange::new(4, 4)));
        assert!(manager.current_selection(&doc).is_none());

        doc.set_selection(Some(TextRange::new(4, 5)));
        assert!(manager.current_selection(&doc).is_none(), "whitespace only");
    }

    #[test]
    fn test_clear() {
        let mut doc = document();
        doc.set_selection(Some(TextRange::new(0, 4)));
        let manager = SelectionManager::new(&BridgeConfig::default());

        manager.clear(&mut doc);

        assert!(doc.selection().is_none());
    }

    #[test]
    fn test_context_is_char_based() {
        assert_eq!(tail_chars("héllo", 3), "llo");
        assert_eq!(head_chars("héllo", 2), "hé");
    }
}
