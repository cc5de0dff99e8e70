//! Frame document abstraction
//!
//! Everything the frame-side managers need from a rendered content document:
//! computed style queries, text content, range geometry, the user selection
//! and a place to mount overlay elements.
//!
//! Ranges are [`TextRange`] values over [`ContentDocument::text`]. They are
//! cheap to recompute and are never kept across a relayout.

mod memory;

pub use memory::MemoryDocument;

use serde::{Deserialize, Serialize};

use crate::geometry::{bounding_rect, Point, Rect, Size};

/// CSS `writing-mode` of the document root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritingMode {
    #[default]
    HorizontalTb,
    VerticalRl,
    VerticalLr,
}

impl WritingMode {
    pub fn is_vertical(&self) -> bool {
        !matches!(self, WritingMode::HorizontalTb)
    }

    /// Parse a computed-style value, falling back to `horizontal-tb`
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "vertical-rl" | "tb-rl" => WritingMode::VerticalRl,
            "vertical-lr" => WritingMode::VerticalLr,
            _ => WritingMode::HorizontalTb,
        }
    }
}

/// A half-open byte range over a document's text content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.end <= self.start
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Sub-range expressed relative to this range's start
    pub fn offset(&self, relative: TextRange) -> TextRange {
        TextRange::new(self.start + relative.start, self.start + relative.end)
    }
}

/// A hyperlink found under a point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub href: String,
    pub outer_html: String,
}

/// The rendered document inside one frame
pub trait ContentDocument {
    /// Computed `writing-mode` of the root element
    fn writing_mode(&self) -> WritingMode;

    /// CSS zoom applied to the root element (1.0 when none)
    fn zoom(&self) -> f64;

    /// Computed `column-count` of the root element, `None` when `auto`
    fn column_count(&self) -> Option<u32>;

    /// `window.innerWidth` / `window.innerHeight`
    fn viewport_size(&self) -> Size;

    /// Scroll position of the scrolling element
    fn scroll_offset(&self) -> Point;

    /// Content box of the body, watched for relayout
    fn body_size(&self) -> Size;

    /// Natural page size from the viewport declaration (fixed layout only)
    fn natural_size(&self) -> Option<Size>;

    /// Text content of the whole document
    fn text(&self) -> &str;

    /// Range covering the contents of the first element matching `selector`
    fn select(&self, selector: &str) -> Option<TextRange>;

    /// Client rects of `range`, in zoomed viewport coordinates
    fn client_rects(&self, range: TextRange) -> Vec<Rect>;

    /// Current user selection, if any
    fn selection(&self) -> Option<TextRange>;

    fn clear_selection(&mut self);

    /// Hyperlink under a viewport point
    fn link_at(&self, point: Point) -> Option<Link>;

    /// Append one `<style>` block to the head
    fn inject_stylesheet(&mut self, css: &str);

    /// Mount the elements of one decoration item into its group container,
    /// creating the container on first use
    fn mount_overlay(&mut self, group: &str, item_id: &str, elements: Vec<String>);

    fn unmount_overlay(&mut self, group: &str, item_id: &str);

    /// Remove every item container of a group
    fn clear_group(&mut self, group: &str);

    /// Bounding client rect of `range`
    fn bounding_client_rect(&self, range: TextRange) -> Option<Rect> {
        bounding_rect(&self.client_rects(range))
    }

    /// Range covering the whole document
    fn document_range(&self) -> TextRange {
        TextRange::new(0, self.text().len())
    }
}
