//! In-memory content document
//!
//! A deterministic stand-in for a rendered frame document. Text is laid out
//! with a fixed glyph advance and line height:
//!
//! - `horizontal-tb`: lines wrap at the column width, columns are placed
//!   side by side (CSS multi-column pagination)
//! - `vertical-rl` / `vertical-lr`: each line is a vertical strip, strips
//!   advance right-to-left or left-to-right
//!
//! Each block starts on a fresh line and blocks are joined with `\n` in the
//! text content. Selectors are matched verbatim against the selector given
//! when the block was pushed.

use crate::geometry::{bounding_rect, Point, Rect, Size};

use super::{ContentDocument, Link, TextRange, WritingMode};

const DEFAULT_GLYPH_ADVANCE: f64 = 10.0;
const DEFAULT_LINE_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone)]
struct Block {
    range: TextRange,
    selector: Option<String>,
}

#[derive(Debug, Clone)]
struct MountedItem {
    group: String,
    item_id: String,
    elements: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Glyph {
    start: usize,
    end: usize,
    line: usize,
    index: usize,
}

/// Line-box document model used by tests and the replay tool
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    text: String,
    blocks: Vec<Block>,
    links: Vec<(TextRange, String)>,
    viewport: Size,
    glyph_advance: f64,
    line_height: f64,
    writing_mode: WritingMode,
    zoom: f64,
    column_count: Option<u32>,
    scroll: Point,
    natural_size: Option<Size>,
    selection: Option<TextRange>,
    stylesheets: Vec<String>,
    overlays: Vec<MountedItem>,
}

impl MemoryDocument {
    pub fn new(viewport: Size) -> Self {
        Self {
            text: String::new(),
            blocks: Vec::new(),
            links: Vec::new(),
            viewport,
            glyph_advance: DEFAULT_GLYPH_ADVANCE,
            line_height: DEFAULT_LINE_HEIGHT,
            writing_mode: WritingMode::HorizontalTb,
            zoom: 1.0,
            column_count: None,
            scroll: Point::default(),
            natural_size: None,
            selection: None,
            stylesheets: Vec::new(),
            overlays: Vec::new(),
        }
    }

    pub fn with_metrics(mut self, glyph_advance: f64, line_height: f64) -> Self {
        self.glyph_advance = glyph_advance;
        self.line_height = line_height;
        self
    }

    pub fn with_writing_mode(mut self, writing_mode: WritingMode) -> Self {
        self.writing_mode = writing_mode;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_column_count(mut self, column_count: u32) -> Self {
        self.column_count = Some(column_count);
        self
    }

    pub fn with_natural_size(mut self, size: Size) -> Self {
        self.natural_size = Some(size);
        self
    }

    /// Append a block of text, returning its range
    pub fn push_block(&mut self, selector: Option<&str>, text: &str) -> TextRange {
        if !self.blocks.is_empty() {
            self.text.push('\n');
        }
        let start = self.text.len();
        self.text.push_str(text);
        let range = TextRange::new(start, self.text.len());
        self.blocks.push(Block {
            range,
            selector: selector.map(str::to_string),
        });
        range
    }

    /// Turn an existing range into a hyperlink
    pub fn add_link(&mut self, range: TextRange, href: &str) {
        self.links.push((range, href.to_string()));
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn set_scroll(&mut self, scroll: Point) {
        self.scroll = scroll;
    }

    pub fn set_selection(&mut self, range: Option<TextRange>) {
        self.selection = range;
    }

    pub fn stylesheets(&self) -> &[String] {
        &self.stylesheets
    }

    /// Elements mounted for one decoration item
    pub fn overlay(&self, group: &str, item_id: &str) -> Option<&[String]> {
        self.overlays
            .iter()
            .find(|m| m.group == group && m.item_id == item_id)
            .map(|m| m.elements.as_slice())
    }

    /// Item ids mounted in a group, in mount order
    pub fn group_items(&self, group: &str) -> Vec<&str> {
        self.overlays
            .iter()
            .filter(|m| m.group == group)
            .map(|m| m.item_id.as_str())
            .collect()
    }

    fn column_width(&self) -> f64 {
        self.viewport.width / f64::from(self.column_count.unwrap_or(1).max(1))
    }

    fn glyphs_per_line(&self) -> usize {
        let extent = if self.writing_mode.is_vertical() {
            self.viewport.height
        } else {
            self.column_width()
        };
        ((extent / self.glyph_advance).floor() as usize).max(1)
    }

    fn lines_per_column(&self) -> usize {
        ((self.viewport.height / self.line_height).floor() as usize).max(1)
    }

    fn glyphs(&self) -> Vec<Glyph> {
        let per_line = self.glyphs_per_line();
        let mut glyphs = Vec::with_capacity(self.text.len());
        let mut line = 0;

        for block in &self.blocks {
            let mut count = 0;
            for (offset, ch) in self.text[block.range.start..block.range.end].char_indices() {
                let start = block.range.start + offset;
                glyphs.push(Glyph {
                    start,
                    end: start + ch.len_utf8(),
                    line: line + count / per_line,
                    index: count % per_line,
                });
                count += 1;
            }
            line += count.div_ceil(per_line).max(1);
        }

        glyphs
    }

    /// Layout rect of a glyph, before scroll and zoom
    fn glyph_rect(&self, glyph: &Glyph) -> Rect {
        let advance = glyph.index as f64 * self.glyph_advance;
        match self.writing_mode {
            WritingMode::HorizontalTb => {
                let per_column = self.lines_per_column();
                let column = glyph.line / per_column;
                let x = column as f64 * self.column_width();
                let y = (glyph.line % per_column) as f64 * self.line_height;
                Rect::new(x + advance, y, self.glyph_advance, self.line_height)
            }
            WritingMode::VerticalRl => {
                let x = self.viewport.width - (glyph.line + 1) as f64 * self.line_height;
                Rect::new(x, advance, self.line_height, self.glyph_advance)
            }
            WritingMode::VerticalLr => {
                let x = glyph.line as f64 * self.line_height;
                Rect::new(x, advance, self.line_height, self.glyph_advance)
            }
        }
    }

    fn to_client(&self, rect: &Rect) -> Rect {
        rect.translate(-self.scroll.x, -self.scroll.y).scale(self.zoom)
    }
}

impl ContentDocument for MemoryDocument {
    fn writing_mode(&self) -> WritingMode {
        self.writing_mode
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn column_count(&self) -> Option<u32> {
        self.column_count
    }

    fn viewport_size(&self) -> Size {
        self.viewport
    }

    fn scroll_offset(&self) -> Point {
        self.scroll
    }

    fn body_size(&self) -> Size {
        let rects: Vec<Rect> = self.glyphs().iter().map(|g| self.glyph_rect(g)).collect();
        match bounding_rect(&rects) {
            Some(b) => Size::new(b.right.max(0.0), b.bottom.max(0.0)),
            None => Size::default(),
        }
    }

    fn natural_size(&self) -> Option<Size> {
        self.natural_size
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn select(&self, selector: &str) -> Option<TextRange> {
        self.blocks
            .iter()
            .find(|b| b.selector.as_deref() == Some(selector))
            .map(|b| b.range)
    }

    fn client_rects(&self, range: TextRange) -> Vec<Rect> {
        let mut rects: Vec<Rect> = Vec::new();
        let mut current_line = None;

        for glyph in self.glyphs() {
            if glyph.start < range.start || glyph.end > range.end {
                continue;
            }
            let rect = self.to_client(&self.glyph_rect(&glyph));
            match (current_line, rects.last_mut()) {
                (Some(line), Some(last)) if line == glyph.line => *last = last.union(&rect),
                _ => rects.push(rect),
            }
            current_line = Some(glyph.line);
        }

        rects
    }

    fn selection(&self) -> Option<TextRange> {
        self.selection
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn link_at(&self, point: Point) -> Option<Link> {
        self.links.iter().find_map(|(range, href)| {
            let hit = self
                .client_rects(*range)
                .iter()
                .any(|r| r.contains(point, 0.0));
            hit.then(|| Link {
                href: href.clone(),
                outer_html: format!("<a href=\"{}\">{}</a>", href, &self.text[range.start..range.end]),
            })
        })
    }

    fn inject_stylesheet(&mut self, css: &str) {
        self.stylesheets.push(css.to_string());
    }

    fn mount_overlay(&mut self, group: &str, item_id: &str, elements: Vec<String>) {
        self.unmount_overlay(group, item_id);
        self.overlays.push(MountedItem {
            group: group.to_string(),
            item_id: item_id.to_string(),
            elements,
        });
    }

    fn unmount_overlay(&mut self, group: &str, item_id: &str) {
        self.overlays
            .retain(|m| !(m.group == group && m.item_id == item_id));
    }

    fn clear_group(&mut self, group: &str) {
        self.overlays.retain(|m| m.group != group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_start_on_new_lines() {
        let mut doc = MemoryDocument::new(Size::new(100.0, 100.0));
        let first = doc.push_block(Some("#a"), "abc");
        let second = doc.push_block(Some("#b"), "de");

        assert_eq!(doc.text(), "abc\nde");
        assert_eq!(doc.client_rects(first), vec![Rect::new(0.0, 0.0, 30.0, 20.0)]);
        assert_eq!(doc.client_rects(second), vec![Rect::new(0.0, 20.0, 20.0, 20.0)]);
    }

    #[test]
    fn test_wrapping_produces_one_rect_per_line() {
        let mut doc = MemoryDocument::new(Size::new(50.0, 100.0));
        let range = doc.push_block(None, "abcdefgh");

        let rects = doc.client_rects(range);

        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0], Rect::new(0.0, 0.0, 50.0, 20.0));
        assert_eq!(rects[1], Rect::new(0.0, 20.0, 30.0, 20.0));
    }

    #[test]
    fn test_columns_paginate_horizontally() {
        // two columns of 100px, 2 lines per column
        let mut doc = MemoryDocument::new(Size::new(200.0, 40.0)).with_column_count(2);
        doc.push_block(None, "aaaaaaaaaa");
        doc.push_block(None, "bbbbbbbbbb");
        let third = doc.push_block(Some("#c"), "cc");

        assert_eq!(doc.client_rects(third), vec![Rect::new(100.0, 0.0, 20.0, 20.0)]);
    }

    #[test]
    fn test_scroll_and_zoom_affect_client_rects() {
        let mut doc = MemoryDocument::new(Size::new(100.0, 100.0)).with_zoom(2.0);
        let range = doc.push_block(None, "ab");
        doc.set_scroll(Point::new(0.0, 10.0));

        assert_eq!(doc.client_rects(range), vec![Rect::new(0.0, -20.0, 40.0, 40.0)]);
    }

    #[test]
    fn test_vertical_rl_lines_advance_leftwards() {
        let mut doc = MemoryDocument::new(Size::new(100.0, 30.0))
            .with_writing_mode(WritingMode::VerticalRl);
        let range = doc.push_block(None, "abcd");

        let rects = doc.client_rects(range);

        assert_eq!(rects[0], Rect::new(80.0, 0.0, 20.0, 30.0));
        assert_eq!(rects[1], Rect::new(60.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn test_link_at() {
        let mut doc = MemoryDocument::new(Size::new(200.0, 100.0));
        doc.push_block(None, "intro");
        let link = doc.push_block(None, "next");
        doc.add_link(link, "chapter2.xhtml");

        let found = doc.link_at(Point::new(15.0, 25.0)).unwrap();
        assert_eq!(found.href, "chapter2.xhtml");
        assert_eq!(found.outer_html, "<a href=\"chapter2.xhtml\">next</a>");
        assert!(doc.link_at(Point::new(15.0, 5.0)).is_none());
    }

    #[test]
    fn test_mount_replaces_existing_item() {
        let mut doc = MemoryDocument::new(Size::new(100.0, 100.0));
        doc.mount_overlay("highlights", "h1", vec!["<div></div>".into()]);
        doc.mount_overlay("highlights", "h1", vec!["<span></span>".into()]);
        doc.mount_overlay("highlights", "h2", vec![]);

        assert_eq!(doc.group_items("highlights"), vec!["h1", "h2"]);
        assert_eq!(doc.overlay("highlights", "h1").unwrap(), ["<span></span>".to_string()]);

        doc.clear_group("highlights");
        assert!(doc.group_items("highlights").is_empty());
    }
}
