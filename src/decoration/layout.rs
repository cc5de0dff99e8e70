//! Placement geometry for decoration elements
//!
//! Input is the range's client rects (zoomed, viewport relative). Output is
//! one absolute rect per element, in unzoomed document coordinates (scroll
//! offset added back) ready to be written as `left/top/width/height` styles.

use std::cmp::Ordering;

use crate::dom::{ContentDocument, WritingMode};
use crate::geometry::{bounding_rect, Point, Rect, Size};

use super::types::{DecorationTemplate, TemplateLayout, TemplateWidth};

/// Rects closer than this are considered identical or touching
const RECT_TOLERANCE: f64 = 1.0;

/// Document state the placement depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    pub writing_mode: WritingMode,
    pub viewport: Size,
    pub column_count: u32,
    pub scroll: Point,
    pub zoom: f64,
}

impl LayoutContext {
    pub fn from_document<D: ContentDocument + ?Sized>(doc: &D) -> Self {
        let zoom = doc.zoom();
        Self {
            writing_mode: doc.writing_mode(),
            viewport: doc.viewport_size(),
            column_count: doc.column_count().unwrap_or(1).max(1),
            scroll: doc.scroll_offset(),
            zoom: if zoom > 0.0 { zoom } else { 1.0 },
        }
    }

    /// Undo document zoom on a client rect
    fn unzoom(&self, rect: &Rect) -> Rect {
        if (self.zoom - 1.0).abs() < f64::EPSILON {
            *rect
        } else {
            rect.scale(1.0 / self.zoom)
        }
    }

    /// Client rect → document rect
    pub fn to_document(&self, rect: &Rect) -> Rect {
        rect.translate(self.scroll.x, self.scroll.y)
    }

    /// Document rect → client rect (zoomed)
    pub fn to_client(&self, rect: &Rect) -> Rect {
        rect.translate(-self.scroll.x, -self.scroll.y).scale(self.zoom)
    }
}

/// Compute the element rects for one decoration
pub fn compute_placements(
    template: &DecorationTemplate,
    client_rects: &[Rect],
    ctx: &LayoutContext,
) -> Vec<Rect> {
    let rects: Vec<Rect> = client_rects
        .iter()
        .map(|r| ctx.unzoom(r))
        .filter(|r| !r.is_empty())
        .collect();
    let Some(bounds) = bounding_rect(&rects) else {
        return Vec::new();
    };

    match template.layout {
        TemplateLayout::Bounds => vec![place(template.width, &bounds, &bounds, ctx)],
        TemplateLayout::Boxes => {
            let mut boxes = non_overlapping_rects(&rects, ctx.writing_mode.is_vertical());
            sort_reading_order(&mut boxes, ctx.writing_mode);
            boxes
                .iter()
                .map(|r| place(template.width, r, &bounds, ctx))
                .collect()
        }
    }
}

/// Position one element for `rect` according to the width policy
pub fn place(width: TemplateWidth, rect: &Rect, bounds: &Rect, ctx: &LayoutContext) -> Rect {
    let placed = if ctx.writing_mode.is_vertical() {
        place_vertical(width, rect, bounds, ctx)
    } else {
        place_horizontal(width, rect, bounds, ctx)
    };
    ctx.to_document(&placed)
}

fn place_horizontal(width: TemplateWidth, rect: &Rect, bounds: &Rect, ctx: &LayoutContext) -> Rect {
    match width {
        TemplateWidth::Wrap => *rect,
        TemplateWidth::Viewport => {
            let band = ctx.viewport.width;
            Rect::new(snap(rect.left, band), rect.top, band, rect.height)
        }
        TemplateWidth::Bounds => Rect::new(bounds.left, rect.top, bounds.width, rect.height),
        TemplateWidth::Page => {
            let band = ctx.viewport.width / f64::from(ctx.column_count);
            Rect::new(snap(rect.left, band), rect.top, band, rect.height)
        }
    }
}

fn place_vertical(width: TemplateWidth, rect: &Rect, bounds: &Rect, ctx: &LayoutContext) -> Rect {
    match width {
        TemplateWidth::Wrap => Rect::new(rect.left, rect.top, rect.width, rect.height),
        TemplateWidth::Viewport => {
            let band = ctx.viewport.height;
            Rect::new(rect.left, snap(rect.top, band), rect.width, band)
        }
        TemplateWidth::Bounds => Rect::new(rect.left, bounds.top, rect.width, bounds.height),
        TemplateWidth::Page => {
            let band = ctx.viewport.height / f64::from(ctx.column_count);
            Rect::new(rect.left, snap(rect.top, band), rect.width, band)
        }
    }
}

/// Start of the `band`-sized band containing `coord`
fn snap(coord: f64, band: f64) -> f64 {
    if band <= 0.0 {
        return coord;
    }
    (coord / band).floor() * band
}

/// Reduce client rects to a minimal non-overlapping set
///
/// Near-duplicates and rects contained in another are dropped. Fragments of
/// one line that touch are merged: along x for horizontal text, along y
/// within a column for `vertical` text. Partial overlaps left after that are
/// cut out of the later rect.
pub fn non_overlapping_rects(rects: &[Rect], vertical: bool) -> Vec<Rect> {
    let mut result: Vec<Rect> = Vec::with_capacity(rects.len());

    for rect in rects.iter().filter(|r| !r.is_empty()) {
        if result.iter().any(|r| r.contains_rect(rect, RECT_TOLERANCE)) {
            continue;
        }
        result.retain(|r| !rect.contains_rect(r, RECT_TOLERANCE));
        result.push(*rect);
    }

    remove_overlaps(merge_same_line(result, vertical))
}

fn merge_same_line(mut rects: Vec<Rect>, vertical: bool) -> Vec<Rect> {
    loop {
        let mut merged = false;
        'outer: for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                if same_line_and_touching(&rects[i], &rects[j], vertical) {
                    let union = rects[i].union(&rects[j]);
                    rects[i] = union;
                    rects.remove(j);
                    merged = true;
                    break 'outer;
                }
            }
        }
        if !merged {
            return rects;
        }
    }
}

fn same_line_and_touching(a: &Rect, b: &Rect, vertical: bool) -> bool {
    if vertical {
        (a.left - b.left).abs() <= RECT_TOLERANCE
            && (a.right - b.right).abs() <= RECT_TOLERANCE
            && a.top <= b.bottom + RECT_TOLERANCE
            && b.top <= a.bottom + RECT_TOLERANCE
    } else {
        (a.top - b.top).abs() <= RECT_TOLERANCE
            && (a.bottom - b.bottom).abs() <= RECT_TOLERANCE
            && a.left <= b.right + RECT_TOLERANCE
            && b.left <= a.right + RECT_TOLERANCE
    }
}

fn remove_overlaps(rects: Vec<Rect>) -> Vec<Rect> {
    let mut result: Vec<Rect> = Vec::with_capacity(rects.len());
    for rect in rects {
        let remaining = result
            .iter()
            .try_fold(rect, |rect, kept| subtract(&rect, kept));
        if let Some(rect) = remaining {
            result.push(rect);
        }
    }
    result
}

/// Largest piece of `rect` outside `other`, `None` when nothing is left
fn subtract(rect: &Rect, other: &Rect) -> Option<Rect> {
    let overlap_width = rect.right.min(other.right) - rect.left.max(other.left);
    let overlap_height = rect.bottom.min(other.bottom) - rect.top.max(other.top);
    if overlap_width <= 0.0 || overlap_height <= 0.0 {
        return Some(*rect);
    }

    [
        Rect::from_edges(rect.left, rect.top, rect.right, other.top.min(rect.bottom)),
        Rect::from_edges(rect.left, other.bottom.max(rect.top), rect.right, rect.bottom),
        Rect::from_edges(rect.left, rect.top, other.left.min(rect.right), rect.bottom),
        Rect::from_edges(other.right.max(rect.left), rect.top, rect.right, rect.bottom),
    ]
    .into_iter()
    .filter(|piece| !piece.is_empty())
    .max_by(|a, b| {
        (a.width * a.height)
            .partial_cmp(&(b.width * b.height))
            .unwrap_or(Ordering::Equal)
    })
}

/// Sort top ascending, then left ascending (right descending for vertical-rl)
pub fn sort_reading_order(rects: &mut [Rect], writing_mode: WritingMode) {
    rects.sort_by(|a, b| {
        let by_top = a.top.partial_cmp(&b.top).unwrap_or(Ordering::Equal);
        by_top.then_with(|| match writing_mode {
            WritingMode::VerticalRl => b.right.partial_cmp(&a.right).unwrap_or(Ordering::Equal),
            _ => a.left.partial_cmp(&b.left).unwrap_or(Ordering::Equal),
        })
    });
}
