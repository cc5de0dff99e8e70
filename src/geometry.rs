//! Geometry primitives and frame/host coordinate transforms
//!
//! Frame-local coordinates are CSS pixels relative to a frame's own viewport.
//! Host coordinates are what the host application sees after pinch-zoom:
//! `(p + frame_origin - viewport_offset) * viewport_scale`.
//!
//! Every frame→host boundary crossing (taps, decoration activation,
//! selection rects) goes through [`point_to_host_space`] or
//! [`rect_to_host_space`].

use serde::{Deserialize, Serialize};

/// A point in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A size in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Safe-area insets around the viewport
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Insets {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Shrink `size` by these insets, never below zero
    pub fn inset(&self, size: Size) -> Size {
        Size {
            width: (size.width - self.left - self.right).max(0.0),
            height: (size.height - self.top - self.bottom).max(0.0),
        }
    }
}

/// A rectangle in the DOMRect-like wire shape
///
/// All six fields are serialized so the record can be consumed by either
/// side without recomputation. Use the constructors to keep them consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            right: left + width,
            bottom: top + height,
            left,
            width,
            height,
        }
    }

    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
            width: right - left,
            height: bottom - top,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Point containment, growing the rect by `tolerance` on every edge
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        point.x >= self.left - tolerance
            && point.x <= self.right + tolerance
            && point.y >= self.top - tolerance
            && point.y <= self.bottom + tolerance
    }

    /// Whether `other` lies entirely within this rect (with tolerance)
    pub fn contains_rect(&self, other: &Rect, tolerance: f64) -> bool {
        other.left >= self.left - tolerance
            && other.top >= self.top - tolerance
            && other.right <= self.right + tolerance
            && other.bottom <= self.bottom + tolerance
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_edges(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.width, self.height)
    }

    /// Multiply every coordinate by `factor`
    pub fn scale(&self, factor: f64) -> Rect {
        Rect::from_edges(
            self.left * factor,
            self.top * factor,
            self.right * factor,
            self.bottom * factor,
        )
    }

    /// Approximate equality, used to dedupe client rects
    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.left - other.left).abs() <= tolerance
            && (self.top - other.top).abs() <= tolerance
            && (self.right - other.right).abs() <= tolerance
            && (self.bottom - other.bottom).abs() <= tolerance
    }
}

/// Union of a set of rects, `None` when empty
pub fn bounding_rect<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
    rects.into_iter().fold(None, |acc, r| match acc {
        None => Some(*r),
        Some(b) => Some(b.union(r)),
    })
}

/// The host's pinch-zoom state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    /// Current visual viewport scale
    pub scale: f64,
    /// Visual viewport scroll offset, in unscaled CSS pixels
    pub offset: Point,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Point::default(),
        }
    }
}

impl ViewportTransform {
    pub fn new(scale: f64, offset: Point) -> Self {
        Self { scale, offset }
    }
}

/// Map a frame-local point into host space
pub fn point_to_host_space(point: Point, frame_rect: &Rect, viewport: &ViewportTransform) -> Point {
    Point {
        x: (point.x + frame_rect.left - viewport.offset.x) * viewport.scale,
        y: (point.y + frame_rect.top - viewport.offset.y) * viewport.scale,
    }
}

/// Map a frame-local rect into host space
///
/// Both corners go through the point transform and the size is derived from
/// the transformed corners.
pub fn rect_to_host_space(rect: &Rect, frame_rect: &Rect, viewport: &ViewportTransform) -> Rect {
    let top_left = point_to_host_space(Point::new(rect.left, rect.top), frame_rect, viewport);
    let bottom_right = point_to_host_space(Point::new(rect.right, rect.bottom), frame_rect, viewport);
    Rect::from_edges(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
}

/// Inverse of [`point_to_host_space`]
pub fn point_from_host_space(point: Point, frame_rect: &Rect, viewport: &ViewportTransform) -> Point {
    Point {
        x: point.x / viewport.scale + viewport.offset.x - frame_rect.left,
        y: point.y / viewport.scale + viewport.offset.y - frame_rect.top,
    }
}

/// Inverse of [`rect_to_host_space`]
pub fn rect_from_host_space(rect: &Rect, frame_rect: &Rect, viewport: &ViewportTransform) -> Rect {
    let top_left = point_from_host_space(Point::new(rect.left, rect.top), frame_rect, viewport);
    let bottom_right = point_from_host_space(Point::new(rect.right, rect.bottom), frame_rect, viewport);
    Rect::from_edges(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
}
