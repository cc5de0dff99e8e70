//! Fit policies and the zoom directive they produce

use serde::{Deserialize, Serialize};

use crate::geometry::Size;

/// How fixed-layout content is scaled into the available area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    /// Entirely visible
    #[default]
    Contain,
    /// Fill the width, may overflow vertically
    Width,
    /// Fill the height, may overflow horizontally
    Height,
}

impl Fit {
    pub fn from_name(name: &str) -> Option<Fit> {
        match name.trim().to_ascii_lowercase().as_str() {
            "contain" => Some(Fit::Contain),
            "width" => Some(Fit::Width),
            "height" => Some(Fit::Height),
            _ => None,
        }
    }
}

/// Scale factor mapping `content` into `container` under `fit`
///
/// Degenerate sizes yield 1.0 rather than an infinite or zero scale.
pub fn compute_scale(fit: Fit, content: Size, container: Size) -> f64 {
    if content.is_empty() || container.is_empty() {
        return 1.0;
    }

    let width_scale = container.width / content.width;
    let height_scale = container.height / content.height;

    match fit {
        Fit::Contain => width_scale.min(height_scale),
        Fit::Width => width_scale,
        Fit::Height => height_scale,
    }
}

/// Zoom instruction written to the host document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportDirective {
    pub width: f64,
    pub height: f64,
    pub initial_scale: f64,
    pub minimum_scale: f64,
}

impl ViewportDirective {
    /// Directive sizing the layout viewport to `content`, zoomed to `scale`
    pub fn new(content: Size, scale: f64) -> Self {
        Self {
            width: content.width,
            height: content.height,
            initial_scale: scale,
            minimum_scale: scale,
        }
    }

    /// `<meta name="viewport">` content string
    pub fn to_meta_content(&self) -> String {
        format!(
            "width={}, height={}, initial-scale={}, minimum-scale={}",
            self.width, self.height, self.initial_scale, self.minimum_scale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contain_picks_smaller_ratio() {
        let scale = compute_scale(Fit::Contain, Size::new(600.0, 800.0), Size::new(1200.0, 800.0));
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn test_width_fit() {
        let scale = compute_scale(Fit::Width, Size::new(600.0, 800.0), Size::new(1200.0, 800.0));
        assert_eq!(scale, 2.0);
    }

    #[test]
    fn test_height_fit() {
        let scale = compute_scale(Fit::Height, Size::new(600.0, 800.0), Size::new(1200.0, 400.0));
        assert_eq!(scale, 0.5);
    }

    #[test]
    fn test_landscape_content_scales_to_half() {
        let content = Size::new(200.0, 100.0);
        assert_eq!(compute_scale(Fit::Contain, content, Size::new(100.0, 100.0)), 0.5);
        assert_eq!(compute_scale(Fit::Width, content, Size::new(100.0, 50.0)), 0.5);
        assert_eq!(compute_scale(Fit::Height, content, Size::new(50.0, 50.0)), 0.5);
    }

    #[test]
    fn test_spread_contain() {
        let scale = compute_scale(Fit::Contain, Size::new(1200.0, 800.0), Size::new(1200.0, 800.0));
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn test_degenerate_sizes() {
        assert_eq!(compute_scale(Fit::Contain, Size::default(), Size::new(100.0, 100.0)), 1.0);
        assert_eq!(compute_scale(Fit::Width, Size::new(100.0, 100.0), Size::new(0.0, 50.0)), 1.0);
    }

    #[test]
    fn test_fit_names() {
        assert_eq!(Fit::from_name("Width"), Some(Fit::Width));
        assert_eq!(Fit::from_name(" contain "), Some(Fit::Contain));
        assert_eq!(Fit::from_name("cover"), None);
    }

    #[test]
    fn test_meta_content() {
        let directive = ViewportDirective::new(Size::new(600.0, 400.0), 2.0);
        assert_eq!(
            directive.to_meta_content(),
            "width=600, height=400, initial-scale=2, minimum-scale=2"
        );
    }
}
