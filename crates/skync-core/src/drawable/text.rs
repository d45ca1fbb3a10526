//! Text drawable.

use super::{ConnectionId, DrawableId, DrawableTrait};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Font size used for newly placed text.
pub const DEFAULT_FONT_SIZE: f64 = 24.0;

/// Average glyph advance relative to font size, used when no metrics are available.
const FALLBACK_ADVANCE: f64 = 0.6;

/// Measures rendered text width. Text metrics belong to the embedding renderer.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f64) -> f64;
}

/// Estimates width from character count.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackMeasure;

impl TextMeasure for FallbackMeasure {
    fn measure(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * FALLBACK_ADVANCE
    }
}

/// A text label. `(x, y)` is the left end of the baseline, so the box
/// extends upwards from `y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub id: DrawableId,
    pub owner_id: ConnectionId,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub colour: String,
    pub font_size: f64,
    pub width: f64,
    pub height: f64,
    /// Width as first measured, before any resize.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_font_size: Option<f64>,
}

impl TextElement {
    /// Create a text element measured at its initial font size.
    pub fn new(
        id: impl Into<DrawableId>,
        owner_id: impl Into<ConnectionId>,
        position: Point,
        text: impl Into<String>,
        colour: impl Into<String>,
        font_size: f64,
        measure: &dyn TextMeasure,
    ) -> Self {
        let text = text.into();
        let width = measure.measure(&text, font_size);
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            x: position.x,
            y: position.y,
            text,
            colour: colour.into(),
            font_size,
            width,
            height: font_size,
            original_width: Some(width),
            original_height: Some(font_size),
            original_font_size: Some(font_size),
        }
    }

    /// Size the text had before any resize, falling back to the current
    /// size and finally to an estimate from the character count.
    pub fn unscaled_size(&self) -> (f64, f64) {
        let width = self
            .original_width
            .filter(|w| *w > 0.0)
            .or(Some(self.width).filter(|w| *w > 0.0))
            .unwrap_or_else(|| FallbackMeasure.measure(&self.text, self.font_size));
        let height = self
            .original_height
            .filter(|h| *h > 0.0)
            .or(Some(self.height).filter(|h| *h > 0.0))
            .unwrap_or(self.font_size);
        (width, height)
    }

    /// Font size before any resize.
    pub fn unscaled_font_size(&self) -> f64 {
        self.original_font_size.unwrap_or(self.font_size)
    }
}

impl DrawableTrait for TextElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y - self.height, self.x + self.width, self.y)
    }

    fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }
}
