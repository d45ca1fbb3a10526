//! Image drawable for embedding raster images.

use super::{ConnectionId, DrawableId, DrawableTrait};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Largest width an inserted image is displayed at.
pub const MAX_IMAGE_WIDTH: f64 = 800.0;
/// Largest height an inserted image is displayed at.
pub const MAX_IMAGE_HEIGHT: f64 = 800.0;

/// A placed image. The payload is opaque to the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    pub id: DrawableId,
    pub owner_id: ConnectionId,
    /// Top-left corner.
    pub x: f64,
    pub y: f64,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Image source, usually a `data:` URL.
    pub src: String,
}

impl ImageElement {
    pub fn new(
        id: impl Into<DrawableId>,
        owner_id: impl Into<ConnectionId>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        src: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            x,
            y,
            width,
            height,
            src: src.into(),
        }
    }

    /// Scale natural dimensions down to fit within the maximum display size.
    /// Images that already fit keep their natural size.
    pub fn fit_size(natural_width: f64, natural_height: f64) -> (f64, f64) {
        let mut width = natural_width;
        let mut height = natural_height;
        if width > MAX_IMAGE_WIDTH {
            height *= MAX_IMAGE_WIDTH / width;
            width = MAX_IMAGE_WIDTH;
        }
        if height > MAX_IMAGE_HEIGHT {
            width *= MAX_IMAGE_HEIGHT / height;
            height = MAX_IMAGE_HEIGHT;
        }
        (width, height)
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height.abs() < f64::EPSILON {
            1.0
        } else {
            self.width / self.height
        }
    }

    /// Get the bounding rectangle.
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Decode the bytes of a base64 `data:` URL source.
    /// Returns `None` for any other kind of source.
    pub fn payload_bytes(&self) -> Option<Vec<u8>> {
        use base64::{Engine, engine::general_purpose::STANDARD};

        let rest = self.src.strip_prefix("data:")?;
        let (meta, data) = rest.split_once(',')?;
        if !meta.ends_with(";base64") {
            return None;
        }
        STANDARD.decode(data).ok()
    }
}

impl DrawableTrait for ImageElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_size_downscales_only() {
        assert_eq!(ImageElement::fit_size(400.0, 300.0), (400.0, 300.0));

        let (w, h) = ImageElement::fit_size(1600.0, 800.0);
        assert!((w - 800.0).abs() < f64::EPSILON);
        assert!((h - 400.0).abs() < f64::EPSILON);

        let (w, h) = ImageElement::fit_size(1000.0, 2000.0);
        assert!((w - 400.0).abs() < f64::EPSILON);
        assert!((h - 800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_payload_bytes() {
        let image = ImageElement::new("i", "c", 0.0, 0.0, 1.0, 1.0, "data:image/png;base64,aGVsbG8=");
        assert_eq!(image.payload_bytes(), Some(b"hello".to_vec()));

        let remote = ImageElement::new("i", "c", 0.0, 0.0, 1.0, 1.0, "https://example.com/a.png");
        assert_eq!(remote.payload_bytes(), None);
    }

    #[test]
    fn test_hit_test_with_padding() {
        let image = ImageElement::new("i", "c", 100.0, 100.0, 50.0, 50.0, "");
        assert!(image.hit_test(Point::new(90.0, 90.0), 20.0));
        assert!(!image.hit_test(Point::new(90.0, 90.0), 0.0));
    }
}
