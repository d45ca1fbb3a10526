//! Drawable definitions for the shared whiteboard.

mod image;
mod stroke;
mod text;

pub use image::{ImageElement, MAX_IMAGE_HEIGHT, MAX_IMAGE_WIDTH};
pub use stroke::{PenStyle, Stroke, StrokePoint};
pub use text::{DEFAULT_FONT_SIZE, FallbackMeasure, TextElement, TextMeasure};

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identifier of a drawable, unique within a room.
pub type DrawableId = String;

/// Identifier the relay assigns to one client connection.
pub type ConnectionId = String;

/// Length of the random part of a generated id.
const ID_SUFFIX_LEN: usize = 9;

/// Generate a new drawable id from the current time and a random suffix.
///
/// Uniqueness is probabilistic: two clients generating an id in the same
/// millisecond only collide if the random suffixes match too.
pub fn generate_id() -> DrawableId {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", millis, &random[..ID_SUFFIX_LEN])
}

/// Common trait for all drawables.
pub trait DrawableTrait {
    /// Get the identifier.
    fn id(&self) -> &str;

    /// Get the connection id of the client that created this drawable.
    fn owner_id(&self) -> &str;

    /// Get the axis-aligned bounding box.
    fn bounds(&self) -> Rect;

    /// Reference point used when dragging.
    fn anchor(&self) -> Point;

    /// Move the drawable by an offset.
    fn translate(&mut self, delta: Vec2);

    /// Check if a point falls inside the bounding box grown by `padding`.
    fn hit_test(&self, point: Point, padding: f64) -> bool {
        self.bounds().inflate(padding, padding).contains(point)
    }
}

/// Enum wrapper for all drawable kinds, in the shape they travel on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Drawable {
    Stroke(Stroke),
    Image(ImageElement),
    Text(TextElement),
}

impl Drawable {
    pub fn id(&self) -> &str {
        match self {
            Drawable::Stroke(d) => d.id(),
            Drawable::Image(d) => d.id(),
            Drawable::Text(d) => d.id(),
        }
    }

    pub fn owner_id(&self) -> &str {
        match self {
            Drawable::Stroke(d) => d.owner_id(),
            Drawable::Image(d) => d.owner_id(),
            Drawable::Text(d) => d.owner_id(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Drawable::Stroke(d) => d.bounds(),
            Drawable::Image(d) => d.bounds(),
            Drawable::Text(d) => d.bounds(),
        }
    }

    pub fn anchor(&self) -> Point {
        match self {
            Drawable::Stroke(d) => d.anchor(),
            Drawable::Image(d) => d.anchor(),
            Drawable::Text(d) => d.anchor(),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Drawable::Stroke(d) => d.translate(delta),
            Drawable::Image(d) => d.translate(delta),
            Drawable::Text(d) => d.translate(delta),
        }
    }

    pub fn hit_test(&self, point: Point, padding: f64) -> bool {
        match self {
            Drawable::Stroke(d) => d.hit_test(point, padding),
            Drawable::Image(d) => d.hit_test(point, padding),
            Drawable::Text(d) => d.hit_test(point, padding),
        }
    }

    /// Short name of the drawable kind, as used in the `type` tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Drawable::Stroke(_) => "stroke",
            Drawable::Image(_) => "image",
            Drawable::Text(_) => "text",
        }
    }

    pub fn is_stroke(&self) -> bool {
        matches!(self, Drawable::Stroke(_))
    }

    pub fn as_stroke(&self) -> Option<&Stroke> {
        match self {
            Drawable::Stroke(stroke) => Some(stroke),
            _ => None,
        }
    }

    pub fn as_stroke_mut(&mut self) -> Option<&mut Stroke> {
        match self {
            Drawable::Stroke(stroke) => Some(stroke),
            _ => None,
        }
    }

    /// Re-key this drawable under a new id and owner.
    pub fn set_identity(&mut self, id: DrawableId, owner_id: ConnectionId) {
        match self {
            Drawable::Stroke(d) => {
                d.id = id;
                d.owner_id = owner_id;
            }
            Drawable::Image(d) => {
                d.id = id;
                d.owner_id = owner_id;
            }
            Drawable::Text(d) => {
                d.id = id;
                d.owner_id = owner_id;
            }
        }
    }
}

impl From<Stroke> for Drawable {
    fn from(stroke: Stroke) -> Self {
        Drawable::Stroke(stroke)
    }
}

impl From<ImageElement> for Drawable {
    fn from(image: ImageElement) -> Self {
        Drawable::Image(image)
    }
}

impl From<TextElement> for Drawable {
    fn from(text: TextElement) -> Self {
        Drawable::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<u128>().is_ok());
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert_ne!(generate_id(), id);
    }

    #[test]
    fn test_drawable_json_tag() {
        let image = ImageElement::new("img-1", "peer-a", 10.0, 20.0, 30.0, 40.0, "data:,x");
        let json = serde_json::to_value(Drawable::from(image)).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["ownerId"], "peer-a");
        assert_eq!(json["width"], 30.0);
    }

    #[test]
    fn test_stroke_from_wire() {
        let json = r##"{"type":"stroke","id":"s1","ownerId":"c1","points":[
            {"x":1.0,"y":2.0,"colour":"#000000","tool":"pen","brushSize":5.0}
        ]}"##;
        let drawable: Drawable = serde_json::from_str(json).unwrap();
        match drawable {
            Drawable::Stroke(stroke) => {
                assert_eq!(stroke.id, "s1");
                assert_eq!(stroke.points.len(), 1);
                assert!((stroke.points[0].brush_size - 5.0).abs() < f64::EPSILON);
            }
            _ => panic!("Expected Stroke drawable"),
        }
    }

    #[test]
    fn test_set_identity() {
        let mut drawable = Drawable::from(Stroke::new("s1", "c1"));
        drawable.set_identity("s2".to_string(), "c2".to_string());
        assert_eq!(drawable.id(), "s2");
        assert_eq!(drawable.owner_id(), "c2");
    }

    #[test]
    fn test_translate_delegates() {
        let mut drawable = Drawable::from(ImageElement::new("i", "c", 0.0, 0.0, 10.0, 10.0, ""));
        drawable.translate(Vec2::new(5.0, -5.0));
        let bounds = drawable.bounds();
        assert!((bounds.x0 - 5.0).abs() < f64::EPSILON);
        assert!((bounds.y0 + 5.0).abs() < f64::EPSILON);
    }
}
