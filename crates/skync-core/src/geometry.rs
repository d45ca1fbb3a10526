//! Bounding boxes, hit testing and corner-handle resizing.

use crate::document::Document;
use crate::drawable::{Drawable, DrawableTrait, ImageElement, Stroke, TextElement};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Margin added around a drawable's box when hit testing.
pub const BOUNDING_BOX_PADDING: f64 = 20.0;
/// A pointer closer than this on both axes grabs a corner handle.
pub const HANDLE_TOLERANCE: f64 = 8.0;
/// Narrowest an image can be resized to.
pub const MIN_IMAGE_WIDTH: f64 = 20.0;
pub const MIN_TEXT_WIDTH: f64 = 20.0;
pub const MIN_TEXT_HEIGHT: f64 = 10.0;
/// Smallest font a resized text keeps.
pub const MIN_FONT_SIZE: f64 = 8.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Where this corner sits on a box.
    pub fn position(self, bounds: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(bounds.x0, bounds.y0),
            Corner::TopRight => Point::new(bounds.x1, bounds.y0),
            Corner::BottomLeft => Point::new(bounds.x0, bounds.y1),
            Corner::BottomRight => Point::new(bounds.x1, bounds.y1),
        }
    }
}

/// A resize handle with its position and corner.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    /// Position in canvas coordinates.
    pub position: Point,
    pub corner: Corner,
}

impl Handle {
    pub fn new(position: Point, corner: Corner) -> Self {
        Self { position, corner }
    }

    /// Check if a point lies within `tolerance` of this handle on both axes.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point.x - self.position.x).abs() < tolerance && (point.y - self.position.y).abs() < tolerance
    }
}

/// Axis-aligned box of a drawable. Strokes use the extent of their points.
pub fn bounding_box(drawable: &Drawable) -> Rect {
    drawable.bounds()
}

/// The four corner handles of a drawable.
pub fn handles(drawable: &Drawable) -> [Handle; 4] {
    let bounds = drawable.bounds();
    Corner::ALL.map(|corner| Handle::new(corner.position(bounds), corner))
}

/// Find the corner handle under the pointer, if any.
pub fn hit_test_handles(drawable: &Drawable, point: Point) -> Option<Corner> {
    handles(drawable)
        .iter()
        .find(|handle| handle.hit_test(point, HANDLE_TOLERANCE))
        .map(|handle| handle.corner)
}

/// Find the drawable under a point.
///
/// The selected drawable is tried first so it stays grabbable while covered
/// by later drawables. Otherwise drawables are scanned front to back.
pub fn hit_test<'a>(document: &'a Document, selected: Option<&str>, point: Point) -> Option<&'a Drawable> {
    if let Some(drawable) = selected.and_then(|id| document.get(id)) {
        if drawable.hit_test(point, BOUNDING_BOX_PADDING) {
            return Some(drawable);
        }
    }

    document
        .iter()
        .rev()
        .find(|drawable| drawable.hit_test(point, BOUNDING_BOX_PADDING))
}

/// Move a drawable so its anchor sits at `pointer - grab_offset`.
pub fn drag_to(current: &Drawable, grab_offset: Vec2, pointer: Point) -> Drawable {
    let target = pointer - grab_offset;
    let mut moved = current.clone();
    moved.translate(target - current.anchor());
    moved
}

/// Resize a drawable by dragging one of its corners to `pointer`.
///
/// `original` is the drawable as it was when the drag started and `current`
/// its latest state. Images grow from their current size, text scales
/// against its unscaled size and strokes scale from the original points.
pub fn resize(original: &Drawable, current: &Drawable, corner: Corner, pointer: Point) -> Drawable {
    match (original, current) {
        (_, Drawable::Image(image)) => Drawable::Image(resize_image(image, corner, pointer)),
        (_, Drawable::Text(text)) => Drawable::Text(resize_text(text, corner, pointer)),
        (Drawable::Stroke(original), Drawable::Stroke(_)) => {
            Drawable::Stroke(resize_stroke(original, pointer))
        }
        (_, Drawable::Stroke(_)) => current.clone(),
    }
}

/// Uniform image scale, keeping the aspect ratio, anchored at the opposite corner.
pub fn resize_image(image: &ImageElement, corner: Corner, pointer: Point) -> ImageElement {
    let mut resized = image.clone();
    if image.width <= 0.0 || image.height <= 0.0 {
        return resized;
    }

    let right = image.x + image.width;
    let bottom = image.y + image.height;
    let (dx, dy) = match corner {
        Corner::BottomRight => (pointer.x - right, pointer.y - bottom),
        Corner::TopRight => (pointer.x - right, image.y - pointer.y),
        Corner::BottomLeft => (image.x - pointer.x, pointer.y - bottom),
        Corner::TopLeft => (image.x - pointer.x, image.y - pointer.y),
    };
    let factor = (dx / image.width).max(dy / image.height);

    let width = (image.width * (1.0 + factor)).max(MIN_IMAGE_WIDTH);
    let height = width / image.aspect_ratio();

    if matches!(corner, Corner::TopLeft | Corner::BottomLeft) {
        resized.x = right - width;
    }
    if matches!(corner, Corner::TopLeft | Corner::TopRight) {
        resized.y = bottom - height;
    }
    resized.width = width;
    resized.height = height;
    resized
}

/// Uniform text scale relative to the unscaled size. The font follows the box.
pub fn resize_text(text: &TextElement, corner: Corner, pointer: Point) -> TextElement {
    let (unscaled_width, unscaled_height) = text.unscaled_size();
    if unscaled_width <= 0.0 || unscaled_height <= 0.0 {
        return text.clone();
    }
    let current_width = if text.width > 0.0 { text.width } else { unscaled_width };
    let current_height = if text.height > 0.0 { text.height } else { unscaled_height };

    let left = text.x;
    let right = text.x + current_width;
    let top = text.y - current_height;
    let bottom = text.y;

    let width = match corner {
        Corner::BottomRight | Corner::TopRight => (pointer.x - left).max(MIN_TEXT_WIDTH),
        Corner::BottomLeft | Corner::TopLeft => (right - pointer.x).max(MIN_TEXT_WIDTH),
    };
    let height = match corner {
        Corner::BottomRight | Corner::BottomLeft => (pointer.y - top).max(MIN_TEXT_HEIGHT),
        Corner::TopRight | Corner::TopLeft => {
            let new_top = pointer.y.min(bottom - MIN_TEXT_HEIGHT);
            (bottom - new_top).max(MIN_TEXT_HEIGHT)
        }
    };

    let scale = (width / unscaled_width).max(height / unscaled_height);
    let final_width = unscaled_width * scale;
    let final_height = unscaled_height * scale;

    let (x, y) = match corner {
        Corner::BottomRight => (left, top + final_height),
        Corner::BottomLeft => (right - final_width, top + final_height),
        Corner::TopRight => (left, bottom),
        Corner::TopLeft => (right - final_width, bottom),
    };

    let mut resized = text.clone();
    resized.x = x;
    resized.y = y;
    resized.width = final_width;
    resized.height = final_height;
    resized.font_size = (text.unscaled_font_size() * scale).max(MIN_FONT_SIZE);
    resized.original_width = Some(unscaled_width);
    resized.original_height = Some(unscaled_height);
    resized.original_font_size = Some(text.unscaled_font_size());
    resized
}

/// Radial stroke scale about the centre of the original box.
///
/// The factor is the pointer's distance from the centre over the box
/// half-extent, taking whichever axis gives the larger ratio.
pub fn resize_stroke(original: &Stroke, pointer: Point) -> Stroke {
    let bounds = original.bounds();
    let center = bounds.center();
    let half_width = bounds.x1 - center.x;
    let half_height = bounds.y1 - center.y;

    let ratio = |distance: f64, half: f64| {
        if half > f64::EPSILON { Some(distance.abs() / half) } else { None }
    };
    let scale = match (
        ratio(pointer.x - center.x, half_width),
        ratio(pointer.y - center.y, half_height),
    ) {
        (Some(sx), Some(sy)) => sx.max(sy),
        (Some(s), None) | (None, Some(s)) => s,
        (None, None) => return original.clone(),
    };

    let mut resized = original.clone();
    resized.transform(
        Affine::translate(center.to_vec2()) * Affine::scale(scale) * Affine::translate(-center.to_vec2()),
    );
    resized
}
