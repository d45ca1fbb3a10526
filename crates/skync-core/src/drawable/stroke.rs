//! Freehand stroke drawable.

use super::{ConnectionId, DrawableId, DrawableTrait};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// One sample of a freehand stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    /// CSS colour string.
    pub colour: String,
    /// Tool that produced the sample ("pen", ...).
    pub tool: String,
    pub brush_size: f64,
}

impl StrokePoint {
    pub fn new(x: f64, y: f64, style: &PenStyle) -> Self {
        Self {
            x,
            y,
            colour: style.colour.clone(),
            tool: style.tool.clone(),
            brush_size: style.brush_size,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Pen settings captured with every stroke sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PenStyle {
    pub colour: String,
    pub tool: String,
    pub brush_size: f64,
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            colour: "#000000".to_string(),
            tool: "pen".to_string(),
            brush_size: 5.0,
        }
    }
}

/// A freehand stroke (ordered series of samples).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: DrawableId,
    pub owner_id: ConnectionId,
    #[serde(default)]
    pub points: Vec<StrokePoint>,
}

impl Stroke {
    /// Create a new empty stroke.
    pub fn new(id: impl Into<DrawableId>, owner_id: impl Into<ConnectionId>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            points: Vec::new(),
        }
    }

    /// Create from existing points.
    pub fn from_points(
        id: impl Into<DrawableId>,
        owner_id: impl Into<ConnectionId>,
        points: Vec<StrokePoint>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            points,
        }
    }

    /// Add a point to the path.
    pub fn push(&mut self, point: StrokePoint) {
        self.points.push(point);
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Recolour every point.
    pub fn set_colour(&mut self, colour: &str) {
        for point in &mut self.points {
            point.colour = colour.to_string();
        }
    }

    /// Map every point through an affine transform.
    pub fn transform(&mut self, affine: Affine) {
        for point in &mut self.points {
            let moved = affine * point.position();
            point.x = moved.x;
            point.y = moved.y;
        }
    }
}

impl DrawableTrait for Stroke {
    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn bounds(&self) -> Rect {
        if self.points.is_empty() {
            return Rect::ZERO;
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;

        for point in &self.points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Rect::new(min_x, min_y, max_x, max_y)
    }

    /// The first sample, so a dragged stroke follows the pointer from where it started.
    fn anchor(&self) -> Point {
        self.points.first().map(StrokePoint::position).unwrap_or(Point::ZERO)
    }

    fn translate(&mut self, delta: Vec2) {
        self.transform(Affine::translate(delta));
    }
}
