//! Room document: the z-ordered drawable list and its patch rules.
//!
//! The relay's authoritative copy and every client replica mutate their
//! list only through [`Document::apply`], so two copies that see the same
//! event sequence end up with the same drawables.

use crate::drawable::{Drawable, DrawableId, Stroke, StrokePoint};
use crate::protocol::{RoomEvent, StrokeSegment};
use serde::{Deserialize, Serialize};

/// Ordered drawables of one room (back to front).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    drawables: Vec<Drawable>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_drawables(drawables: Vec<Drawable>) -> Self {
        Self { drawables }
    }

    /// Drawables in z-order (back to front).
    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Drawable> {
        self.drawables.iter()
    }

    /// Ids in z-order.
    pub fn ids(&self) -> Vec<DrawableId> {
        self.drawables.iter().map(|d| d.id().to_string()).collect()
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Get the number of drawables.
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// Index of a drawable in z-order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.drawables.iter().position(|d| d.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Get a drawable by id.
    pub fn get(&self, id: &str) -> Option<&Drawable> {
        self.drawables.iter().find(|d| d.id() == id)
    }

    /// Get a mutable reference to a drawable by id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Drawable> {
        self.drawables.iter_mut().find(|d| d.id() == id)
    }

    /// Add a drawable on top.
    pub fn push(&mut self, drawable: Drawable) {
        self.drawables.push(drawable);
    }

    /// Add a drawable on top unless one with the same id exists.
    /// Returns true if it was added.
    pub fn insert_if_absent(&mut self, drawable: Drawable) -> bool {
        if self.contains(drawable.id()) {
            return false;
        }
        self.drawables.push(drawable);
        true
    }

    /// Replace the drawable with the same id in place, or add it on top.
    /// Returns true if the document changed.
    pub fn upsert(&mut self, drawable: Drawable) -> bool {
        match self.get_mut(drawable.id()) {
            Some(existing) if *existing == drawable => false,
            Some(existing) => {
                *existing = drawable;
                true
            }
            None => {
                self.drawables.push(drawable);
                true
            }
        }
    }

    /// Remove a drawable by id.
    pub fn remove(&mut self, id: &str) -> Option<Drawable> {
        let pos = self.position(id)?;
        Some(self.drawables.remove(pos))
    }

    /// Replace the whole drawable stored under `id`.
    /// Returns true if the drawable was found.
    pub fn replace(&mut self, id: &str, drawable: Drawable) -> bool {
        match self.get_mut(id) {
            Some(existing) => {
                *existing = drawable;
                true
            }
            None => false,
        }
    }

    /// Swap a stroke's points, keeping its id and owner.
    /// Returns true if a stroke with that id was found.
    pub fn replace_points(&mut self, id: &str, points: Vec<StrokePoint>) -> bool {
        match self.get_mut(id).and_then(Drawable::as_stroke_mut) {
            Some(stroke) => {
                stroke.points = points;
                true
            }
            None => false,
        }
    }

    /// Extend a stroke with one drawn segment.
    ///
    /// The first segment of an unseen stroke creates it, owned by `origin`,
    /// with both segment ends; later segments append only the end point.
    pub fn append_segment(&mut self, origin: &str, segment: &StrokeSegment) -> bool {
        match self.get_mut(&segment.stroke_id) {
            Some(Drawable::Stroke(stroke)) => {
                stroke.push(segment.end());
                true
            }
            Some(_) => false,
            None => {
                let stroke = Stroke::from_points(
                    segment.stroke_id.clone(),
                    origin,
                    vec![segment.start(), segment.end()],
                );
                self.drawables.push(Drawable::Stroke(stroke));
                true
            }
        }
    }

    /// Replace the entire list.
    pub fn replace_all(&mut self, drawables: Vec<Drawable>) {
        self.drawables = drawables;
    }

    /// Clear all drawables.
    pub fn clear(&mut self) {
        self.drawables.clear();
    }

    /// Move a drawable one layer towards the front.
    /// Returns true if it moved, false if already on top or missing.
    pub fn move_up(&mut self, id: &str) -> bool {
        if let Some(pos) = self.position(id) {
            if pos + 1 < self.drawables.len() {
                self.drawables.swap(pos, pos + 1);
                return true;
            }
        }
        false
    }

    /// Move a drawable one layer towards the back.
    /// Returns true if it moved, false if already at the bottom or missing.
    pub fn move_down(&mut self, id: &str) -> bool {
        if let Some(pos) = self.position(id) {
            if pos > 0 {
                self.drawables.swap(pos, pos - 1);
                return true;
            }
        }
        false
    }

    /// Apply one room event sent by `origin`.
    ///
    /// Misses are silent no-ops. Returns true if the list changed.
    pub fn apply(&mut self, origin: &str, event: &RoomEvent) -> bool {
        match event {
            RoomEvent::Drawing(segment) => self.append_segment(origin, segment),
            RoomEvent::StrokeCompleted { stroke, .. } => match stroke {
                Some(stroke) => self.upsert(Drawable::Stroke(stroke.clone())),
                None => false,
            },
            RoomEvent::Undo { stroke_id } | RoomEvent::DeleteStroke { stroke_id } => {
                self.remove(stroke_id).is_some()
            }
            RoomEvent::DeleteElement { element_id } => self.remove(element_id).is_some(),
            RoomEvent::Redo { stroke } | RoomEvent::RestoreStroke { stroke } => {
                self.insert_if_absent(stroke.clone())
            }
            RoomEvent::DuplicateStroke { duplicated_stroke } => {
                self.insert_if_absent(duplicated_stroke.clone())
            }
            RoomEvent::AddElement { element } => self.insert_if_absent(element.clone()),
            RoomEvent::MoveStroke { stroke_id, points }
            | RoomEvent::ChangeStrokeColor { stroke_id, points } => {
                self.replace_points(stroke_id, points.clone())
            }
            RoomEvent::MoveElement { element_id, element }
            | RoomEvent::UpdateElement { element_id, element } => {
                self.replace(element_id, element.clone())
            }
            RoomEvent::LayerChange { drawables } => {
                self.replace_all(drawables.clone());
                true
            }
            RoomEvent::SelectElement { .. } | RoomEvent::DeselectElement { .. } => false,
        }
    }
}
