//! Local undo/redo history.
//!
//! Actions never leave the client. What peers see is the room event that
//! [`effect`] derives for a direction, applied locally and sent the same way.

use crate::drawable::{Drawable, Stroke};
use crate::protocol::RoomEvent;
use crate::replica::Replica;

/// Kind of an undoable edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Draw,
    Move,
    Resize,
    ColorChange,
    LayerChange,
    Duplicate,
    Delete,
    AddElement,
}

/// An invertible local edit. Snapshots are owned copies, so later edits to
/// the live drawable never reach them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Draw { stroke: Stroke },
    Move { before: Drawable, after: Drawable },
    Resize { before: Drawable, after: Drawable },
    ColorChange { before: Drawable, after: Drawable },
    LayerChange { before: Vec<Drawable>, after: Vec<Drawable> },
    Duplicate { drawable: Drawable },
    Delete { drawable: Drawable },
    AddElement { drawable: Drawable },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Draw { .. } => ActionKind::Draw,
            Action::Move { .. } => ActionKind::Move,
            Action::Resize { .. } => ActionKind::Resize,
            Action::ColorChange { .. } => ActionKind::ColorChange,
            Action::LayerChange { .. } => ActionKind::LayerChange,
            Action::Duplicate { .. } => ActionKind::Duplicate,
            Action::Delete { .. } => ActionKind::Delete,
            Action::AddElement { .. } => ActionKind::AddElement,
        }
    }

    /// The drawable the action is about. Layer changes touch the whole list.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Action::Draw { stroke } => Some(&stroke.id),
            Action::Move { after, .. } | Action::Resize { after, .. } | Action::ColorChange { after, .. } => {
                Some(after.id())
            }
            Action::Duplicate { drawable } | Action::Delete { drawable } | Action::AddElement { drawable } => {
                Some(drawable.id())
            }
            Action::LayerChange { .. } => None,
        }
    }
}

/// Which way an action is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Undo: restore the state before the action.
    Backward,
    /// Redo: restore the state after the action.
    Forward,
}

/// The room event that replays `action` in `direction`.
pub fn effect(action: &Action, direction: Direction) -> RoomEvent {
    use Direction::{Backward, Forward};

    match (action, direction) {
        (Action::Draw { stroke }, Backward) => RoomEvent::Undo { stroke_id: stroke.id.clone() },
        (Action::Draw { stroke }, Forward) => RoomEvent::Redo { stroke: Drawable::Stroke(stroke.clone()) },

        (Action::Move { before, .. } | Action::Resize { before, .. }, Backward) => RoomEvent::replace(before),
        (Action::Move { after, .. } | Action::Resize { after, .. }, Forward) => RoomEvent::replace(after),

        (Action::ColorChange { before, .. }, Backward) => recolour(before),
        (Action::ColorChange { after, .. }, Forward) => recolour(after),

        (Action::LayerChange { before, .. }, Backward) => RoomEvent::LayerChange { drawables: before.clone() },
        (Action::LayerChange { after, .. }, Forward) => RoomEvent::LayerChange { drawables: after.clone() },

        (Action::Duplicate { drawable } | Action::AddElement { drawable }, Backward) => RoomEvent::delete(drawable),
        (Action::Duplicate { drawable }, Forward) if drawable.is_stroke() => RoomEvent::DuplicateStroke {
            duplicated_stroke: drawable.clone(),
        },
        (Action::Duplicate { drawable } | Action::AddElement { drawable }, Forward) => RoomEvent::AddElement {
            element: drawable.clone(),
        },

        (Action::Delete { drawable }, Backward) => RoomEvent::RestoreStroke { stroke: drawable.clone() },
        (Action::Delete { drawable }, Forward) => RoomEvent::delete(drawable),
    }
}

fn recolour(snapshot: &Drawable) -> RoomEvent {
    match snapshot {
        Drawable::Stroke(stroke) => RoomEvent::ChangeStrokeColor {
            stroke_id: stroke.id.clone(),
            points: stroke.points.clone(),
        },
        _ => RoomEvent::replace(snapshot),
    }
}

/// Undo and redo stacks of one client.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo_stack: Vec<Action>,
    redo_stack: Vec<Action>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new action. Anything previously undone can no longer be redone.
    pub fn record(&mut self, action: Action) {
        log::debug!("Recorded {:?} action", action.kind());
        self.undo_stack.push(action);
        self.redo_stack.clear();
    }

    /// Undo the last action on `replica`.
    /// Returns the event to send, or `None` if there was nothing to undo.
    pub fn undo(&mut self, replica: &mut Replica) -> Option<RoomEvent> {
        let action = self.undo_stack.pop()?;
        let event = effect(&action, Direction::Backward);
        replica.apply_local(&event);
        self.redo_stack.push(action);
        Some(event)
    }

    /// Redo the last undone action on `replica`.
    /// Returns the event to send, or `None` if there was nothing to redo.
    pub fn redo(&mut self, replica: &mut Replica) -> Option<RoomEvent> {
        let action = self.redo_stack.pop()?;
        let event = effect(&action, Direction::Forward);
        replica.apply_local(&event);
        self.undo_stack.push(action);
        Some(event)
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Most recent undoable action.
    pub fn last(&self) -> Option<&Action> {
        self.undo_stack.last()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
