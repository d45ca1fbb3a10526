//! Collaboration management for real-time multi-user editing.
//!
//! [`CollaborationManager`] is the client side of a room. Local gestures
//! are applied to the replica first and queued as outgoing JSON frames;
//! frames from the relay are fed to [`CollaborationManager::handle_message`].
//! The embedding application owns the socket and moves frames both ways.

use kurbo::{Point, Vec2};

use crate::drawable::{
    ConnectionId, Drawable, DrawableId, ImageElement, PenStyle, Stroke, StrokePoint, TextElement,
    TextMeasure, generate_id,
};
use crate::geometry::{self, Corner};
use crate::history::{Action, ActionKind, Direction, History, effect};
use crate::live::LiveBuffer;
use crate::locks::{SelectionError, SelectionLocks};
use crate::protocol::{ClientMessage, RoomEvent, RoomId, ServerMessage, StrokeSegment};
use crate::replica::Replica;

/// Offset applied to duplicated drawables.
pub const DUPLICATE_OFFSET: f64 = 20.0;

/// What an inbound server message changed.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    /// The relay assigned this client its connection id.
    Connected(ConnectionId),
    /// The room snapshot replaced the replica.
    Snapshot { room_id: RoomId, drawables: usize },
    /// A relayed room event. `changed` is false when it was a no-op here.
    Event {
        origin: ConnectionId,
        kind: &'static str,
        changed: bool,
    },
    /// A peer selected or released a drawable.
    Selection {
        peer: ConnectionId,
        element_id: Option<DrawableId>,
    },
}

/// Pointer gesture in progress.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    /// Freehand stroke being drawn by this client.
    Drawing(Stroke),
    Dragging {
        original: Drawable,
        grab_offset: Vec2,
    },
    Resizing {
        original: Drawable,
        corner: Corner,
    },
}

/// Client-side state of one room and the gestures that edit it.
pub struct CollaborationManager {
    /// Connection id assigned by the relay.
    connection_id: Option<ConnectionId>,
    /// Current room ID (if joined).
    current_room: Option<RoomId>,
    replica: Replica,
    /// Peers' unfinished strokes.
    live: LiveBuffer,
    history: History,
    locks: SelectionLocks,
    /// Drawable selected by this client.
    selected: Option<DrawableId>,
    hovered: Option<DrawableId>,
    gesture: Gesture,
    pen: PenStyle,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
}

impl CollaborationManager {
    /// Create a new collaboration manager.
    pub fn new() -> Self {
        Self {
            connection_id: None,
            current_room: None,
            replica: Replica::new(),
            live: LiveBuffer::new(),
            history: History::new(),
            locks: SelectionLocks::new(),
            selected: None,
            hovered: None,
            gesture: Gesture::Idle,
            pen: PenStyle::default(),
            outgoing: Vec::new(),
        }
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Get the current room ID.
    pub fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    /// Check if we're in a room.
    pub fn is_in_room(&self) -> bool {
        self.current_room.is_some()
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Drawables in z-order (back to front).
    pub fn drawables(&self) -> &[Drawable] {
        self.replica.drawables()
    }

    pub fn live(&self) -> &LiveBuffer {
        &self.live
    }

    pub fn locks(&self) -> &SelectionLocks {
        &self.locks
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Stroke this client is drawing right now.
    pub fn current_stroke(&self) -> Option<&Stroke> {
        match &self.gesture {
            Gesture::Drawing(stroke) => Some(stroke),
            _ => None,
        }
    }

    pub fn pen(&self) -> &PenStyle {
        &self.pen
    }

    pub fn set_pen(&mut self, pen: PenStyle) {
        self.pen = pen;
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Room/Connection Management ---

    /// Request to join a room. Local state of any previous room is dropped
    /// and rebuilt from the snapshot the relay answers with.
    pub fn join_room(&mut self, room: &str) {
        self.current_room = Some(room.to_string());
        self.replica.load_snapshot(Vec::new());
        self.live.clear();
        self.history.clear();
        self.locks.clear();
        self.selected = None;
        self.hovered = None;
        self.gesture = Gesture::Idle;
        self.queue(&ClientMessage::JoinRoom { room_id: room.to_string() });
    }

    /// Take pending outgoing messages (drains the queue).
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    /// Check if there are pending outgoing messages.
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    fn queue(&mut self, msg: &ClientMessage) {
        match msg.to_json() {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::warn!("Failed to encode outgoing message: {}", e),
        }
    }

    fn send(&mut self, event: RoomEvent) {
        let Some(room_id) = self.current_room.clone() else {
            log::debug!("Not in a room, dropping {} event", event.name());
            return;
        };
        self.queue(&ClientMessage::Emit { room_id, event });
    }

    fn owner(&self) -> ConnectionId {
        self.connection_id.clone().unwrap_or_default()
    }

    // --- Incoming Message Handling ---

    /// Handle an incoming JSON frame. Malformed frames are logged and dropped.
    pub fn handle_message(&mut self, json: &str) -> Option<RemoteChange> {
        match ServerMessage::from_json(json) {
            Ok(msg) => self.handle_server_message(msg),
            Err(e) => {
                log::warn!("Dropping malformed server message: {}", e);
                None
            }
        }
    }

    /// Handle a decoded server message.
    /// Returns `None` for messages that concern another room.
    pub fn handle_server_message(&mut self, msg: ServerMessage) -> Option<RemoteChange> {
        match msg {
            ServerMessage::Connected { connection_id } => {
                self.replica.set_local_id(connection_id.clone());
                self.connection_id = Some(connection_id.clone());
                Some(RemoteChange::Connected(connection_id))
            }
            ServerMessage::RoomData { room_id, drawables } => {
                if self.current_room.as_deref() != Some(room_id.as_str()) {
                    log::debug!("Ignoring snapshot for room {}", room_id);
                    return None;
                }
                self.replica.load_snapshot(drawables);
                self.live.clear();
                self.forget_missing();
                Some(RemoteChange::Snapshot {
                    room_id,
                    drawables: self.replica.len(),
                })
            }
            ServerMessage::Event { room_id, origin, event } => {
                if self.current_room.as_deref() != Some(room_id.as_str()) {
                    log::debug!("Ignoring {} event for room {}", event.name(), room_id);
                    return None;
                }
                Some(self.apply_remote(origin, event))
            }
        }
    }

    fn apply_remote(&mut self, origin: ConnectionId, event: RoomEvent) -> RemoteChange {
        match &event {
            RoomEvent::SelectElement { element_id } => {
                self.locks.record_select(&origin, element_id);
                return RemoteChange::Selection {
                    peer: origin,
                    element_id: Some(element_id.clone()),
                };
            }
            RoomEvent::DeselectElement { element_id } => {
                // The relay sends a deselect without an id when a peer leaves.
                if element_id.is_none() {
                    let dropped = self.live.drop_author(&origin);
                    if dropped > 0 {
                        log::debug!("Dropped {} unfinished stroke(s) of {}", dropped, origin);
                    }
                }
                let released = self.locks.record_deselect(&origin);
                return RemoteChange::Selection {
                    peer: origin,
                    element_id: released,
                };
            }
            RoomEvent::Drawing(segment) => {
                self.live.push_segment(&origin, segment);
            }
            RoomEvent::StrokeCompleted { stroke_id, .. } => {
                self.live.complete(stroke_id);
            }
            _ => {}
        }

        let changed = self.replica.apply_remote(&origin, &event);
        if changed {
            self.forget_missing();
        }
        RemoteChange::Event {
            origin,
            kind: event.name(),
            changed,
        }
    }

    /// Drop selection, hover and gesture state that points at drawables
    /// which no longer exist. A dropped selection is released to peers.
    fn forget_missing(&mut self) {
        let selection_gone = self
            .selected
            .as_deref()
            .is_some_and(|id| !self.replica.contains(id));
        if selection_gone {
            log::debug!("Selected drawable {:?} was removed", self.selected);
            self.release_selection();
        }
        if let Some(id) = &self.hovered {
            if !self.replica.contains(id) {
                self.hovered = None;
            }
        }
        let orphaned = match &self.gesture {
            Gesture::Dragging { original, .. } | Gesture::Resizing { original, .. } => {
                !self.replica.contains(original.id())
            }
            _ => false,
        };
        if orphaned {
            self.gesture = Gesture::Idle;
        }
    }

    // --- Freehand drawing ---

    /// Start a stroke at `point` with the current pen.
    pub fn begin_stroke(&mut self, point: Point) -> DrawableId {
        let id = generate_id();
        let stroke = Stroke::from_points(
            id.clone(),
            self.owner(),
            vec![StrokePoint::new(point.x, point.y, &self.pen)],
        );
        self.gesture = Gesture::Drawing(stroke);
        id
    }

    /// Extend the stroke being drawn and send the new segment.
    /// Returns false if no stroke is in progress.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        let Gesture::Drawing(stroke) = &mut self.gesture else {
            return false;
        };
        let next = StrokePoint::new(point.x, point.y, &self.pen);
        let segment = match stroke.points.last() {
            Some(last) => StrokeSegment::new(stroke.id.clone(), last, &next),
            None => StrokeSegment::new(stroke.id.clone(), &next, &next),
        };
        stroke.push(next);
        self.send(RoomEvent::Drawing(segment));
        true
    }

    /// Finish the stroke being drawn. Strokes of a single point are discarded.
    /// Returns the id of the committed stroke.
    pub fn finish_stroke(&mut self) -> Option<DrawableId> {
        if !matches!(self.gesture, Gesture::Drawing(_)) {
            return None;
        }
        let Gesture::Drawing(stroke) = std::mem::take(&mut self.gesture) else {
            return None;
        };
        if stroke.len() < 2 {
            log::debug!("Discarding stroke {} with {} point(s)", stroke.id, stroke.len());
            return None;
        }

        let id = stroke.id.clone();
        self.replica.commit(Drawable::Stroke(stroke.clone()));
        self.history.record(Action::Draw { stroke });
        self.send(RoomEvent::StrokeCompleted {
            stroke_id: id.clone(),
            stroke: None,
        });
        Some(id)
    }

    // --- Adding elements ---

    /// Place an image with its top-left corner at `position`, scaled down to
    /// fit the maximum display size.
    pub fn add_image(
        &mut self,
        src: impl Into<String>,
        natural_width: f64,
        natural_height: f64,
        position: Point,
    ) -> DrawableId {
        let (width, height) = ImageElement::fit_size(natural_width, natural_height);
        let image = ImageElement::new(
            generate_id(),
            self.owner(),
            position.x,
            position.y,
            width,
            height,
            src,
        );
        let id = image.id.clone();
        self.perform(Action::AddElement {
            drawable: Drawable::Image(image),
        });
        self.select_new(&id);
        id
    }

    /// Place a text label with its baseline starting at `position`.
    /// Blank text is ignored.
    pub fn add_text(
        &mut self,
        text: &str,
        position: Point,
        colour: &str,
        font_size: f64,
        measure: &dyn TextMeasure,
    ) -> Option<DrawableId> {
        if text.trim().is_empty() {
            return None;
        }
        let element = TextElement::new(generate_id(), self.owner(), position, text, colour, font_size, measure);
        let id = element.id.clone();
        self.perform(Action::AddElement {
            drawable: Drawable::Text(element),
        });
        self.select_new(&id);
        Some(id)
    }

    /// Select a drawable this client just created.
    fn select_new(&mut self, id: &str) {
        if let Err(e) = self.select(id) {
            log::warn!("Could not select new drawable: {}", e);
        }
    }

    // --- Selection ---

    /// Select a drawable by id, telling peers.
    pub fn select(&mut self, id: &str) -> Result<(), SelectionError> {
        if !self.replica.contains(id) {
            return Err(SelectionError::NotFound(id.to_string()));
        }
        if let Err(e) = self.locks.check(id) {
            log::warn!("{}", e);
            return Err(e);
        }
        if self.selected.as_deref() == Some(id) {
            return Ok(());
        }

        self.release_selection();
        self.selected = Some(id.to_string());
        self.send(RoomEvent::SelectElement {
            element_id: id.to_string(),
        });
        Ok(())
    }

    /// Select whatever is under `point`, or clear the selection if nothing is.
    pub fn select_at(&mut self, point: Point) -> Result<Option<DrawableId>, SelectionError> {
        let hit = geometry::hit_test(self.replica.document(), self.selected.as_deref(), point)
            .map(|d| d.id().to_string());
        match hit {
            Some(id) => {
                self.select(&id)?;
                Ok(Some(id))
            }
            None => {
                self.deselect();
                Ok(None)
            }
        }
    }

    /// Clear the selection, telling peers.
    pub fn deselect(&mut self) -> bool {
        let released = self.release_selection();
        self.gesture = Gesture::Idle;
        released
    }

    fn release_selection(&mut self) -> bool {
        match self.selected.take() {
            Some(id) => {
                self.send(RoomEvent::DeselectElement { element_id: Some(id) });
                true
            }
            None => false,
        }
    }

    /// Update the hovered drawable. Returns true if it changed.
    pub fn hover_at(&mut self, point: Point) -> bool {
        let hovered = geometry::hit_test(self.replica.document(), self.selected.as_deref(), point)
            .map(|d| d.id().to_string());
        let changed = hovered != self.hovered;
        self.hovered = hovered;
        changed
    }

    // --- Pointer state machine ---

    /// Start a resize, a drag or a selection change at `point`.
    ///
    /// A corner handle of the selected drawable wins over everything else.
    /// A drawable held by a peer is refused and the local selection released.
    pub fn pointer_down(&mut self, point: Point) -> Result<Option<DrawableId>, SelectionError> {
        if let Some(selected) = self.selected.as_deref().and_then(|id| self.replica.get(id)) {
            if let Some(corner) = geometry::hit_test_handles(selected, point) {
                let id = selected.id().to_string();
                self.gesture = Gesture::Resizing {
                    original: selected.clone(),
                    corner,
                };
                return Ok(Some(id));
            }
        }

        let hit = geometry::hit_test(self.replica.document(), self.selected.as_deref(), point).cloned();
        let Some(drawable) = hit else {
            self.deselect();
            return Ok(None);
        };

        let id = drawable.id().to_string();
        if let Err(e) = self.locks.check(&id) {
            log::warn!("{}", e);
            self.release_selection();
            self.gesture = Gesture::Idle;
            return Err(e);
        }
        if self.selected.as_deref() != Some(id.as_str()) {
            self.release_selection();
            self.selected = Some(id.clone());
            self.send(RoomEvent::SelectElement { element_id: id.clone() });
        }

        let grab_offset = point - drawable.anchor();
        self.gesture = Gesture::Dragging {
            original: drawable,
            grab_offset,
        };
        Ok(Some(id))
    }

    /// Continue the current gesture. While idle this only updates the hover.
    /// Returns true if anything visible changed.
    pub fn pointer_move(&mut self, point: Point) -> bool {
        match self.gesture {
            Gesture::Idle => return self.hover_at(point),
            Gesture::Drawing(_) => return self.extend_stroke(point),
            Gesture::Dragging { .. } | Gesture::Resizing { .. } => {}
        }

        let next = match &self.gesture {
            Gesture::Idle | Gesture::Drawing(_) => None,
            Gesture::Dragging { original, grab_offset } => self
                .replica
                .get(original.id())
                .map(|current| geometry::drag_to(current, *grab_offset, point)),
            Gesture::Resizing { original, corner } => self
                .replica
                .get(original.id())
                .map(|current| geometry::resize(original, current, *corner, point)),
        };

        let Some(next) = next else {
            return false;
        };
        if self.replica.get(next.id()) == Some(&next) {
            return false;
        }
        let event = RoomEvent::replace(&next);
        self.replica.apply_local(&event);
        self.send(event);
        true
    }

    /// End the current gesture, recording it if it changed anything.
    pub fn pointer_up(&mut self) -> Option<ActionKind> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => None,
            Gesture::Drawing(stroke) => {
                self.gesture = Gesture::Drawing(stroke);
                self.finish_stroke().map(|_| ActionKind::Draw)
            }
            Gesture::Dragging { original, .. } => {
                let after = self.replica.get(original.id()).filter(|d| **d != original)?.clone();
                let action = Action::Move { before: original, after };
                let kind = action.kind();
                self.history.record(action);
                Some(kind)
            }
            Gesture::Resizing { original, .. } => {
                let after = self.replica.get(original.id()).filter(|d| **d != original)?.clone();
                let action = Action::Resize { before: original, after };
                let kind = action.kind();
                self.history.record(action);
                Some(kind)
            }
        }
    }

    // --- Edits of the selected drawable ---

    /// Bring the selected drawable one layer forward.
    pub fn move_up(&mut self) -> bool {
        self.reorder(true)
    }

    /// Send the selected drawable one layer back.
    pub fn move_down(&mut self) -> bool {
        self.reorder(false)
    }

    fn reorder(&mut self, up: bool) -> bool {
        let Some(id) = self.selected.clone() else {
            return false;
        };
        let mut reordered = self.replica.document().clone();
        let moved = if up { reordered.move_up(&id) } else { reordered.move_down(&id) };
        if !moved {
            return false;
        }
        self.perform(Action::LayerChange {
            before: self.replica.drawables().to_vec(),
            after: reordered.drawables().to_vec(),
        });
        true
    }

    /// Copy the selected drawable, offset down and right, and select the copy.
    pub fn duplicate_selected(&mut self) -> Option<DrawableId> {
        let mut copy = self.selected_drawable()?.clone();
        let id = generate_id();
        copy.translate(Vec2::new(DUPLICATE_OFFSET, DUPLICATE_OFFSET));
        copy.set_identity(id.clone(), self.owner());
        self.perform(Action::Duplicate { drawable: copy });
        self.select_new(&id);
        Some(id)
    }

    /// Delete the selected drawable and release the selection.
    pub fn delete_selected(&mut self) -> bool {
        let Some(drawable) = self.selected_drawable().cloned() else {
            return false;
        };
        self.perform(Action::Delete { drawable });
        self.release_selection();
        self.gesture = Gesture::Idle;
        true
    }

    /// Recolour the selected stroke or text. Images have no colour.
    pub fn change_selected_colour(&mut self, colour: &str) -> bool {
        let Some(before) = self.selected_drawable().cloned() else {
            return false;
        };
        let mut after = before.clone();
        match &mut after {
            Drawable::Stroke(stroke) => stroke.set_colour(colour),
            Drawable::Text(text) => text.colour = colour.to_string(),
            Drawable::Image(_) => return false,
        }
        if after == before {
            return false;
        }
        self.perform(Action::ColorChange { before, after });
        true
    }

    fn selected_drawable(&self) -> Option<&Drawable> {
        self.selected.as_deref().and_then(|id| self.replica.get(id))
    }

    /// Apply a new action locally, send it and record it.
    fn perform(&mut self, action: Action) {
        let event = effect(&action, Direction::Forward);
        self.replica.apply_local(&event);
        self.send(event);
        self.history.record(action);
    }

    // --- Undo/Redo ---

    /// Undo the last local change.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(&mut self.replica) {
            Some(event) => {
                self.send(event);
                self.forget_missing();
                true
            }
            None => false,
        }
    }

    /// Redo the last undone change.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(&mut self.replica) {
            Some(event) => {
                self.send(event);
                self.forget_missing();
                true
            }
            None => false,
        }
    }
}

impl Default for CollaborationManager {
    fn default() -> Self {
        Self::new()
    }
}
