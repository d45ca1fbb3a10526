//! Wire protocol shared by the relay server and clients.
//!
//! Every frame is a JSON text message. Clients send [`ClientMessage`]s, the
//! server answers with [`ServerMessage`]s. Room mutations travel as
//! [`RoomEvent`]s:
//!
//! ```json
//! { "type": "join-room", "roomId": "lobby" }
//! { "type": "emit", "roomId": "lobby", "event": { "kind": "undo", "payload": { "strokeId": "1700000000000-a1b2c3d4e" } } }
//! { "type": "event", "roomId": "lobby", "origin": "<connection id>", "event": { ... } }
//! ```

use crate::drawable::{ConnectionId, Drawable, DrawableId, PenStyle, Stroke, StrokePoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque room identifier.
pub type RoomId = String;

/// Errors produced while encoding or decoding protocol frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Who receives the rebroadcast of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastScope {
    /// Every peer in the room, the sender included.
    IncludeSender,
    /// Every peer in the room except the sender.
    ExcludeSender,
}

/// One pointer-move step of a stroke being drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeSegment {
    pub stroke_id: DrawableId,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub colour: String,
    pub tool: String,
    pub brush_size: f64,
}

impl StrokeSegment {
    pub fn new(stroke_id: impl Into<DrawableId>, from: &StrokePoint, to: &StrokePoint) -> Self {
        Self {
            stroke_id: stroke_id.into(),
            x0: from.x,
            y0: from.y,
            x1: to.x,
            y1: to.y,
            colour: to.colour.clone(),
            tool: to.tool.clone(),
            brush_size: to.brush_size,
        }
    }

    fn style(&self) -> PenStyle {
        PenStyle {
            colour: self.colour.clone(),
            tool: self.tool.clone(),
            brush_size: self.brush_size,
        }
    }

    pub fn start(&self) -> StrokePoint {
        StrokePoint::new(self.x0, self.y0, &self.style())
    }

    pub fn end(&self) -> StrokePoint {
        StrokePoint::new(self.x1, self.y1, &self.style())
    }
}

/// A mutation (or selection notice) scoped to one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum RoomEvent {
    /// Extend a stroke in progress, creating it on first sight.
    Drawing(StrokeSegment),
    /// The author released the pointer. The server attaches its copy of the stroke.
    #[serde(rename_all = "camelCase")]
    StrokeCompleted {
        stroke_id: DrawableId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stroke: Option<Stroke>,
    },
    /// Take back a drawn stroke.
    #[serde(rename_all = "camelCase")]
    Undo { stroke_id: DrawableId },
    /// Put back a previously undone stroke.
    #[serde(rename_all = "camelCase")]
    Redo { stroke: Drawable },
    #[serde(rename_all = "camelCase")]
    MoveStroke {
        stroke_id: DrawableId,
        points: Vec<StrokePoint>,
    },
    #[serde(rename_all = "camelCase")]
    MoveElement {
        element_id: DrawableId,
        element: Drawable,
    },
    #[serde(rename_all = "camelCase")]
    UpdateElement {
        element_id: DrawableId,
        element: Drawable,
    },
    #[serde(rename_all = "camelCase")]
    AddElement { element: Drawable },
    #[serde(rename_all = "camelCase")]
    DeleteElement { element_id: DrawableId },
    #[serde(rename_all = "camelCase")]
    DeleteStroke { stroke_id: DrawableId },
    #[serde(rename_all = "camelCase")]
    RestoreStroke { stroke: Drawable },
    #[serde(rename_all = "camelCase")]
    DuplicateStroke { duplicated_stroke: Drawable },
    /// Replace the whole z-ordered list.
    #[serde(rename_all = "camelCase")]
    LayerChange { drawables: Vec<Drawable> },
    #[serde(rename_all = "camelCase")]
    ChangeStrokeColor {
        stroke_id: DrawableId,
        points: Vec<StrokePoint>,
    },
    #[serde(rename_all = "camelCase")]
    SelectElement { element_id: DrawableId },
    /// Drop whatever the origin had selected.
    #[serde(rename_all = "camelCase")]
    DeselectElement {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element_id: Option<DrawableId>,
    },
}

impl RoomEvent {
    /// Events confirming an action the sender already rendered are echoed
    /// back to it; everything else skips the sender.
    pub fn scope(&self) -> BroadcastScope {
        match self {
            RoomEvent::StrokeCompleted { .. } | RoomEvent::Redo { .. } => BroadcastScope::IncludeSender,
            RoomEvent::Drawing(_)
            | RoomEvent::Undo { .. }
            | RoomEvent::MoveStroke { .. }
            | RoomEvent::MoveElement { .. }
            | RoomEvent::UpdateElement { .. }
            | RoomEvent::AddElement { .. }
            | RoomEvent::DeleteElement { .. }
            | RoomEvent::DeleteStroke { .. }
            | RoomEvent::RestoreStroke { .. }
            | RoomEvent::DuplicateStroke { .. }
            | RoomEvent::LayerChange { .. }
            | RoomEvent::ChangeStrokeColor { .. }
            | RoomEvent::SelectElement { .. }
            | RoomEvent::DeselectElement { .. } => BroadcastScope::ExcludeSender,
        }
    }

    /// Event name as it appears in the `kind` tag.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::Drawing(_) => "drawing",
            RoomEvent::StrokeCompleted { .. } => "stroke-completed",
            RoomEvent::Undo { .. } => "undo",
            RoomEvent::Redo { .. } => "redo",
            RoomEvent::MoveStroke { .. } => "move-stroke",
            RoomEvent::MoveElement { .. } => "move-element",
            RoomEvent::UpdateElement { .. } => "update-element",
            RoomEvent::AddElement { .. } => "add-element",
            RoomEvent::DeleteElement { .. } => "delete-element",
            RoomEvent::DeleteStroke { .. } => "delete-stroke",
            RoomEvent::RestoreStroke { .. } => "restore-stroke",
            RoomEvent::DuplicateStroke { .. } => "duplicate-stroke",
            RoomEvent::LayerChange { .. } => "layer-change",
            RoomEvent::ChangeStrokeColor { .. } => "change-stroke-color",
            RoomEvent::SelectElement { .. } => "select-element",
            RoomEvent::DeselectElement { .. } => "deselect-element",
        }
    }

    /// Id of the single drawable this event is about, if any.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            RoomEvent::Drawing(segment) => Some(&segment.stroke_id),
            RoomEvent::StrokeCompleted { stroke_id, .. }
            | RoomEvent::Undo { stroke_id }
            | RoomEvent::MoveStroke { stroke_id, .. }
            | RoomEvent::DeleteStroke { stroke_id }
            | RoomEvent::ChangeStrokeColor { stroke_id, .. } => Some(stroke_id),
            RoomEvent::MoveElement { element_id, .. }
            | RoomEvent::UpdateElement { element_id, .. }
            | RoomEvent::DeleteElement { element_id }
            | RoomEvent::SelectElement { element_id } => Some(element_id),
            RoomEvent::Redo { stroke } | RoomEvent::RestoreStroke { stroke } => Some(stroke.id()),
            RoomEvent::AddElement { element } => Some(element.id()),
            RoomEvent::DuplicateStroke { duplicated_stroke } => Some(duplicated_stroke.id()),
            RoomEvent::DeselectElement { element_id } => element_id.as_deref(),
            RoomEvent::LayerChange { .. } => None,
        }
    }

    /// Event that replaces a drawable with `drawable`, in the form its kind travels.
    pub fn replace(drawable: &Drawable) -> Self {
        match drawable {
            Drawable::Stroke(stroke) => RoomEvent::MoveStroke {
                stroke_id: stroke.id.clone(),
                points: stroke.points.clone(),
            },
            _ => RoomEvent::MoveElement {
                element_id: drawable.id().to_string(),
                element: drawable.clone(),
            },
        }
    }

    /// Event that removes `drawable`, in the form its kind travels.
    pub fn delete(drawable: &Drawable) -> Self {
        let id = drawable.id().to_string();
        if drawable.is_stroke() {
            RoomEvent::DeleteStroke { stroke_id: id }
        } else {
            RoomEvent::DeleteElement { element_id: id }
        }
    }
}

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Join a room and ask for its snapshot.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId },
    /// Publish an event to a room.
    #[serde(rename_all = "camelCase")]
    Emit { room_id: RoomId, event: RoomEvent },
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Sent once after the socket opens.
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },
    /// Full room state, sent in answer to a join.
    #[serde(rename_all = "camelCase")]
    RoomData {
        room_id: RoomId,
        drawables: Vec<Drawable>,
    },
    /// An event relayed from `origin`.
    #[serde(rename_all = "camelCase")]
    Event {
        room_id: RoomId,
        origin: ConnectionId,
        event: RoomEvent,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::JoinRoom { room_id: "test-room".to_string() };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"join-room""#));
        assert!(json.contains(r#""roomId":"test-room""#));
    }

    #[test]
    fn test_event_wire_shape() {
        let msg = ClientMessage::Emit {
            room_id: "r".to_string(),
            event: RoomEvent::SelectElement { element_id: "e1".to_string() },
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"]["kind"], "select-element");
        assert_eq!(value["event"]["payload"]["elementId"], "e1");
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r#"{"type":"event","roomId":"r","origin":"c1","event":{"kind":"undo","payload":{"strokeId":"s1"}}}"#;
        let msg = ServerMessage::from_json(json).unwrap();
        match msg {
            ServerMessage::Event { origin, event, .. } => {
                assert_eq!(origin, "c1");
                assert_eq!(event, RoomEvent::Undo { stroke_id: "s1".to_string() });
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let json = r#"{"type":"emit","roomId":"r","event":{"kind":"undo","payload":{}}}"#;
        assert!(ClientMessage::from_json(json).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"shout"}"#).is_err());
    }

    #[test]
    fn test_scope() {
        let redo = RoomEvent::Redo { stroke: Drawable::Stroke(Stroke::new("s", "c")) };
        assert_eq!(redo.scope(), BroadcastScope::IncludeSender);
        let completed = RoomEvent::StrokeCompleted { stroke_id: "s".to_string(), stroke: None };
        assert_eq!(completed.scope(), BroadcastScope::IncludeSender);
        let undo = RoomEvent::Undo { stroke_id: "s".to_string() };
        assert_eq!(undo.scope(), BroadcastScope::ExcludeSender);
        let deselect = RoomEvent::DeselectElement { element_id: None };
        assert_eq!(deselect.scope(), BroadcastScope::ExcludeSender);
    }

    #[test]
    fn test_segment_points() {
        let json = r##"{"strokeId":"s","x0":1,"y0":2,"x1":3,"y1":4,"colour":"#123456","tool":"pen","brushSize":3}"##;
        let segment: StrokeSegment = serde_json::from_str(json).unwrap();
        assert!((segment.start().x - 1.0).abs() < f64::EPSILON);
        assert!((segment.end().y - 4.0).abs() < f64::EPSILON);
        assert_eq!(segment.end().colour, "#123456");
    }
}
