//! Authoritative in-memory room state.
//!
//! Each room holds the drawable list and the outbound channel of every
//! connection that joined it. A room's entry stays locked while an event is
//! applied and fanned out, so peers see one total order of events per room
//! and a joining connection gets its snapshot before any later event.

use std::collections::HashMap;

use dashmap::DashMap;
use skync_core::protocol::BroadcastScope;
use skync_core::{ConnectionId, Document, Drawable, RoomEvent, RoomId, ServerMessage};
use tokio::sync::mpsc;

/// Outbound channel of one connection.
pub type PeerSender = mpsc::UnboundedSender<ServerMessage>;

/// One room: its drawables and the connections that joined it.
#[derive(Default)]
struct Room {
    document: Document,
    peers: HashMap<ConnectionId, PeerSender>,
}

impl Room {
    /// Send `msg` to every peer, skipping `origin` for sender-exclusive events.
    /// Returns the number of peers the message was queued for.
    fn fan_out(&self, origin: &str, scope: BroadcastScope, msg: &ServerMessage) -> usize {
        self.peers
            .iter()
            .filter(|(peer, _)| scope == BroadcastScope::IncludeSender || peer.as_str() != origin)
            .filter(|(_, tx)| tx.send(msg.clone()).is_ok())
            .count()
    }
}

/// Result of applying one event to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Whether the drawable list changed.
    pub changed: bool,
    /// Peers the event was queued for.
    pub recipients: usize,
    pub scope: BroadcastScope,
}

/// Every live room, created on first join and kept until teardown.
#[derive(Default)]
pub struct RoomStore {
    rooms: DashMap<RoomId, Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection in a room, creating the room if needed, and
    /// queue the room snapshot on the connection's channel.
    /// Returns the snapshot.
    pub fn join(&self, room_id: &str, connection_id: &str, tx: &PeerSender) -> Vec<Drawable> {
        let mut room = self.rooms.entry(room_id.to_string()).or_default();
        room.peers.insert(connection_id.to_string(), tx.clone());

        let drawables = room.document.drawables().to_vec();
        let _ = tx.send(ServerMessage::RoomData {
            room_id: room_id.to_string(),
            drawables: drawables.clone(),
        });
        drawables
    }

    /// Apply an event to a room and relay it to the room's peers.
    /// Returns `None` if the room does not exist.
    pub fn apply_and_broadcast(&self, room_id: &str, origin: &str, mut event: RoomEvent) -> Option<Delivery> {
        let mut room = self.rooms.get_mut(room_id)?;

        // Completions carry the relay's copy, so the author's echo and every
        // peer converge on the same points.
        if let RoomEvent::StrokeCompleted { stroke_id, stroke } = &mut event {
            *stroke = room
                .document
                .get(stroke_id)
                .and_then(Drawable::as_stroke)
                .cloned();
        }

        let changed = room.document.apply(origin, &event);
        let scope = event.scope();
        let msg = ServerMessage::Event {
            room_id: room_id.to_string(),
            origin: origin.to_string(),
            event,
        };
        let recipients = room.fan_out(origin, scope, &msg);
        Some(Delivery {
            changed,
            recipients,
            scope,
        })
    }

    /// Remove a connection from a room and tell the remaining peers to drop
    /// its selection. The room's drawables are left alone.
    /// Returns the number of peers notified.
    pub fn leave(&self, room_id: &str, connection_id: &str) -> usize {
        let Some(mut room) = self.rooms.get_mut(room_id) else {
            return 0;
        };
        if room.peers.remove(connection_id).is_none() {
            return 0;
        }
        let msg = ServerMessage::Event {
            room_id: room_id.to_string(),
            origin: connection_id.to_string(),
            event: RoomEvent::DeselectElement { element_id: None },
        };
        room.fan_out(connection_id, BroadcastScope::ExcludeSender, &msg)
    }

    /// Current drawables of a room.
    pub fn snapshot(&self, room_id: &str) -> Option<Vec<Drawable>> {
        self.rooms.get(room_id).map(|room| room.document.drawables().to_vec())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Connections registered in a room.
    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, |room| room.peers.len())
    }

    /// Drop every room and peer channel. Returns the number of rooms dropped.
    pub fn teardown(&self) -> usize {
        let count = self.rooms.len();
        self.rooms.clear();
        count
    }
}
