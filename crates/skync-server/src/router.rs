//! Maps client messages onto the room store.
//!
//! The router never writes to a socket itself. It returns an [`Outcome`]
//! describing what happened; the room store already queued every frame on
//! the peers' channels.

use skync_core::protocol::BroadcastScope;
use skync_core::{ClientMessage, RoomId};
use tracing::{debug, info};

use crate::room::{PeerSender, RoomStore};

/// What handling one client message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The connection joined a room and was sent its snapshot.
    Joined { room_id: RoomId, drawables: usize },
    /// An event was applied and relayed.
    Broadcast {
        kind: &'static str,
        changed: bool,
        recipients: usize,
        scope: BroadcastScope,
    },
    /// The event named a room that does not exist.
    Dropped { kind: &'static str, room_id: RoomId },
}

#[derive(Default)]
pub struct EventRouter {
    store: RoomStore,
}

impl EventRouter {
    pub fn new(store: RoomStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RoomStore {
        &self.store
    }

    /// Handle one decoded message from `connection_id`, whose outbound
    /// channel is `tx`.
    pub fn route(&self, connection_id: &str, tx: &PeerSender, msg: ClientMessage) -> Outcome {
        match msg {
            ClientMessage::JoinRoom { room_id } => {
                let drawables = self.store.join(&room_id, connection_id, tx).len();
                info!(%connection_id, room = %room_id, drawables, "joined room");
                Outcome::Joined { room_id, drawables }
            }
            ClientMessage::Emit { room_id, event } => {
                let kind = event.name();
                match self.store.apply_and_broadcast(&room_id, connection_id, event) {
                    Some(delivery) => {
                        debug!(
                            %connection_id,
                            room = %room_id,
                            kind,
                            changed = delivery.changed,
                            recipients = delivery.recipients,
                            "relayed event"
                        );
                        Outcome::Broadcast {
                            kind,
                            changed: delivery.changed,
                            recipients: delivery.recipients,
                            scope: delivery.scope,
                        }
                    }
                    None => {
                        debug!(%connection_id, room = %room_id, kind, "dropping event for unknown room");
                        Outcome::Dropped { kind, room_id }
                    }
                }
            }
        }
    }

    /// Unregister a closed connection from a room.
    pub fn disconnect(&self, room_id: &str, connection_id: &str) {
        let notified = self.store.leave(room_id, connection_id);
        info!(%connection_id, room = %room_id, notified, "left room");
    }
}
