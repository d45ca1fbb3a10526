//! Client-side copy of a room.

use crate::document::Document;
use crate::drawable::{ConnectionId, Drawable, DrawableId};
use crate::protocol::RoomEvent;
use std::collections::HashSet;

/// A client's local copy of the room document.
///
/// Local edits are applied here immediately and sent afterwards. Remote
/// events go through the same [`Document::apply`] rules as on the relay, so
/// the copy converges with every other participant.
#[derive(Debug, Clone, Default)]
pub struct Replica {
    /// Connection id the relay assigned to this client.
    local_id: ConnectionId,
    document: Document,
    /// Drawables whose owner is this client.
    owned: HashSet<DrawableId>,
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Adopt the connection id assigned by the relay.
    pub fn set_local_id(&mut self, id: impl Into<ConnectionId>) {
        self.local_id = id.into();
        self.recompute_owned();
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn drawables(&self) -> &[Drawable] {
        self.document.drawables()
    }

    pub fn get(&self, id: &str) -> Option<&Drawable> {
        self.document.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.document.contains(id)
    }

    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    pub fn owned(&self) -> &HashSet<DrawableId> {
        &self.owned
    }

    pub fn is_owned(&self, id: &str) -> bool {
        self.owned.contains(id)
    }

    /// Replace everything with a join snapshot.
    pub fn load_snapshot(&mut self, drawables: Vec<Drawable>) {
        self.document.replace_all(drawables);
        self.recompute_owned();
        log::debug!("Loaded snapshot with {} drawables", self.document.len());
    }

    /// Apply an event relayed from `origin`. Returns true if the list changed.
    pub fn apply_remote(&mut self, origin: &str, event: &RoomEvent) -> bool {
        let changed = self.document.apply(origin, event);
        if changed {
            self.track_ownership(event);
        }
        changed
    }

    /// Apply an event this client is about to send.
    pub fn apply_local(&mut self, event: &RoomEvent) -> bool {
        let origin = self.local_id.clone();
        self.apply_remote(&origin, event)
    }

    /// Add a drawable this client just finished, replacing any partial copy.
    pub fn commit(&mut self, drawable: Drawable) -> bool {
        let id = drawable.id().to_string();
        let changed = self.document.upsert(drawable);
        self.refresh_owned(&id);
        changed
    }

    fn track_ownership(&mut self, event: &RoomEvent) {
        match event {
            RoomEvent::LayerChange { .. } => self.recompute_owned(),
            _ => {
                if let Some(id) = event.target_id() {
                    let id = id.to_string();
                    self.refresh_owned(&id);
                }
            }
        }
    }

    fn refresh_owned(&mut self, id: &str) {
        let mine = self
            .document
            .get(id)
            .is_some_and(|d| !self.local_id.is_empty() && d.owner_id() == self.local_id);
        if mine {
            self.owned.insert(id.to_string());
        } else {
            self.owned.remove(id);
        }
    }

    fn recompute_owned(&mut self) {
        self.owned = self
            .document
            .iter()
            .filter(|d| !self.local_id.is_empty() && d.owner_id() == self.local_id)
            .map(|d| d.id().to_string())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawable::{ImageElement, Stroke};

    fn image(id: &str, owner: &str) -> Drawable {
        Drawable::Image(ImageElement::new(id, owner, 0.0, 0.0, 10.0, 10.0, ""))
    }

    #[test]
    fn test_snapshot_recomputes_owned() {
        let mut replica = Replica::new();
        replica.set_local_id("me");
        replica.load_snapshot(vec![image("a", "me"), image("b", "peer"), image("c", "me")]);

        assert_eq!(replica.len(), 3);
        assert!(replica.is_owned("a"));
        assert!(!replica.is_owned("b"));
        assert_eq!(replica.owned().len(), 2);
    }

    #[test]
    fn test_redo_echo_is_idempotent() {
        let mut replica = Replica::new();
        replica.set_local_id("me");
        let redo = RoomEvent::Redo { stroke: Drawable::Stroke(Stroke::new("s", "me")) };

        assert!(replica.apply_local(&redo));
        assert!(!replica.apply_remote("me", &redo));
        assert_eq!(replica.len(), 1);
        assert!(replica.is_owned("s"));
    }

    #[test]
    fn test_remote_delete_drops_ownership() {
        let mut replica = Replica::new();
        replica.set_local_id("me");
        replica.load_snapshot(vec![image("a", "me")]);

        replica.apply_remote("peer", &RoomEvent::DeleteElement { element_id: "a".to_string() });
        assert!(replica.is_empty());
        assert!(!replica.is_owned("a"));
    }

    #[test]
    fn test_commit_then_completion_echo() {
        let mut replica = Replica::new();
        replica.set_local_id("me");
        let stroke = Stroke::new("s", "me");
        replica.commit(Drawable::Stroke(stroke.clone()));

        let echo = RoomEvent::StrokeCompleted { stroke_id: "s".to_string(), stroke: Some(stroke) };
        assert!(!replica.apply_remote("me", &echo));
        assert_eq!(replica.len(), 1);
        assert!(replica.is_owned("s"));
    }

    #[test]
    fn test_owned_waits_for_connection_id() {
        let mut replica = Replica::new();
        replica.load_snapshot(vec![image("a", "me")]);
        assert!(replica.owned().is_empty());
        replica.set_local_id("me");
        assert!(replica.is_owned("a"));
    }
}
