//! Advisory selection locks held by other peers.
//!
//! Nothing enforces these on the relay. Each client keeps its own view of
//! which drawable every peer has selected, built from relayed
//! `select-element` / `deselect-element` events, and refuses to select a
//! drawable some peer already holds.

use crate::drawable::{ConnectionId, DrawableId};
use std::collections::HashMap;
use thiserror::Error;

/// Local refusal to select a drawable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("drawable {id} is already selected by another person ({peer})")]
    LockedByPeer { id: DrawableId, peer: ConnectionId },
    #[error("drawable not found: {0}")]
    NotFound(DrawableId),
}

/// Peer id to the drawable that peer has selected.
#[derive(Debug, Clone, Default)]
pub struct SelectionLocks {
    peers: HashMap<ConnectionId, DrawableId>,
}

impl SelectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `peer` selected `id`, replacing its previous selection.
    pub fn record_select(&mut self, peer: &str, id: &str) {
        self.peers.insert(peer.to_string(), id.to_string());
    }

    /// Erase whatever `peer` had selected.
    pub fn record_deselect(&mut self, peer: &str) -> Option<DrawableId> {
        self.peers.remove(peer)
    }

    /// Peer currently holding `id`, if any.
    pub fn holder(&self, id: &str) -> Option<&str> {
        self.peers
            .iter()
            .find(|(_, selected)| selected.as_str() == id)
            .map(|(peer, _)| peer.as_str())
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.holder(id).is_some()
    }

    /// Selection of one peer.
    pub fn selection_of(&self, peer: &str) -> Option<&str> {
        self.peers.get(peer).map(String::as_str)
    }

    /// Fail if a peer holds `id`.
    pub fn check(&self, id: &str) -> Result<(), SelectionError> {
        match self.holder(id) {
            Some(peer) => Err(SelectionError::LockedByPeer {
                id: id.to_string(),
                peer: peer.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
