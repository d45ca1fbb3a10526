//! skync core library
//!
//! Drawable model, wire protocol and client-side room state for the skync
//! shared whiteboard. The relay server uses the same [`Document`] patch
//! rules as every client replica.

pub mod collaboration;
pub mod document;
pub mod drawable;
pub mod geometry;
pub mod history;
pub mod live;
pub mod locks;
pub mod protocol;
pub mod replica;
pub mod sync;

pub use collaboration::{CollaborationManager, RemoteChange};
pub use document::Document;
pub use drawable::{
    ConnectionId, Drawable, DrawableId, DrawableTrait, ImageElement, PenStyle, Stroke, StrokePoint,
    TextElement, TextMeasure, generate_id,
};
pub use history::{Action, ActionKind, Direction, History};
pub use live::LiveBuffer;
pub use locks::{SelectionError, SelectionLocks};
pub use protocol::{BroadcastScope, ClientMessage, ProtocolError, RoomEvent, RoomId, ServerMessage, StrokeSegment};
pub use replica::Replica;
pub use sync::{ConnectionState, SyncEvent, TransportError};

#[cfg(not(target_arch = "wasm32"))]
pub use sync::NativeWebSocket;
