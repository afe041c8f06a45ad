//! Messages exchanged between clients and the room server.

use crate::world::Position;
use serde::{Deserialize, Serialize};

/// Opaque per-connection identity. Allocated by the server, never reused.
pub type EntityId = u32;

/// Bumped whenever `Packet` changes shape.
pub const PROTOCOL_VERSION: u32 = 1;

/// A single change to authoritative state as seen by one client.
///
/// For any identity a client observes `EntityAdded`, then any number of
/// `EntityChanged`, then at most one `EntityRemoved`, and nothing after it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum PublicationEvent {
    EntityAdded {
        id: EntityId,
        position: Position,
        is_self: bool,
    },
    EntityChanged {
        id: EntityId,
        position: Position,
    },
    EntityRemoved {
        id: EntityId,
    },
}

impl PublicationEvent {
    pub fn id(&self) -> EntityId {
        match self {
            PublicationEvent::EntityAdded { id, .. }
            | PublicationEvent::EntityChanged { id, .. }
            | PublicationEvent::EntityRemoved { id } => *id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Join {
        room: String,
        client_version: u32,
    },
    MoveIntent {
        x: f32,
        y: f32,
        z: f32,
    },
    Leave,

    Event(PublicationEvent),
    Rejected {
        reason: String,
    },
}

impl Packet {
    pub fn move_intent(target: Position) -> Self {
        Packet::MoveIntent {
            x: target.x,
            y: target.y,
            z: target.z,
        }
    }
}

impl From<PublicationEvent> for Packet {
    fn from(event: PublicationEvent) -> Self {
        Packet::Event(event)
    }
}
