//! Room session controller.
//!
//! Reacts to connection lifecycle and inbound packets for one room, applies
//! mutations to the `RoomState` and publishes the resulting events. All
//! handling is synchronous: one message is processed to completion before
//! the next, which makes every room operation a single critical section.

use crate::publisher::{Audience, Outbox, Publisher};
use crate::room::{RoomError, RoomState, SpawnStrategy, StateChange};
use log::{debug, error, info, warn};
use shared::{EntityId, Packet, Position, PublicationEvent, WorldBounds};
use std::collections::HashMap;

/// Messages delivered to a room by the transport layer.
#[derive(Debug)]
pub enum RoomMessage {
    Opened { id: EntityId, outbox: Outbox },
    PacketReceived { id: EntityId, packet: Packet },
    Closed { id: EntityId },
}

/// Lifecycle of one connection within a room. `Left` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Joined,
    Left,
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub bounds: WorldBounds,
    pub spawn: SpawnStrategy,
    pub max_clients: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            bounds: WorldBounds::default(),
            spawn: SpawnStrategy::Origin,
            max_clients: 64,
        }
    }
}

pub struct RoomSession {
    name: String,
    room: RoomState,
    publisher: Publisher,
    // Only live connections are tracked; anything absent has left.
    connections: HashMap<EntityId, ConnectionPhase>,
    max_clients: usize,
}

impl RoomSession {
    pub fn new(name: impl Into<String>, config: &RoomConfig) -> Self {
        Self {
            name: name.into(),
            room: RoomState::new(config.bounds, config.spawn),
            publisher: Publisher::new(),
            connections: HashMap::new(),
            max_clients: config.max_clients,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &RoomState {
        &self.room
    }

    pub fn phase(&self, id: EntityId) -> ConnectionPhase {
        self.connections
            .get(&id)
            .copied()
            .unwrap_or(ConnectionPhase::Left)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn handle(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Opened { id, outbox } => self.join(id, outbox),
            RoomMessage::PacketReceived { id, packet } => self.handle_packet(id, packet),
            RoomMessage::Closed { id } => self.leave(id),
        }
    }

    pub fn join(&mut self, id: EntityId, outbox: Outbox) {
        if self.connections.contains_key(&id) {
            // Identities come from a monotonic allocator, so this is a broken
            // transport. Refuse the newcomer without touching live state.
            error!(
                "Room {}: {}, rejecting connection",
                self.name,
                RoomError::DuplicateIdentity(id)
            );
            Self::reject(outbox, "Duplicate identity");
            return;
        }

        if self.connections.len() >= self.max_clients {
            info!("Room {}: rejecting {}, room full", self.name, id);
            Self::reject(outbox, "Room full");
            return;
        }

        self.connections.insert(id, ConnectionPhase::Connecting);

        match self.room.add_entity(id) {
            Ok(_) => {
                self.publisher.register(id, outbox);
                self.connections.insert(id, ConnectionPhase::Joined);
                info!(
                    "Room {}: {} joined ({} connected)",
                    self.name,
                    id,
                    self.connections.len()
                );
                self.publish_changes();
            }
            Err(e) => {
                self.connections.remove(&id);
                error!("Room {}: {}, rejecting connection", self.name, e);
                Self::reject(outbox, "Duplicate identity");
            }
        }
    }

    pub fn leave(&mut self, id: EntityId) {
        match self.connections.remove(&id) {
            Some(ConnectionPhase::Joined) => {
                self.publisher.unregister(id);
                self.room.remove_entity(id);
                info!(
                    "Room {}: {} left ({} connected)",
                    self.name,
                    id,
                    self.connections.len()
                );
                self.publish_changes();
            }
            Some(phase) => {
                self.publisher.unregister(id);
                debug!("Room {}: {} closed while {:?}", self.name, id, phase);
            }
            None => debug!("Room {}: close for unknown connection {}", self.name, id),
        }
    }

    fn handle_packet(&mut self, id: EntityId, packet: Packet) {
        match packet {
            Packet::MoveIntent { x, y, z } => self.move_entity(id, Position::new(x, y, z)),
            Packet::Leave => self.leave(id),
            other => warn!(
                "Room {}: unexpected packet from {}: {:?}",
                self.name, id, other
            ),
        }
    }

    /// Applies a move intent. Intents from connections that are not joined,
    /// or that race a disconnect, are dropped without telling anyone.
    pub fn move_entity(&mut self, id: EntityId, target: Position) {
        if self.phase(id) != ConnectionPhase::Joined {
            debug!("Room {}: dropping intent from {} (not joined)", self.name, id);
            return;
        }

        match self.room.set_position(id, target) {
            Ok(_) => self.publish_changes(),
            Err(RoomError::UnknownIdentity(_)) => {
                debug!("Room {}: dropping intent from departed {}", self.name, id)
            }
            Err(e) => warn!("Room {}: intent from {} failed: {}", self.name, id, e),
        }
    }

    fn publish_changes(&mut self) {
        for change in self.room.take_changes() {
            match change {
                StateChange::Added { id, position } => self.publish_join(id, position),
                StateChange::Moved { id, position } => {
                    // The sender gets its own clamped position back too; that
                    // echo is what overrides its optimistic local target.
                    self.publisher
                        .publish(PublicationEvent::EntityChanged { id, position }, Audience::All);
                }
                StateChange::Removed { id } => {
                    self.publisher
                        .publish(PublicationEvent::EntityRemoved { id }, Audience::All);
                }
            }
        }
    }

    /// The joiner learns about itself, then about everyone already present,
    /// before anything else can be queued on its outbox.
    fn publish_join(&self, id: EntityId, position: Position) {
        self.publisher.publish(
            PublicationEvent::EntityAdded {
                id,
                position,
                is_self: true,
            },
            Audience::Single(id),
        );

        for (other, other_position) in self.room.snapshot() {
            if other == id {
                continue;
            }
            self.publisher.publish(
                PublicationEvent::EntityAdded {
                    id: other,
                    position: other_position,
                    is_self: false,
                },
                Audience::Single(id),
            );
        }

        self.publisher.publish(
            PublicationEvent::EntityAdded {
                id,
                position,
                is_self: false,
            },
            Audience::AllExcept(id),
        );
    }

    fn reject(outbox: Outbox, reason: &str) {
        if outbox
            .send(Packet::Rejected {
                reason: reason.to_string(),
            })
            .is_err()
        {
            debug!("Rejected connection already closed");
        }
    }
}
