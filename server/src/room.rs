//! Authoritative room state: the only place shared entity state is mutated.
//!
//! Every successful mutation is also recorded as a `StateChange` in the
//! room's change feed. The session controller drains that feed after each
//! operation and turns it into publication events, so nothing outside this
//! module decides *what* changed.

use log::{debug, info};
use rand::Rng;
use shared::{EntityId, Position, WorldBounds};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    #[error("entity {0} already exists in this room")]
    DuplicateIdentity(EntityId),
    #[error("entity {0} is not in this room")]
    UnknownIdentity(EntityId),
}

/// Where newly joined entities appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SpawnStrategy {
    /// Every entity spawns at the world origin.
    #[default]
    Origin,
    /// Uniformly random point on the ground plane inside the bounds.
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    pub id: EntityId,
    pub position: Position,
}

/// A committed mutation of room state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateChange {
    Added { id: EntityId, position: Position },
    Moved { id: EntityId, position: Position },
    Removed { id: EntityId },
}

impl StateChange {
    pub fn id(&self) -> EntityId {
        match self {
            StateChange::Added { id, .. }
            | StateChange::Moved { id, .. }
            | StateChange::Removed { id } => *id,
        }
    }
}

#[derive(Debug)]
pub struct RoomState {
    entities: BTreeMap<EntityId, EntityState>,
    bounds: WorldBounds,
    spawn: SpawnStrategy,
    changes: Vec<StateChange>,
}

impl RoomState {
    pub fn new(bounds: WorldBounds, spawn: SpawnStrategy) -> Self {
        Self {
            entities: BTreeMap::new(),
            bounds,
            spawn,
            changes: Vec::new(),
        }
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn add_entity(&mut self, id: EntityId) -> Result<EntityState, RoomError> {
        if self.entities.contains_key(&id) {
            return Err(RoomError::DuplicateIdentity(id));
        }

        let entity = EntityState {
            id,
            position: self.spawn_position(),
        };

        info!("Added entity {} at {}", id, entity.position);
        self.entities.insert(id, entity);
        self.changes.push(StateChange::Added {
            id,
            position: entity.position,
        });

        Ok(entity)
    }

    /// Removes `id` if present. Absent identities are tolerated so late or
    /// duplicated leave notifications are harmless; returns whether an entry
    /// was actually removed.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if self.entities.remove(&id).is_some() {
            info!("Removed entity {}", id);
            self.changes.push(StateChange::Removed { id });
            true
        } else {
            debug!("Ignoring removal of absent entity {}", id);
            false
        }
    }

    /// Clamps `position` into the world bounds and stores it.
    pub fn set_position(&mut self, id: EntityId, position: Position) -> Result<Position, RoomError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(RoomError::UnknownIdentity(id))?;

        let clamped = self.bounds.clamp(position);
        entity.position = clamped;
        self.changes.push(StateChange::Moved {
            id,
            position: clamped,
        });

        Ok(clamped)
    }

    /// Every entity in identity order.
    pub fn snapshot(&self) -> Vec<(EntityId, Position)> {
        self.entities
            .values()
            .map(|entity| (entity.id, entity.position))
            .collect()
    }

    /// Drains the change feed.
    pub fn take_changes(&mut self) -> Vec<StateChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityState> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn spawn_position(&self) -> Position {
        match self.spawn {
            SpawnStrategy::Origin => Position::ORIGIN,
            SpawnStrategy::Scatter => {
                let extent = self.bounds.half_extent();
                let mut rng = rand::thread_rng();
                self.bounds.clamp(Position::new(
                    rng.gen_range(-extent..=extent),
                    self.bounds.ground_y(),
                    rng.gen_range(-extent..=extent),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn room() -> RoomState {
        RoomState::new(WorldBounds::default(), SpawnStrategy::Origin)
    }

    #[test]
    fn test_add_entity_spawns_at_origin() {
        let mut room = room();
        let entity = room.add_entity(1).unwrap();

        assert_eq!(entity.id, 1);
        assert_eq!(entity.position, Position::ORIGIN);
        assert_eq!(room.len(), 1);
        assert_eq!(
            room.take_changes(),
            vec![StateChange::Added {
                id: 1,
                position: Position::ORIGIN
            }]
        );
    }

    #[test]
    fn test_add_duplicate_entity_leaves_state_untouched() {
        let mut room = room();
        room.add_entity(1).unwrap();
        room.set_position(1, Position::new(10.0, 0.0, 10.0)).unwrap();
        room.take_changes();

        assert_eq!(room.add_entity(1), Err(RoomError::DuplicateIdentity(1)));
        assert_eq!(room.len(), 1);
        assert_eq!(room.get(1).unwrap().position, Position::new(10.0, -1.0, 10.0));
        assert!(room.take_changes().is_empty());
    }

    #[test]
    fn test_remove_absent_entity_is_noop() {
        let mut room = room();
        assert!(!room.remove_entity(7));
        assert!(room.take_changes().is_empty());

        room.add_entity(7).unwrap();
        assert!(room.remove_entity(7));
        assert!(!room.remove_entity(7));
        assert!(room.is_empty());
    }

    #[test]
    fn test_set_position_clamps() {
        let mut room = room();
        room.add_entity(1).unwrap();
        room.take_changes();

        let stored = room.set_position(1, Position::new(300.0, -1.0, 0.0)).unwrap();

        assert_eq!(stored, Position::new(245.0, -1.0, 0.0));
        assert_eq!(room.get(1).unwrap().position, stored);
        assert_eq!(
            room.take_changes(),
            vec![StateChange::Moved {
                id: 1,
                position: stored
            }]
        );
    }

    #[test]
    fn test_set_position_unknown_identity() {
        let mut room = room();
        assert_eq!(
            room.set_position(3, Position::ORIGIN),
            Err(RoomError::UnknownIdentity(3))
        );
        assert!(room.take_changes().is_empty());
    }

    #[test]
    fn test_removed_entity_cannot_be_moved() {
        let mut room = room();
        room.add_entity(1).unwrap();
        room.remove_entity(1);

        assert_eq!(
            room.set_position(1, Position::ORIGIN),
            Err(RoomError::UnknownIdentity(1))
        );
    }

    #[test]
    fn test_snapshot_is_ordered_by_identity() {
        let mut room = room();
        for id in [5, 2, 9] {
            room.add_entity(id).unwrap();
        }
        room.set_position(9, Position::new(1.0, 0.0, 2.0)).unwrap();

        let ids: Vec<EntityId> = room.snapshot().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
        assert_eq!(room.snapshot()[2].1, Position::new(1.0, -1.0, 2.0));
    }

    #[test]
    fn test_join_leave_sequence_matches_set_difference() {
        let mut room = room();
        let mut expected = BTreeSet::new();
        let operations: [(bool, EntityId); 10] = [
            (true, 1),
            (true, 2),
            (true, 3),
            (false, 2),
            (true, 4),
            (false, 9),
            (false, 1),
            (true, 5),
            (false, 5),
            (false, 5),
        ];

        for (join, id) in operations {
            if join {
                room.add_entity(id).unwrap();
                expected.insert(id);
            } else {
                room.remove_entity(id);
                expected.remove(&id);
            }
        }

        let actual: BTreeSet<EntityId> = room.snapshot().iter().map(|(id, _)| *id).collect();
        assert_eq!(actual, expected);
        assert_eq!(room.len(), expected.len());
    }

    #[test]
    fn test_scatter_spawn_stays_in_bounds() {
        let bounds = WorldBounds::new(20.0, -1.0).unwrap();
        let mut room = RoomState::new(bounds, SpawnStrategy::Scatter);

        for id in 1..=200 {
            let entity = room.add_entity(id).unwrap();
            assert!(bounds.contains(&entity.position));
            assert_eq!(entity.position.y, -1.0);
        }
    }
}
