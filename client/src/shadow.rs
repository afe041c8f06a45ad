//! Client-side mirror of authoritative state.
//!
//! Built purely from the server's event stream. The only local write is the
//! optimistic target for the locally controlled entity, and that is
//! overwritten by the next authoritative `EntityChanged` for it.

use log::{debug, warn};
use shared::{EntityId, Position, PublicationEvent};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared between the network task and the frame loop. Every event and
/// every interpolation tick runs under one lock acquisition.
pub type SharedShadow = Arc<Mutex<ShadowState>>;

/// Locks the shared shadow. A panic on the other side does not leave the
/// map half-written (every update is a single assignment), so a poisoned
/// lock is still usable.
pub fn lock(shadow: &SharedShadow) -> MutexGuard<'_, ShadowState> {
    shadow.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowEntity {
    /// Where the entity is drawn this frame.
    pub current: Position,
    /// Latest authoritative (or optimistic, for the local entity) position.
    pub target: Position,
    pub is_self: bool,
}

/// What applying an event did, so the presentation layer can create or
/// release per-entity resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowUpdate {
    Spawned { id: EntityId, is_self: bool },
    Retargeted { id: EntityId },
    Despawned { id: EntityId },
    Ignored,
}

#[derive(Debug, Default)]
pub struct ShadowState {
    entities: BTreeMap<EntityId, ShadowEntity>,
    local_id: Option<EntityId>,
}

impl ShadowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedShadow {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn apply(&mut self, event: &PublicationEvent) -> ShadowUpdate {
        match *event {
            PublicationEvent::EntityAdded {
                id,
                position,
                is_self,
            } => {
                if self.entities.contains_key(&id) {
                    warn!("Entity {} added twice, resetting it", id);
                }
                self.entities.insert(
                    id,
                    ShadowEntity {
                        current: position,
                        target: position,
                        is_self,
                    },
                );
                if is_self {
                    self.local_id = Some(id);
                }
                ShadowUpdate::Spawned { id, is_self }
            }
            PublicationEvent::EntityChanged { id, position } => match self.entities.get_mut(&id) {
                Some(entity) => {
                    entity.target = position;
                    ShadowUpdate::Retargeted { id }
                }
                None => {
                    warn!("Change for unknown entity {}, ignoring", id);
                    ShadowUpdate::Ignored
                }
            },
            PublicationEvent::EntityRemoved { id } => {
                if self.entities.remove(&id).is_none() {
                    debug!("Removal of unknown entity {}", id);
                    return ShadowUpdate::Ignored;
                }
                if self.local_id == Some(id) {
                    self.local_id = None;
                }
                ShadowUpdate::Despawned { id }
            }
        }
    }

    /// Optimistically retargets the local entity before the server answers.
    /// Returns false when the local entity is not known yet.
    pub fn set_local_target(&mut self, target: Position) -> bool {
        let Some(id) = self.local_id else {
            return false;
        };

        match self.entities.get_mut(&id) {
            Some(entity) => {
                entity.target = target;
                true
            }
            None => false,
        }
    }

    /// Releases every shadow entity; returns the identities released.
    pub fn clear(&mut self) -> Vec<EntityId> {
        self.local_id = None;
        std::mem::take(&mut self.entities).into_keys().collect()
    }

    pub fn local_id(&self) -> Option<EntityId> {
        self.local_id
    }

    pub fn get(&self, id: EntityId) -> Option<&ShadowEntity> {
        self.entities.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &ShadowEntity)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut ShadowEntity)> {
        self.entities.iter_mut().map(|(id, entity)| (*id, entity))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
