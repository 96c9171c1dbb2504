//! The identity map: one instance per `(entity type, key)`.
//!
//! The map owns the session arena. Rows merged for a `(type, key)` that is
//! already present refresh the stored attributes in place and hand back the
//! existing [`EntityId`], so everything wired to that entity keeps pointing
//! at the same instance.

use std::collections::HashMap;

use smol_str::SmolStr;
use tracing::trace;

use super::entity::{Entity, EntityId};
use crate::fetch::EntityRow;
use crate::value::Key;

/// What merging a row did to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new instance was created.
    Inserted,
    /// The instance existed and the row carried nothing new.
    Unchanged,
    /// The instance existed and stored attributes were updated.
    ///
    /// `conflicts` counts attributes whose stored value differed from the
    /// fetched one; columns seen for the first time are not conflicts.
    Refreshed {
        /// Number of overwritten differing values.
        conflicts: usize,
    },
}

impl MergeOutcome {
    /// Check if a new instance was created.
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }

    /// Number of conflicting attributes overwritten.
    pub fn conflicts(&self) -> usize {
        match self {
            Self::Refreshed { conflicts } => *conflicts,
            _ => 0,
        }
    }
}

/// Result of [`IdentityMap::get_or_add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merged {
    /// The canonical instance for the row.
    pub id: EntityId,
    /// What happened.
    pub outcome: MergeOutcome,
}

/// Arena of entities indexed by `(type, key)`.
#[derive(Debug, Default, Clone)]
pub struct IdentityMap {
    entities: Vec<Entity>,
    index: HashMap<(SmolStr, Key), EntityId>,
}

impl IdentityMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instance for `(entity_type, row.key)`, creating it if needed.
    ///
    /// Never fails. For an existing instance, values in `row` overwrite the
    /// stored ones (last write wins) and the instance itself is kept.
    pub fn get_or_add(&mut self, entity_type: &str, row: EntityRow) -> Merged {
        let slot = (SmolStr::new(entity_type), row.key);

        if let Some(&id) = self.index.get(&slot) {
            let entity = &mut self.entities[id.index()];
            let mut changed = false;
            let mut conflicts = 0;
            for (column, value) in row.attributes {
                match entity.attributes.get_mut(&column) {
                    Some(stored) if *stored == value => {}
                    Some(stored) => {
                        *stored = value;
                        changed = true;
                        conflicts += 1;
                    }
                    None => {
                        entity.attributes.insert(column, value);
                        changed = true;
                    }
                }
            }
            let outcome = if changed {
                MergeOutcome::Refreshed { conflicts }
            } else {
                MergeOutcome::Unchanged
            };
            return Merged { id, outcome };
        }

        let id = EntityId(self.entities.len());
        let (entity_type, key) = slot;
        trace!(entity_type = %entity_type, key = %key, id = %id, "identity map insert");
        self.entities
            .push(Entity::new(entity_type.clone(), key.clone(), row.attributes));
        self.index.insert((entity_type, key), id);
        Merged {
            id,
            outcome: MergeOutcome::Inserted,
        }
    }

    /// Look up the instance for `(entity_type, key)`.
    pub fn find(&self, entity_type: &str, key: &Key) -> Option<EntityId> {
        self.index.get(&(SmolStr::new(entity_type), key.clone())).copied()
    }

    /// Get an entity by handle.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    /// All entities with their handles, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i), e))
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
