//! Load sessions.
//!
//! A [`LoadSession`] is the scope of the identity map. Every entity attached
//! as a root or produced by a load lives in the session arena until the
//! session is dropped, and navigations refer to other entities by
//! [`EntityId`]. Loads take the session by `&mut`, so two operations can
//! never interleave on the same session.
//!
//! ```rust,ignore
//! let mut session = LoadSession::new(schema);
//! let blog = session.attach("Blog", EntityRow::new(1).with("url", "http://sample.com/blogs/fish"))?;
//! assert!(!session.entity(blog)?.is_loaded("Posts"));
//! ```

mod entity;
mod identity;

use std::sync::Arc;

use tracing::warn;

use crate::error::{LoadError, LoadResult};
use crate::fetch::EntityRow;
use crate::relations::Schema;
use crate::value::Key;

pub use entity::{Entity, EntityId, Navigation};
pub use identity::{IdentityMap, MergeOutcome, Merged};

/// Identity-map scope owning every loaded entity.
#[derive(Debug, Clone)]
pub struct LoadSession {
    schema: Arc<Schema>,
    identity: IdentityMap,
}

impl LoadSession {
    /// Create an empty session over `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            identity: IdentityMap::new(),
        }
    }

    /// The schema navigations are resolved against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The underlying identity map.
    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    /// Attach a root row obtained outside the loader.
    ///
    /// Attaching a row whose `(type, key)` is already present returns the
    /// existing handle and refreshes its attributes.
    pub fn attach(&mut self, entity_type: &str, row: EntityRow) -> LoadResult<EntityId> {
        if !self.schema.contains(entity_type) {
            return Err(LoadError::unknown_entity_type(entity_type).with_context("attach"));
        }
        Ok(self.identity.get_or_add(entity_type, row).id)
    }

    /// Attach many root rows, keeping their order.
    pub fn attach_all(
        &mut self,
        entity_type: &str,
        rows: impl IntoIterator<Item = EntityRow>,
    ) -> LoadResult<Vec<EntityId>> {
        rows.into_iter().map(|row| self.attach(entity_type, row)).collect()
    }

    /// Get an entity by handle.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.identity.get(id)
    }

    /// Get an entity by handle, failing when the handle is out of range.
    ///
    /// Handles are plain arena indices: one taken from another session is
    /// not detected and may resolve to an unrelated entity.
    pub fn entity(&self, id: EntityId) -> LoadResult<&Entity> {
        self.identity.get(id).ok_or_else(|| LoadError::unknown_entity(id))
    }

    /// Look up the instance for `(entity_type, key)`.
    pub fn find(&self, entity_type: &str, key: impl Into<Key>) -> Option<EntityId> {
        self.identity.find(entity_type, &key.into())
    }

    /// Entities reached through a loaded navigation of `id`.
    ///
    /// Yields nothing when the navigation is not loaded or known-empty.
    pub fn related<'s>(&'s self, id: EntityId, navigation: &str) -> impl Iterator<Item = (EntityId, &'s Entity)> + 's {
        let ids = self
            .get(id)
            .and_then(|e| e.navigation(navigation))
            .map(|n| n.ids())
            .unwrap_or(&[]);
        ids.iter().filter_map(move |&child| self.get(child).map(|e| (child, e)))
    }

    /// All entities of one type, in the order they entered the session.
    pub fn entities_of<'s>(&'s self, entity_type: &'s str) -> impl Iterator<Item = (EntityId, &'s Entity)> + 's {
        self.identity
            .iter()
            .filter(move |(_, e)| e.entity_type() == entity_type)
    }

    /// Number of entities in the session.
    pub fn len(&self) -> usize {
        self.identity.len()
    }

    /// Check if the session holds no entities.
    pub fn is_empty(&self) -> bool {
        self.identity.is_empty()
    }

    /// Merge a fetched row, reporting identity conflicts.
    pub(crate) fn merge(&mut self, entity_type: &str, row: EntityRow, log_conflicts: bool) -> Merged {
        let key = row.key.clone();
        let merged = self.identity.get_or_add(entity_type, row);
        let conflicts = merged.outcome.conflicts();
        if conflicts > 0 && log_conflicts {
            warn!(
                entity_type,
                key = %key,
                conflicts,
                "identity conflict: fetched values overwrite stored attributes"
            );
        }
        merged
    }

    pub(crate) fn set_reference(&mut self, parent: EntityId, navigation: &str, target: Option<EntityId>) {
        if let Some(entity) = self.identity.get_mut(parent) {
            entity
                .navigations
                .insert(navigation.into(), Navigation::Reference(target));
        }
    }

    /// Make sure `navigation` is a loaded collection, keeping existing members.
    pub(crate) fn ensure_collection(&mut self, parent: EntityId, navigation: &str) {
        if let Some(entity) = self.identity.get_mut(parent) {
            let slot = entity
                .navigations
                .entry(navigation.into())
                .or_insert_with(|| Navigation::Collection(Vec::new()));
            if !matches!(slot, Navigation::Collection(_)) {
                *slot = Navigation::Collection(Vec::new());
            }
        }
    }

    /// Append `child` unless already a member. Returns whether it was added.
    pub(crate) fn push_unique(&mut self, parent: EntityId, navigation: &str, child: EntityId) -> bool {
        self.ensure_collection(parent, navigation);
        match self
            .identity
            .get_mut(parent)
            .and_then(|e| e.navigations.get_mut(navigation))
        {
            Some(Navigation::Collection(ids)) if !ids.contains(&child) => {
                ids.push(child);
                true
            }
            _ => false,
        }
    }

    /// Replace a navigation with a fresh collection.
    pub(crate) fn replace_collection(&mut self, parent: EntityId, navigation: &str, members: Vec<EntityId>) {
        if let Some(entity) = self.identity.get_mut(parent) {
            entity
                .navigations
                .insert(navigation.into(), Navigation::Collection(members));
        }
    }
}
