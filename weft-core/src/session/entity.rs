//! Entities held by a load session.

use std::fmt;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::value::{Key, Value};

/// Handle to an entity inside a [`LoadSession`](super::LoadSession).
///
/// Two handles are equal exactly when they name the same in-memory instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    /// Position of the entity in the session arena.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Loaded state of one navigation.
///
/// A navigation missing from [`Entity::navigations`] has never been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Single-valued; `None` means loaded and known to be empty.
    Reference(Option<EntityId>),
    /// Multi-valued, in fetch order, without duplicates.
    Collection(Vec<EntityId>),
}

impl Navigation {
    /// Entities this navigation points at.
    pub fn ids(&self) -> &[EntityId] {
        match self {
            Self::Reference(Some(id)) => std::slice::from_ref(id),
            Self::Reference(None) => &[],
            Self::Collection(ids) => ids,
        }
    }

    /// Number of entities this navigation points at.
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    /// Check if the navigation points at nothing.
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }
}

/// One in-memory entity instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub(crate) entity_type: SmolStr,
    pub(crate) key: Key,
    pub(crate) attributes: IndexMap<SmolStr, Value>,
    pub(crate) navigations: IndexMap<SmolStr, Navigation>,
}

impl Entity {
    pub(crate) fn new(entity_type: SmolStr, key: Key, attributes: IndexMap<SmolStr, Value>) -> Self {
        Self {
            entity_type,
            key,
            attributes,
            navigations: IndexMap::new(),
        }
    }

    /// The entity type name.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The primary key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Get a scalar attribute.
    pub fn attribute(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    /// All scalar attributes.
    pub fn attributes(&self) -> &IndexMap<SmolStr, Value> {
        &self.attributes
    }

    /// Loaded state of a navigation, `None` if never loaded.
    pub fn navigation(&self, name: &str) -> Option<&Navigation> {
        self.navigations.get(name)
    }

    /// All loaded navigations.
    pub fn navigations(&self) -> impl Iterator<Item = (&str, &Navigation)> {
        self.navigations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check if a navigation has been loaded (including known-empty).
    pub fn is_loaded(&self, name: &str) -> bool {
        self.navigations.contains_key(name)
    }

    /// The target of a loaded reference.
    ///
    /// `None` when the reference is not loaded, known-empty, or a collection.
    pub fn reference(&self, name: &str) -> Option<EntityId> {
        match self.navigations.get(name) {
            Some(Navigation::Reference(id)) => *id,
            _ => None,
        }
    }

    /// Members of a loaded collection, `None` when not loaded.
    pub fn collection(&self, name: &str) -> Option<&[EntityId]> {
        match self.navigations.get(name) {
            Some(Navigation::Collection(ids)) => Some(ids),
            _ => None,
        }
    }
}
