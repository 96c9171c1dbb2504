//! Navigation edge specifications and the schema registry.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::{LoadError, LoadResult};

/// How many entities a navigation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Single-valued navigation (a reference).
    One,
    /// Multi-valued navigation (a collection).
    Many,
}

impl Cardinality {
    /// Check if this navigation holds a collection.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many)
    }

    /// Check if this navigation holds a single reference.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::One)
    }

    /// Human readable name used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::One => "reference",
            Self::Many => "collection",
        }
    }
}

/// How the join predicate between source and target is derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForeignKey {
    /// Target rows carry `column = source.key` (has-many / has-one).
    Inverse {
        /// Foreign key column on the target.
        column: SmolStr,
    },
    /// The source row carries `column = target.key` (belongs-to).
    Owned {
        /// Foreign key column on the source.
        column: SmolStr,
    },
    /// Rows of a join table link source keys to target keys.
    JoinTable(JoinTableSpec),
}

impl ForeignKey {
    /// Check if the join key is read from the source entity's attributes.
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned { .. })
    }
}

/// Specification for a join table (many-to-many).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinTableSpec {
    /// Name of the join table.
    pub table_name: SmolStr,
    /// Column referencing the source entity.
    pub source_column: SmolStr,
    /// Column referencing the target entity.
    pub target_column: SmolStr,
}

impl JoinTableSpec {
    /// Create a new join table spec.
    pub fn new(
        table_name: impl Into<SmolStr>,
        source_column: impl Into<SmolStr>,
        target_column: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// A named relationship from one entity type to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationEdge {
    /// Entity type declaring the navigation.
    pub source: SmolStr,
    /// Name of the navigation on the source type.
    pub name: SmolStr,
    /// Entity type the navigation points at.
    pub target: SmolStr,
    /// Single- or multi-valued.
    pub cardinality: Cardinality,
    /// How the join predicate is derived.
    pub foreign_key: ForeignKey,
}

impl NavigationEdge {
    /// Create a navigation edge.
    pub fn new(
        source: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        cardinality: Cardinality,
        foreign_key: ForeignKey,
    ) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            target: target.into(),
            cardinality,
            foreign_key,
        }
    }

    /// Collection whose rows point back at the source (`Blog.Posts` via `Post.blog_id`).
    pub fn has_many(
        source: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        column: impl Into<SmolStr>,
    ) -> Self {
        Self::new(source, name, target, Cardinality::Many, ForeignKey::Inverse { column: column.into() })
    }

    /// Reference whose row points back at the source (`Person.Photo` via `Photo.person_id`).
    pub fn has_one(
        source: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        column: impl Into<SmolStr>,
    ) -> Self {
        Self::new(source, name, target, Cardinality::One, ForeignKey::Inverse { column: column.into() })
    }

    /// Reference stored on the source (`Post.Author` via `Post.author_id`).
    pub fn belongs_to(
        source: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        column: impl Into<SmolStr>,
    ) -> Self {
        Self::new(source, name, target, Cardinality::One, ForeignKey::Owned { column: column.into() })
    }

    /// Collection linked through a join table (`Post.Tags` via `post_tags`).
    pub fn many_to_many(
        source: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        target: impl Into<SmolStr>,
        join_table: JoinTableSpec,
    ) -> Self {
        Self::new(source, name, target, Cardinality::Many, ForeignKey::JoinTable(join_table))
    }

    /// Qualified name, e.g. `Blog.Posts`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.source, self.name)
    }
}

impl fmt::Display for NavigationEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.source, self.name, self.target)?;
        if self.cardinality.is_many() {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// An entity type and the navigations it declares.
#[derive(Debug, Clone, Default)]
pub struct EntityTypeDef {
    name: SmolStr,
    navigations: IndexMap<SmolStr, Arc<NavigationEdge>>,
}

impl EntityTypeDef {
    /// Name of the entity type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a navigation by name.
    pub fn navigation(&self, name: &str) -> Option<&Arc<NavigationEdge>> {
        self.navigations.get(name)
    }

    /// All navigations in registration order.
    pub fn navigations(&self) -> impl Iterator<Item = &Arc<NavigationEdge>> {
        self.navigations.values()
    }

    /// Names of all navigations in registration order.
    pub fn navigation_names(&self) -> impl Iterator<Item = &str> {
        self.navigations.keys().map(|k| k.as_str())
    }
}

/// Registry of entity types and their navigation edges.
///
/// Foreign key mappings are declared explicitly per edge; nothing is
/// inferred from naming conventions.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: IndexMap<SmolStr, EntityTypeDef>,
}

impl Schema {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type. Registering the same type twice is a no-op.
    pub fn register_entity(&mut self, name: impl Into<SmolStr>) -> &mut Self {
        let name = name.into();
        self.entities
            .entry(name.clone())
            .or_insert_with(|| EntityTypeDef {
                name,
                navigations: IndexMap::new(),
            });
        self
    }

    /// Register a navigation edge.
    ///
    /// Both endpoint types must already be registered, the name must be
    /// unique on the source type and an owned foreign key requires a
    /// single-valued navigation.
    pub fn register_navigation(&mut self, edge: NavigationEdge) -> LoadResult<&mut Self> {
        if !self.entities.contains_key(&edge.target) {
            return Err(LoadError::unknown_entity_type(edge.target.as_str())
                .with_context(format!("Registering navigation {}", edge.qualified_name())));
        }
        if edge.foreign_key.is_owned() && edge.cardinality.is_many() {
            return Err(LoadError::invalid_foreign_key(
                edge.source.as_str(),
                edge.name.as_str(),
                "an owned foreign key can only back a single-valued navigation",
            ));
        }
        let column_is_empty = match &edge.foreign_key {
            ForeignKey::Inverse { column } | ForeignKey::Owned { column } => column.is_empty(),
            ForeignKey::JoinTable(jt) => {
                jt.table_name.is_empty() || jt.source_column.is_empty() || jt.target_column.is_empty()
            }
        };
        if column_is_empty {
            return Err(LoadError::invalid_foreign_key(
                edge.source.as_str(),
                edge.name.as_str(),
                "foreign key columns must be named",
            ));
        }

        let Some(def) = self.entities.get_mut(&edge.source) else {
            return Err(LoadError::unknown_entity_type(edge.source.as_str())
                .with_context(format!("Registering navigation {}", edge.qualified_name())));
        };
        if def.navigations.contains_key(&edge.name) {
            return Err(LoadError::duplicate_navigation(edge.source.as_str(), edge.name.as_str()));
        }
        def.navigations.insert(edge.name.clone(), Arc::new(edge));
        Ok(self)
    }

    /// Get an entity type by name.
    pub fn entity(&self, name: &str) -> Option<&EntityTypeDef> {
        self.entities.get(name)
    }

    /// Check whether an entity type is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Look up the navigation `name` on `entity_type`.
    pub fn navigation(&self, entity_type: &str, name: &str) -> LoadResult<&Arc<NavigationEdge>> {
        let def = self
            .entity(entity_type)
            .ok_or_else(|| LoadError::unknown_entity_type(entity_type))?;
        def.navigation(name)
            .ok_or_else(|| LoadError::invalid_path(entity_type, name, def.navigation_names()))
    }

    /// All registered entity types.
    pub fn entities(&self) -> impl Iterator<Item = &EntityTypeDef> {
        self.entities.values()
    }

    /// Number of registered entity types.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
