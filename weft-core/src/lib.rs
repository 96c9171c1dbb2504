//! # weft-core
//!
//! Eager-load graph resolution for entity graphs.
//!
//! Given root entities and an inclusion tree such as `Posts.Author, Posts.Tags`,
//! the resolver populates every requested navigation with one batched fetch per
//! tree node, however many roots there are. Entities are deduplicated by an
//! identity map, so a tag shared by many posts is one instance.
//!
//! This crate provides:
//! - A schema of entity types and navigation edges with explicit foreign keys
//! - Inclusion trees with prefix merging and build-time validation
//! - The [`BatchFetcher`] boundary and an in-memory implementation
//! - Level-by-level resolution with cancellation and statistics
//! - Explicit loading and read-through navigation queries
//!
//! ## Schema
//!
//! ```rust
//! use weft_core::{JoinTableSpec, NavigationEdge, Schema};
//!
//! let mut schema = Schema::new();
//! schema
//!     .register_entity("Blog")
//!     .register_entity("Post")
//!     .register_entity("Person")
//!     .register_entity("Tag");
//! schema
//!     .register_navigation(NavigationEdge::has_many("Blog", "Posts", "Post", "blog_id"))?
//!     .register_navigation(NavigationEdge::belongs_to("Post", "Author", "Person", "author_id"))?
//!     .register_navigation(NavigationEdge::many_to_many(
//!         "Post",
//!         "Tags",
//!         "Tag",
//!         JoinTableSpec::new("post_tags", "post_id", "tag_id"),
//!     ))?;
//! # Ok::<(), weft_core::LoadError>(())
//! ```
//!
//! ## Inclusion trees
//!
//! Paths sharing a prefix are merged:
//!
//! ```rust
//! # use weft_core::{JoinTableSpec, NavigationEdge, Schema, InclusionTree};
//! # let mut schema = Schema::new();
//! # schema.register_entity("Blog").register_entity("Post").register_entity("Person").register_entity("Tag");
//! # schema
//! #     .register_navigation(NavigationEdge::has_many("Blog", "Posts", "Post", "blog_id"))?
//! #     .register_navigation(NavigationEdge::belongs_to("Post", "Author", "Person", "author_id"))?
//! #     .register_navigation(NavigationEdge::many_to_many("Post", "Tags", "Tag", JoinTableSpec::new("post_tags", "post_id", "tag_id")))?;
//! let tree = InclusionTree::builder(&schema, "Blog")
//!     .include("Posts")
//!     .then_include("Author")
//!     .include("Posts")
//!     .then_include("Tags")
//!     .build()?;
//!
//! assert_eq!(tree.node_count(), 3);
//! assert_eq!(tree.paths(), vec!["Posts", "Posts.Author", "Posts.Tags"]);
//! # Ok::<(), weft_core::LoadError>(())
//! ```
//!
//! ## Resolving
//!
//! ```rust,ignore
//! let mut ctx = LoadContext::new(schema, store);
//! let blogs = ctx.attach_all("Blog", roots)?;
//! let stats = ctx.resolve(&blogs, &tree).await?;
//! assert_eq!(stats.fetches, 3);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod relations;
pub mod session;
pub mod types;
pub mod value;

pub use config::{LoaderConfig, LoaderOverride};
pub use context::{CollectionEntry, ContextQuery, EntityEntry, LoadContext, ReferenceEntry};
pub use error::{ErrorCode, ErrorContext, LoadError, LoadResult, Suggestion};
pub use fetch::{
    BatchFetcher, BoxFuture, ChildQuery, ChildRow, EntityRow, FetchRecord, FetchRequest, InMemoryStore,
};
pub use filter::Filter;
pub use loader::{
    GraphResolver, LoadOutcome, NavigationQuery, ResolveStats, load_collection, load_reference,
    query_collection,
};
pub use relations::{
    Cardinality, DEFAULT_MAX_INCLUDE_DEPTH, EntityTypeDef, ForeignKey, IncludeBuilder, IncludeNode,
    InclusionTree, JoinTableSpec, NavigationEdge, Schema,
};
pub use session::{Entity, EntityId, IdentityMap, LoadSession, MergeOutcome, Merged, Navigation};
pub use types::{OrderByField, Pagination, SortOrder};
pub use value::{Key, Value};

// Cancellation tokens are part of the public API.
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::LoaderConfig;
    pub use crate::context::LoadContext;
    pub use crate::error::{LoadError, LoadResult};
    pub use crate::fetch::{BatchFetcher, BoxFuture, ChildRow, EntityRow, FetchRequest, InMemoryStore};
    pub use crate::filter::Filter;
    pub use crate::loader::{LoadOutcome, ResolveStats};
    pub use crate::relations::{Cardinality, ForeignKey, InclusionTree, JoinTableSpec, NavigationEdge, Schema};
    pub use crate::session::{Entity, EntityId, LoadSession, Navigation};
    pub use crate::types::{OrderByField, SortOrder};
    pub use crate::value::{Key, Value};
}
