//! Relation metadata and inclusion trees.
//!
//! This module provides the declarative side of loading related data:
//! - [`Schema`] registers entity types and their [`NavigationEdge`]s
//! - [`InclusionTree`] names which navigation paths to populate eagerly
//!
//! ## Example
//!
//! ```rust,ignore
//! // Blogs with their posts, each post's author and tags
//! let tree = InclusionTree::builder(&schema, "Blog")
//!     .include("Posts")
//!     .then_include("Author")
//!     .include("Posts")
//!     .then_include("Tags")
//!     .build()?;
//! ```

mod include;
mod spec;

pub use include::{DEFAULT_MAX_INCLUDE_DEPTH, IncludeBuilder, IncludeNode, InclusionTree};
pub use spec::{Cardinality, EntityTypeDef, ForeignKey, JoinTableSpec, NavigationEdge, Schema};
