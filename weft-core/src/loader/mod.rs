//! Loading navigations into a session.
//!
//! - [`GraphResolver`] eagerly resolves a whole [`InclusionTree`](crate::relations::InclusionTree)
//!   with one batched fetch per tree node.
//! - [`load_collection`] and [`load_reference`] load one navigation of one
//!   entity on demand.
//! - [`query_collection`] builds a [`NavigationQuery`] that reads children
//!   through the fetcher without loading the navigation.

mod explicit;
mod query;
mod resolver;

pub use explicit::{LoadOutcome, load_collection, load_reference};
pub use query::{NavigationQuery, query_collection};
pub use resolver::{GraphResolver, ResolveStats};
