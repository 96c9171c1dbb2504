//! The batch fetch boundary.
//!
//! [`BatchFetcher`] is the only I/O the loader performs. Given a navigation
//! edge and the full set of join keys for one level of a load, it returns
//! every matching child row in a single logical call. Implementations may
//! talk to SQL, HTTP or memory; the loader treats them as black boxes.
//!
//! ## Join keys
//!
//! Each returned [`ChildRow`] names the `parent_key` it belongs to:
//! - `ForeignKey::Inverse` and `ForeignKey::JoinTable`: the parent's key
//! - `ForeignKey::Owned`: the foreign key value stored on the parent, which
//!   is the child's own key
//!
//! ## Example
//!
//! ```rust,ignore
//! impl BatchFetcher for PgFetcher {
//!     fn fetch_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<Vec<ChildRow>>> {
//!         Box::pin(async move {
//!             let sql = self.children_sql(request.edge, request.keys.len());
//!             let rows = self.pool.query(&sql, request.keys).await
//!                 .map_err(|e| LoadError::fetch_failed(request.edge.qualified_name(), e.to_string()))?;
//!             Ok(rows.into_iter().map(ChildRow::from).collect())
//!         })
//!     }
//! }
//! ```

mod memory;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::LoadResult;
use crate::filter::Filter;
use crate::relations::NavigationEdge;
use crate::types::{OrderByField, Pagination};
use crate::value::{Key, Value};

pub use memory::{FetchRecord, InMemoryStore};

/// A boxed future returned by fetchers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The scalar content of one entity as delivered by a fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    /// Primary key.
    pub key: Key,
    /// Scalar attributes by column name.
    pub attributes: IndexMap<SmolStr, Value>,
}

impl EntityRow {
    /// Create a row with no attributes.
    pub fn new(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Add an attribute.
    pub fn with(mut self, column: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    /// Get an attribute.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }
}

/// A child row tagged with the join key of the parent it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRow {
    /// Join key on the parent side.
    pub parent_key: Key,
    /// The child entity.
    pub row: EntityRow,
}

impl ChildRow {
    /// Create a child row.
    pub fn new(parent_key: impl Into<Key>, row: EntityRow) -> Self {
        Self {
            parent_key: parent_key.into(),
            row,
        }
    }
}

/// Filtering, ordering and pagination applied to the children of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildQuery {
    /// Filter over child attributes.
    pub filter: Filter,
    /// Ordering, applied left to right.
    pub order_by: Vec<OrderByField>,
    /// Skip/take over the filtered, ordered result.
    pub pagination: Pagination,
}

impl ChildQuery {
    /// Check if the query restricts nothing.
    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.order_by.is_empty() && self.pagination.is_empty()
    }
}

/// One batched fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// The navigation being loaded.
    pub edge: &'a NavigationEdge,
    /// Distinct join keys, in first-seen order.
    pub keys: &'a [Key],
    /// Restrictions for navigation queries; `None` for loads.
    pub query: Option<&'a ChildQuery>,
}

impl<'a> FetchRequest<'a> {
    /// Create an unrestricted request.
    pub fn new(edge: &'a NavigationEdge, keys: &'a [Key]) -> Self {
        Self { edge, keys, query: None }
    }

    /// Attach query restrictions.
    pub fn with_query(mut self, query: &'a ChildQuery) -> Self {
        self.query = Some(query);
        self
    }
}

/// Fetches all children of a key set in one call.
pub trait BatchFetcher: Send + Sync {
    /// Fetch every child row of `request.edge` whose join key is in `request.keys`.
    ///
    /// For single-valued edges at most one row per key is expected.
    fn fetch_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<Vec<ChildRow>>>;

    /// Count the children `fetch_children` would return.
    fn count_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<u64>> {
        Box::pin(async move { Ok(self.fetch_children(request).await?.len() as u64) })
    }
}

impl<T: BatchFetcher + ?Sized> BatchFetcher for &T {
    fn fetch_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<Vec<ChildRow>>> {
        (**self).fetch_children(request)
    }

    fn count_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<u64>> {
        (**self).count_children(request)
    }
}

impl<T: BatchFetcher + ?Sized> BatchFetcher for Arc<T> {
    fn fetch_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<Vec<ChildRow>>> {
        (**self).fetch_children(request)
    }

    fn count_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<u64>> {
        (**self).count_children(request)
    }
}

impl<T: BatchFetcher + ?Sized> BatchFetcher for Box<T> {
    fn fetch_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<Vec<ChildRow>>> {
        (**self).fetch_children(request)
    }

    fn count_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<u64>> {
        (**self).count_children(request)
    }
}
