//! Read-through queries over a navigation.
//!
//! A [`NavigationQuery`] asks the fetcher for the children of one entity
//! with filtering, ordering and pagination applied. It is not a load: the
//! navigation's loaded state and in-memory collection are never touched,
//! so a query can run before, after or instead of a full load.
//!
//! ```rust,ignore
//! let good_posts = query_collection(&session, blog, "Posts")?
//!     .filter(Filter::gt("rating", 3))
//!     .order_by(OrderByField::desc("rating"))
//!     .to_list(&mut session, &store, true)
//!     .await?;
//! ```

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::debug;

use super::explicit::navigation_edge;
use crate::error::LoadResult;
use crate::fetch::{BatchFetcher, ChildQuery, EntityRow, FetchRequest};
use crate::filter::Filter;
use crate::relations::{Cardinality, NavigationEdge};
use crate::session::{EntityId, LoadSession};
use crate::types::OrderByField;
use crate::value::Key;

/// A composable query over the children of one entity.
#[derive(Debug, Clone)]
pub struct NavigationQuery {
    edge: Arc<NavigationEdge>,
    parent: EntityId,
    parent_key: Key,
    query: ChildQuery,
}

/// Start a query over a collection navigation of `entity`.
pub fn query_collection(session: &LoadSession, entity: EntityId, navigation: &str) -> LoadResult<NavigationQuery> {
    NavigationQuery::new(session, entity, navigation)
}

impl NavigationQuery {
    /// Start a query over a collection navigation of `entity`.
    pub fn new(session: &LoadSession, entity: EntityId, navigation: &str) -> LoadResult<Self> {
        let edge = navigation_edge(session, entity, navigation, Cardinality::Many)?;
        let parent_key = session.entity(entity)?.key().clone();
        Ok(Self {
            edge,
            parent: entity,
            parent_key,
            query: ChildQuery::default(),
        })
    }

    /// The queried navigation.
    pub fn edge(&self) -> &NavigationEdge {
        &self.edge
    }

    /// The entity whose children are queried.
    pub fn parent(&self) -> EntityId {
        self.parent
    }

    /// The restrictions collected so far.
    pub fn child_query(&self) -> &ChildQuery {
        &self.query
    }

    /// Add a filter, combined with earlier ones using AND.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.query.filter = std::mem::take(&mut self.query.filter).and_then(filter);
        self
    }

    /// Add an ordering column.
    pub fn order_by(mut self, field: OrderByField) -> Self {
        self.query.order_by.push(field);
        self
    }

    /// Skip the first `n` children.
    pub fn skip(mut self, n: u64) -> Self {
        self.query.pagination = self.query.pagination.skip(n);
        self
    }

    /// Return at most `n` children.
    pub fn take(mut self, n: u64) -> Self {
        self.query.pagination = self.query.pagination.take(n);
        self
    }

    fn request(&self) -> FetchRequest<'_> {
        FetchRequest::new(&self.edge, std::slice::from_ref(&self.parent_key)).with_query(&self.query)
    }

    /// Count matching children.
    pub async fn count<F: BatchFetcher + ?Sized>(&self, fetcher: &F) -> LoadResult<u64> {
        let count = fetcher.count_children(self.request()).await?;
        debug!(navigation = %self.edge.qualified_name(), parent = %self.parent_key, count, "navigation count");
        Ok(count)
    }

    /// Fetch matching children as rows, without touching the session.
    pub async fn fetch_rows<F: BatchFetcher + ?Sized>(&self, fetcher: &F) -> LoadResult<Vec<EntityRow>> {
        let rows = fetcher.fetch_children(self.request()).await?;
        debug!(navigation = %self.edge.qualified_name(), parent = %self.parent_key, rows = rows.len(), "navigation query");
        Ok(rows.into_iter().map(|child| child.row).collect())
    }

    /// Fetch matching children and merge them into the session.
    ///
    /// The returned handles are the session's canonical instances, in query
    /// order. The navigation itself stays as it was.
    pub async fn to_list<F: BatchFetcher + ?Sized>(
        &self,
        session: &mut LoadSession,
        fetcher: &F,
        log_conflicts: bool,
    ) -> LoadResult<Vec<EntityId>> {
        let rows = self.fetch_rows(fetcher).await?;
        let mut ids = IndexSet::with_capacity(rows.len());
        for row in rows {
            ids.insert(session.merge(&self.edge.target, row, log_conflicts).id);
        }
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::InMemoryStore;
    use crate::relations::Schema;
    use pretty_assertions::assert_eq;

    fn setup() -> (LoadSession, InMemoryStore, EntityId) {
        let mut schema = Schema::new();
        schema.register_entity("Blog").register_entity("Post");
        schema
            .register_navigation(NavigationEdge::has_many("Blog", "Posts", "Post", "blog_id"))
            .unwrap();

        let store = InMemoryStore::new();
        for (id, rating) in [(1, 5), (2, 2), (3, 4), (4, 1)] {
            store.insert("Post", EntityRow::new(id).with("blog_id", 1).with("rating", rating));
        }
        store.insert("Post", EntityRow::new(5).with("blog_id", 2).with("rating", 5));

        let mut session = LoadSession::new(Arc::new(schema));
        let blog = session.attach("Blog", EntityRow::new(1)).unwrap();
        (session, store, blog)
    }

    #[tokio::test]
    async fn test_count_and_filter() {
        let (session, store, blog) = setup();
        let all = query_collection(&session, blog, "Posts").unwrap();
        assert_eq!(all.count(&store).await.unwrap(), 4);

        let good = all.filter(Filter::gt("rating", 3));
        assert_eq!(good.count(&store).await.unwrap(), 2);
        assert!(store.fetch_log().iter().all(|r| r.count));
    }

    #[tokio::test]
    async fn test_to_list_does_not_mark_loaded() {
        let (mut session, store, blog) = setup();
        let ids = query_collection(&session, blog, "Posts")
            .unwrap()
            .filter(Filter::gt("rating", 1))
            .order_by(OrderByField::desc("rating"))
            .skip(1)
            .take(1)
            .to_list(&mut session, &store, true)
            .await
            .unwrap();

        assert_eq!(ids, vec![session.find("Post", 3).unwrap()]);
        assert!(!session.entity(blog).unwrap().is_loaded("Posts"));
    }

    #[tokio::test]
    async fn test_fetch_rows_is_detached() {
        let (session, store, blog) = setup();
        let rows = query_collection(&session, blog, "Posts")
            .unwrap()
            .filter(Filter::lt("rating", 3))
            .fetch_rows(&store)
            .await
            .unwrap();

        let keys: Vec<_> = rows.iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec![Key::Int(2), Key::Int(4)]);
        assert_eq!(session.len(), 1);
    }
}
