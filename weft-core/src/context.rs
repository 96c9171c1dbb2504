//! A session bundled with its fetcher and configuration.
//!
//! [`LoadContext`] is the convenient entry point: it owns one
//! [`LoadSession`], the [`BatchFetcher`] feeding it and a [`LoaderConfig`],
//! and exposes eager includes and per-entity entries.
//!
//! ```rust,ignore
//! let mut ctx = LoadContext::new(schema, store);
//! let blogs = ctx.attach_all("Blog", rows)?;
//!
//! let tree = ctx.include("Blog").include("Posts").then_include("Author").build()?;
//! ctx.resolve(&blogs, &tree).await?;
//!
//! ctx.entry(blogs[0]).reference("Owner").load().await?;
//! let good = ctx
//!     .entry(blogs[0])
//!     .collection("Posts")
//!     .query()?
//!     .filter(Filter::gt("rating", 3))
//!     .count()
//!     .await?;
//! ```

use std::sync::Arc;

use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;

use crate::config::LoaderConfig;
use crate::error::LoadResult;
use crate::fetch::{BatchFetcher, EntityRow};
use crate::filter::Filter;
use crate::loader::{GraphResolver, LoadOutcome, NavigationQuery, ResolveStats, load_collection, load_reference};
use crate::relations::{IncludeBuilder, InclusionTree, Schema};
use crate::session::{Entity, EntityId, LoadSession};
use crate::types::OrderByField;

/// One load session together with its fetcher and configuration.
#[derive(Debug)]
pub struct LoadContext<F> {
    fetcher: F,
    config: LoaderConfig,
    session: LoadSession,
    cancel: CancellationToken,
}

impl<F: BatchFetcher> LoadContext<F> {
    /// Create a context with default configuration.
    pub fn new(schema: impl Into<Arc<Schema>>, fetcher: F) -> Self {
        Self {
            fetcher,
            config: LoaderConfig::default(),
            session: LoadSession::new(schema.into()),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The session.
    pub fn session(&self) -> &LoadSession {
        &self.session
    }

    /// The session, mutably.
    pub fn session_mut(&mut self) -> &mut LoadSession {
        &mut self.session
    }

    /// Give up the fetcher and keep the loaded graph.
    pub fn into_session(self) -> LoadSession {
        self.session
    }

    /// The schema.
    pub fn schema(&self) -> &Schema {
        self.session.schema()
    }

    /// A token that stops running and future resolves once cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Replace a cancelled token with a fresh one.
    pub fn reset_cancellation(&mut self) {
        self.cancel = CancellationToken::new();
    }

    /// Start an inclusion tree rooted at `root_type`, limited by `max_include_depth`.
    pub fn include(&self, root_type: impl Into<SmolStr>) -> IncludeBuilder<'_> {
        IncludeBuilder::new(self.session.schema(), root_type).max_depth(self.config.max_include_depth)
    }

    /// Attach a root row.
    pub fn attach(&mut self, entity_type: &str, row: EntityRow) -> LoadResult<EntityId> {
        self.session.attach(entity_type, row)
    }

    /// Attach root rows.
    pub fn attach_all(
        &mut self,
        entity_type: &str,
        rows: impl IntoIterator<Item = EntityRow>,
    ) -> LoadResult<Vec<EntityId>> {
        self.session.attach_all(entity_type, rows)
    }

    /// Get an entity by handle.
    pub fn entity(&self, id: EntityId) -> LoadResult<&Entity> {
        self.session.entity(id)
    }

    /// Eagerly load `tree` for `roots`.
    pub async fn resolve(&mut self, roots: &[EntityId], tree: &InclusionTree) -> LoadResult<ResolveStats> {
        GraphResolver::new(&self.fetcher, &self.config)
            .with_cancellation(&self.cancel)
            .resolve(&mut self.session, roots, tree)
            .await
    }

    /// Navigations of one entity.
    pub fn entry(&mut self, id: EntityId) -> EntityEntry<'_, F> {
        EntityEntry { ctx: self, id }
    }
}

/// Access to the navigations of one entity.
#[derive(Debug)]
pub struct EntityEntry<'c, F> {
    ctx: &'c mut LoadContext<F>,
    id: EntityId,
}

impl<'c, F: BatchFetcher> EntityEntry<'c, F> {
    /// A collection navigation.
    pub fn collection(self, navigation: impl Into<SmolStr>) -> CollectionEntry<'c, F> {
        CollectionEntry {
            ctx: self.ctx,
            id: self.id,
            navigation: navigation.into(),
        }
    }

    /// A reference navigation.
    pub fn reference(self, navigation: impl Into<SmolStr>) -> ReferenceEntry<'c, F> {
        ReferenceEntry {
            ctx: self.ctx,
            id: self.id,
            navigation: navigation.into(),
        }
    }
}

/// One collection navigation of one entity.
#[derive(Debug)]
pub struct CollectionEntry<'c, F> {
    ctx: &'c mut LoadContext<F>,
    id: EntityId,
    navigation: SmolStr,
}

impl<'c, F: BatchFetcher> CollectionEntry<'c, F> {
    /// Check if the collection is loaded.
    pub fn is_loaded(&self) -> bool {
        self.ctx
            .session
            .get(self.id)
            .is_some_and(|e| e.is_loaded(&self.navigation))
    }

    /// Load the collection unless already loaded.
    pub async fn load(self) -> LoadResult<LoadOutcome> {
        let ctx = self.ctx;
        load_collection(&mut ctx.session, &ctx.fetcher, &ctx.config, self.id, &self.navigation, false).await
    }

    /// Refetch the collection, replacing its members.
    pub async fn reload(self) -> LoadResult<LoadOutcome> {
        let ctx = self.ctx;
        load_collection(&mut ctx.session, &ctx.fetcher, &ctx.config, self.id, &self.navigation, true).await
    }

    /// Query the collection through the fetcher without loading it.
    pub fn query(self) -> LoadResult<ContextQuery<'c, F>> {
        let query = NavigationQuery::new(&self.ctx.session, self.id, &self.navigation)?;
        Ok(ContextQuery { ctx: self.ctx, query })
    }
}

/// One reference navigation of one entity.
#[derive(Debug)]
pub struct ReferenceEntry<'c, F> {
    ctx: &'c mut LoadContext<F>,
    id: EntityId,
    navigation: SmolStr,
}

impl<'c, F: BatchFetcher> ReferenceEntry<'c, F> {
    /// Check if the reference is loaded, including known-empty.
    pub fn is_loaded(&self) -> bool {
        self.ctx
            .session
            .get(self.id)
            .is_some_and(|e| e.is_loaded(&self.navigation))
    }

    /// The loaded target, if any.
    pub fn get(&self) -> Option<EntityId> {
        self.ctx.session.get(self.id)?.reference(&self.navigation)
    }

    /// Load the reference unless already loaded.
    pub async fn load(self) -> LoadResult<LoadOutcome> {
        let ctx = self.ctx;
        load_reference(&mut ctx.session, &ctx.fetcher, &ctx.config, self.id, &self.navigation, false).await
    }

    /// Refetch the reference.
    pub async fn reload(self) -> LoadResult<LoadOutcome> {
        let ctx = self.ctx;
        load_reference(&mut ctx.session, &ctx.fetcher, &ctx.config, self.id, &self.navigation, true).await
    }
}

/// A [`NavigationQuery`] bound to a context.
#[derive(Debug)]
pub struct ContextQuery<'c, F> {
    ctx: &'c mut LoadContext<F>,
    query: NavigationQuery,
}

impl<'c, F: BatchFetcher> ContextQuery<'c, F> {
    /// Add a filter.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.query = self.query.filter(filter);
        self
    }

    /// Add an ordering column.
    pub fn order_by(mut self, field: OrderByField) -> Self {
        self.query = self.query.order_by(field);
        self
    }

    /// Skip the first `n` children.
    pub fn skip(mut self, n: u64) -> Self {
        self.query = self.query.skip(n);
        self
    }

    /// Return at most `n` children.
    pub fn take(mut self, n: u64) -> Self {
        self.query = self.query.take(n);
        self
    }

    /// Count matching children.
    pub async fn count(&self) -> LoadResult<u64> {
        self.query.count(&self.ctx.fetcher).await
    }

    /// Fetch matching children as detached rows.
    pub async fn fetch_rows(&self) -> LoadResult<Vec<EntityRow>> {
        self.query.fetch_rows(&self.ctx.fetcher).await
    }

    /// Fetch matching children into the session.
    pub async fn to_list(self) -> LoadResult<Vec<EntityId>> {
        let ctx = self.ctx;
        let log_conflicts = ctx.config.log_identity_conflicts;
        self.query.to_list(&mut ctx.session, &ctx.fetcher, log_conflicts).await
    }
}
