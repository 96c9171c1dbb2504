//! Explicit loading of a single entity's navigation.

use std::sync::Arc;

use tracing::debug;

use super::resolver::{Wiring, load_edge};
use crate::config::LoaderConfig;
use crate::error::{LoadError, LoadResult};
use crate::fetch::BatchFetcher;
use crate::relations::{Cardinality, NavigationEdge};
use crate::session::{EntityId, LoadSession};

/// What an explicit load did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The navigation was already loaded; nothing was fetched.
    AlreadyLoaded,
    /// The navigation was (re)loaded.
    Loaded {
        /// Whether the fetcher was called. A null foreign key needs no fetch.
        fetched: bool,
        /// Entities the navigation now points at.
        count: usize,
    },
}

impl LoadOutcome {
    /// Check if the call was a no-op.
    pub fn is_already_loaded(&self) -> bool {
        matches!(self, Self::AlreadyLoaded)
    }

    /// Check if the fetcher was called.
    pub fn fetched(&self) -> bool {
        matches!(self, Self::Loaded { fetched: true, .. })
    }
}

/// Look up `navigation` on `entity` and check its cardinality.
pub(crate) fn navigation_edge(
    session: &LoadSession,
    entity: EntityId,
    navigation: &str,
    expected: Cardinality,
) -> LoadResult<Arc<NavigationEdge>> {
    let entity_type = session.entity(entity)?.entity_type();
    let edge = session.schema().navigation(entity_type, navigation)?;
    if edge.cardinality != expected {
        return Err(LoadError::cardinality_mismatch(entity_type, navigation, expected.as_str()));
    }
    Ok(Arc::clone(edge))
}

/// Load one collection navigation of one entity.
///
/// A second call without `force` is a no-op. With `force` the collection is
/// refetched and replaced; instances already in the session are reused.
pub async fn load_collection<F: BatchFetcher + ?Sized>(
    session: &mut LoadSession,
    fetcher: &F,
    config: &LoaderConfig,
    entity: EntityId,
    navigation: &str,
    force: bool,
) -> LoadResult<LoadOutcome> {
    load_navigation(session, fetcher, config, entity, navigation, Cardinality::Many, force).await
}

/// Load one reference navigation of one entity.
///
/// A reference known to be empty counts as loaded.
pub async fn load_reference<F: BatchFetcher + ?Sized>(
    session: &mut LoadSession,
    fetcher: &F,
    config: &LoaderConfig,
    entity: EntityId,
    navigation: &str,
    force: bool,
) -> LoadResult<LoadOutcome> {
    load_navigation(session, fetcher, config, entity, navigation, Cardinality::One, force).await
}

async fn load_navigation<F: BatchFetcher + ?Sized>(
    session: &mut LoadSession,
    fetcher: &F,
    config: &LoaderConfig,
    entity: EntityId,
    navigation: &str,
    expected: Cardinality,
    force: bool,
) -> LoadResult<LoadOutcome> {
    let edge = navigation_edge(session, entity, navigation, expected)?;

    if !force && session.entity(entity)?.is_loaded(navigation) {
        crate::weft_debug!(entity = %entity, navigation = %edge.qualified_name(), "already loaded");
        return Ok(LoadOutcome::AlreadyLoaded);
    }

    let wiring = if force { Wiring::Replace } else { Wiring::Merge };
    let load = load_edge(fetcher, config, session, &edge, &[entity], wiring).await?;
    let count = session
        .entity(entity)?
        .navigation(navigation)
        .map_or(0, |n| n.len());

    debug!(
        entity = %entity,
        navigation = %edge.qualified_name(),
        force,
        count,
        "explicit load"
    );
    Ok(LoadOutcome::Loaded {
        fetched: load.fetched,
        count,
    })
}
