//! Breadth-first graph resolution.
//!
//! [`GraphResolver::resolve`] walks an [`InclusionTree`] level by level. For
//! every node it gathers the distinct join keys of the entities that reached
//! it, issues one batched fetch, merges the rows through the identity map
//! and wires the navigation on every parent. The children become the
//! frontier of the node's own children on the next level.
//!
//! With roots `[blog1, blog2, blog3]` and the tree `Posts { Author, Tags }`:
//!
//! ```text
//! level 0: Blog.Posts   keys {1, 2, 3}           -> 9 posts
//! level 1: Post.Author  keys {author_id of 9}    -> authors
//!          Post.Tags    keys {9 post keys}       -> tags
//! ```
//!
//! Three fetches, whatever the number of blogs.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LoaderConfig;
use crate::error::{LoadError, LoadResult};
use crate::fetch::{BatchFetcher, FetchRequest};
use crate::relations::{Cardinality, ForeignKey, IncludeNode, InclusionTree, NavigationEdge};
use crate::session::{EntityId, LoadSession};
use crate::value::{Key, Value};

/// Counters collected during a resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Calls made to the batch fetcher.
    pub fetches: usize,
    /// Rows returned by the fetcher.
    pub rows_fetched: usize,
    /// Entities newly added to the session.
    pub entities_added: usize,
    /// Stored attributes overwritten by differing fetched values.
    pub identity_conflicts: usize,
    /// Tree levels processed.
    pub levels: usize,
    /// Tree nodes not fetched because no parent reached them.
    pub skipped_nodes: usize,
    /// Wall time of the resolve.
    pub elapsed: Duration,
}

impl ResolveStats {
    fn record(&mut self, load: &EdgeLoad) {
        self.fetches += usize::from(load.fetched);
        self.rows_fetched += load.rows;
        self.entities_added += load.inserted;
        self.identity_conflicts += load.conflicts;
    }
}

/// How an edge load treats a collection that is already populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wiring {
    /// Keep existing members and append new ones.
    Merge,
    /// Start from an empty collection.
    Replace,
}

/// Result of loading one edge for a set of parents.
#[derive(Debug, Default)]
pub(crate) struct EdgeLoad {
    /// Distinct children, in fetch order.
    pub children: Vec<EntityId>,
    /// Whether the fetcher was called.
    pub fetched: bool,
    pub rows: usize,
    pub inserted: usize,
    pub conflicts: usize,
}

/// Resolves inclusion trees against one batch fetcher.
#[derive(Debug)]
pub struct GraphResolver<'a, F: ?Sized> {
    fetcher: &'a F,
    config: &'a LoaderConfig,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, F: BatchFetcher + ?Sized> GraphResolver<'a, F> {
    /// Create a resolver.
    pub fn new(fetcher: &'a F, config: &'a LoaderConfig) -> Self {
        Self {
            fetcher,
            config,
            cancel: None,
        }
    }

    /// Stop before the next level once `token` is cancelled.
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancellationToken::is_cancelled)
    }

    /// Populate every navigation named by `tree` for `roots` and their descendants.
    ///
    /// Roots are deduplicated and must all be of the tree's root type. A
    /// failed fetch or a cancellation returns an error; levels completed
    /// before it stay wired.
    pub async fn resolve(
        &self,
        session: &mut LoadSession,
        roots: &[EntityId],
        tree: &InclusionTree,
    ) -> LoadResult<ResolveStats> {
        let started = Instant::now();
        let mut stats = ResolveStats::default();

        let mut distinct = IndexSet::with_capacity(roots.len());
        for &id in roots {
            let entity = session.entity(id)?;
            if entity.entity_type() != tree.root_type() {
                return Err(LoadError::root_type_mismatch(tree.root_type(), entity.entity_type())
                    .with_context("resolve"));
            }
            distinct.insert(id);
        }
        let roots: Vec<EntityId> = distinct.into_iter().collect();

        let mut level: Vec<(&IncludeNode, Vec<EntityId>)> = tree.nodes().map(|node| (node, roots.clone())).collect();

        while !level.is_empty() {
            if self.is_cancelled() {
                debug!(levels = stats.levels, fetches = stats.fetches, "resolve cancelled");
                return Err(LoadError::cancelled(stats.levels));
            }

            let mut next = Vec::new();
            for (node, frontier) in level {
                if frontier.is_empty() {
                    stats.skipped_nodes += node.subtree_len();
                    crate::weft_trace!(navigation = %node.edge().qualified_name(), "empty frontier, subtree skipped");
                    continue;
                }

                let load = load_edge(self.fetcher, self.config, session, node.edge(), &frontier, Wiring::Merge).await?;
                stats.record(&load);
                for child in node.children() {
                    next.push((child, load.children.clone()));
                }
            }

            stats.levels += 1;
            level = next;
        }

        stats.elapsed = started.elapsed();
        debug!(
            root_type = tree.root_type(),
            roots = roots.len(),
            fetches = stats.fetches,
            rows = stats.rows_fetched,
            levels = stats.levels,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "resolve complete"
        );
        Ok(stats)
    }
}

/// Join key of `entity` for `edge`, `None` when the parent cannot have a target.
fn join_key(edge: &NavigationEdge, key: &Key, attribute: Option<&Value>) -> Option<Key> {
    match &edge.foreign_key {
        ForeignKey::Owned { .. } => attribute.and_then(Value::as_key),
        ForeignKey::Inverse { .. } | ForeignKey::JoinTable(_) => Some(key.clone()),
    }
}

/// Load `edge` for `parents` with a single fetch and wire the results.
///
/// Every parent ends with the navigation loaded: a collection (possibly
/// empty) for `Many`, a reference or the known-empty marker for `One`.
/// Nothing is wired if the fetch fails.
pub(crate) async fn load_edge<F: BatchFetcher + ?Sized>(
    fetcher: &F,
    config: &LoaderConfig,
    session: &mut LoadSession,
    edge: &NavigationEdge,
    parents: &[EntityId],
    wiring: Wiring,
) -> LoadResult<EdgeLoad> {
    let fk_column = match &edge.foreign_key {
        ForeignKey::Owned { column } => Some(column.as_str()),
        _ => None,
    };

    let mut groups: IndexMap<Key, SmallVec<[EntityId; 1]>> = IndexMap::new();
    for &parent in parents {
        let entity = session.entity(parent)?;
        let attribute = fk_column.and_then(|c| entity.attribute(c));
        if let Some(key) = join_key(edge, entity.key(), attribute) {
            let group = groups.entry(key).or_default();
            if !group.contains(&parent) {
                group.push(parent);
            }
        }
    }

    let mut load = EdgeLoad::default();
    let rows = if groups.is_empty() {
        Vec::new()
    } else {
        let keys: Vec<Key> = groups.keys().cloned().collect();
        let started = Instant::now();
        let rows = fetcher.fetch_children(FetchRequest::new(edge, &keys)).await?;
        let elapsed = started.elapsed();
        load.fetched = true;

        let navigation = edge.qualified_name();
        debug!(
            navigation = %navigation,
            keys = keys.len(),
            rows = rows.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "batch fetch"
        );
        if elapsed > config.slow_fetch_threshold() {
            warn!(
                navigation = %navigation,
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = config.slow_fetch_threshold_ms,
                "slow batch fetch"
            );
        }
        rows
    };
    load.rows = rows.len();

    for &parent in parents {
        match (edge.cardinality, wiring) {
            (Cardinality::Many, Wiring::Merge) => session.ensure_collection(parent, &edge.name),
            (Cardinality::Many, Wiring::Replace) => session.replace_collection(parent, &edge.name, Vec::new()),
            (Cardinality::One, _) => session.set_reference(parent, &edge.name, None),
        }
    }

    let mut children = IndexSet::new();
    let mut filled: HashSet<Key> = HashSet::new();
    for child in rows {
        let Some(group) = groups.get(&child.parent_key) else {
            warn!(
                navigation = %edge.qualified_name(),
                parent_key = %child.parent_key,
                "fetcher returned a row for a key that was not requested"
            );
            continue;
        };
        if edge.cardinality.is_one() && !filled.insert(child.parent_key.clone()) {
            warn!(
                navigation = %edge.qualified_name(),
                parent_key = %child.parent_key,
                child_key = %child.row.key,
                "extra row for a reference navigation ignored"
            );
            continue;
        }

        let merged = session.merge(&edge.target, child.row, config.log_identity_conflicts);
        load.inserted += usize::from(merged.outcome.is_inserted());
        load.conflicts += merged.outcome.conflicts();
        children.insert(merged.id);

        for &parent in group {
            match edge.cardinality {
                Cardinality::Many => {
                    session.push_unique(parent, &edge.name, merged.id);
                }
                Cardinality::One => session.set_reference(parent, &edge.name, Some(merged.id)),
            }
        }
    }

    load.children = children.into_iter().collect();
    Ok(load)
}
