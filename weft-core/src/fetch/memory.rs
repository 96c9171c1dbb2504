//! In-memory batch fetcher.
//!
//! Holds rows per entity type plus join tables, answers batched fetches
//! exactly like a store would, and records every call so callers can assert
//! how many round trips a load took.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use tracing::trace;

use crate::error::{LoadError, LoadResult};
use crate::relations::ForeignKey;
use crate::types::compare_rows;
use crate::value::Key;

use super::{BatchFetcher, BoxFuture, ChildQuery, ChildRow, EntityRow, FetchRequest};

/// One recorded call to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRecord {
    /// Qualified navigation name, e.g. `Blog.Posts`.
    pub navigation: String,
    /// Join keys requested.
    pub keys: Vec<Key>,
    /// Whether the call carried query restrictions.
    pub restricted: bool,
    /// Whether the call was a count.
    pub count: bool,
}

#[derive(Debug, Default)]
struct Tables {
    rows: IndexMap<SmolStr, Vec<EntityRow>>,
    links: IndexMap<SmolStr, Vec<(Key, Key)>>,
}

/// A [`BatchFetcher`] over rows kept in memory.
///
/// All methods take `&self`, so a store shared with a loader can still be
/// modified by the test or demo driving it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    failures: Mutex<HashMap<String, String>>,
    latency: Mutex<Option<Duration>>,
    log: Mutex<Vec<FetchRecord>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row of `entity_type`.
    pub fn insert(&self, entity_type: &str, row: EntityRow) -> &Self {
        let mut tables = self.tables.write();
        let rows = tables.rows.entry(SmolStr::new(entity_type)).or_default();
        match rows.iter_mut().find(|r| r.key == row.key) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
        self
    }

    /// Insert many rows of `entity_type`.
    pub fn insert_many(&self, entity_type: &str, rows: impl IntoIterator<Item = EntityRow>) -> &Self {
        for row in rows {
            self.insert(entity_type, row);
        }
        self
    }

    /// Remove a row. Returns whether it existed.
    pub fn remove(&self, entity_type: &str, key: &Key) -> bool {
        let mut tables = self.tables.write();
        let Some(rows) = tables.rows.get_mut(entity_type) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|r| &r.key != key);
        rows.len() != before
    }

    /// Add a row to a join table.
    pub fn link(&self, join_table: &str, source: impl Into<Key>, target: impl Into<Key>) -> &Self {
        self.tables
            .write()
            .links
            .entry(SmolStr::new(join_table))
            .or_default()
            .push((source.into(), target.into()));
        self
    }

    /// Rows of `entity_type` matching `query`, in insertion order unless ordered.
    ///
    /// This stands in for the root query a caller issues before resolving;
    /// it is not recorded in the fetch log.
    pub fn query_roots(&self, entity_type: &str, query: &ChildQuery) -> Vec<EntityRow> {
        let tables = self.tables.read();
        let mut rows: Vec<EntityRow> = tables
            .rows
            .get(entity_type)
            .map(|rows| rows.iter().filter(|r| query.filter.matches(r)).cloned().collect())
            .unwrap_or_default();
        if !query.order_by.is_empty() {
            rows.sort_by(|a, b| compare_rows(&query.order_by, a, b));
        }
        query.pagination.apply(rows)
    }

    /// Make every fetch of `navigation` (qualified, e.g. `Post.Tags`) fail.
    pub fn fail_navigation(&self, navigation: &str, message: impl Into<String>) {
        self.failures.lock().insert(navigation.to_string(), message.into());
    }

    /// Delay every fetch by `latency`, or stop delaying with `None`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// All calls recorded so far.
    pub fn fetch_log(&self) -> Vec<FetchRecord> {
        self.log.lock().clone()
    }

    /// Number of calls recorded so far.
    pub fn fetch_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Forget recorded calls.
    pub fn reset_log(&self) {
        self.log.lock().clear();
    }

    fn record(&self, request: &FetchRequest<'_>, count: bool) -> LoadResult<()> {
        let navigation = request.edge.qualified_name();
        trace!(navigation = %navigation, keys = request.keys.len(), count, "in-memory fetch");
        let failure = self.failures.lock().get(&navigation).cloned();
        self.log.lock().push(FetchRecord {
            navigation: navigation.clone(),
            keys: request.keys.to_vec(),
            restricted: request.query.is_some_and(|q| !q.is_empty()),
            count,
        });
        match failure {
            Some(message) => Err(LoadError::fetch_failed(navigation, message)),
            None => Ok(()),
        }
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn select(&self, request: &FetchRequest<'_>) -> Vec<ChildRow> {
        let edge = request.edge;
        let keys: HashSet<&Key> = request.keys.iter().collect();
        let tables = self.tables.read();
        let targets: &[EntityRow] = tables
            .rows
            .get(edge.target.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut children: Vec<ChildRow> = match &edge.foreign_key {
            ForeignKey::Inverse { column } => targets
                .iter()
                .filter_map(|row| {
                    let fk = row.get(column)?.as_key()?;
                    keys.contains(&fk).then(|| ChildRow::new(fk, row.clone()))
                })
                .collect(),
            ForeignKey::Owned { .. } => targets
                .iter()
                .filter(|row| keys.contains(&row.key))
                .map(|row| ChildRow::new(row.key.clone(), row.clone()))
                .collect(),
            ForeignKey::JoinTable(jt) => {
                let by_key: HashMap<&Key, &EntityRow> = targets.iter().map(|r| (&r.key, r)).collect();
                tables
                    .links
                    .get(jt.table_name.as_str())
                    .into_iter()
                    .flatten()
                    .filter(|(source, _)| keys.contains(source))
                    .filter_map(|(source, target)| {
                        by_key
                            .get(target)
                            .map(|row| ChildRow::new(source.clone(), (*row).clone()))
                    })
                    .collect()
            }
        };

        if let Some(query) = request.query {
            children.retain(|c| query.filter.matches(&c.row));
            if !query.order_by.is_empty() {
                children.sort_by(|a, b| compare_rows(&query.order_by, &a.row, &b.row));
            }
            children = query.pagination.apply(children);
        }
        children
    }
}

impl BatchFetcher for InMemoryStore {
    fn fetch_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<Vec<ChildRow>>> {
        Box::pin(async move {
            self.delay().await;
            self.record(&request, false)?;
            Ok(self.select(&request))
        })
    }

    fn count_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<u64>> {
        Box::pin(async move {
            self.delay().await;
            self.record(&request, true)?;
            Ok(self.select(&request).len() as u64)
        })
    }
}
