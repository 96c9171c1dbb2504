//! Inclusion trees for eager loading.
//!
//! An [`InclusionTree`] names the navigation paths to populate, starting at
//! a root entity type. Paths sharing a prefix are merged at the shared node,
//! so `Posts.Author` and `Posts.Tags` produce one `Posts` node with two
//! children. Every name is validated against the [`Schema`] when the path is
//! added; resolving a tree never fails on a bad path.
//!
//! ```rust
//! use weft_core::{InclusionTree, NavigationEdge, Schema};
//!
//! let mut schema = Schema::new();
//! schema.register_entity("Blog").register_entity("Post").register_entity("Person");
//! schema.register_navigation(NavigationEdge::has_many("Blog", "Posts", "Post", "blog_id")).unwrap();
//! schema.register_navigation(NavigationEdge::belongs_to("Post", "Author", "Person", "author_id")).unwrap();
//!
//! let tree = InclusionTree::builder(&schema, "Blog")
//!     .include("Posts")
//!     .then_include("Author")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(tree.node_count(), 2);
//! assert_eq!(tree.paths(), vec!["Posts", "Posts.Author"]);
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::{LoadError, LoadResult};

use super::spec::{NavigationEdge, Schema};

/// Default limit on the length of a single include path.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

/// One navigation to populate, with nested navigations below it.
#[derive(Debug, Clone)]
pub struct IncludeNode {
    edge: Arc<NavigationEdge>,
    children: IndexMap<SmolStr, IncludeNode>,
}

impl IncludeNode {
    fn new(edge: Arc<NavigationEdge>) -> Self {
        Self {
            edge,
            children: IndexMap::new(),
        }
    }

    /// The navigation this node populates.
    pub fn edge(&self) -> &Arc<NavigationEdge> {
        &self.edge
    }

    /// Name of the navigation.
    pub fn name(&self) -> &str {
        &self.edge.name
    }

    /// Nested nodes in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &IncludeNode> {
        self.children.values()
    }

    /// Get a nested node by navigation name.
    pub fn child(&self, name: &str) -> Option<&IncludeNode> {
        self.children.get(name)
    }

    /// Check if there are nested includes.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of nodes in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.values().map(IncludeNode::subtree_len).sum::<usize>()
    }

    fn depth(&self) -> usize {
        1 + self.children.values().map(IncludeNode::depth).max().unwrap_or(0)
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.edge.name.to_string()
        } else {
            format!("{}.{}", prefix, self.edge.name)
        };
        for child in self.children.values() {
            child.collect_paths(&path, out);
        }
        out.push(path);
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{} ({} {})",
            "",
            self.edge.name,
            self.edge.cardinality.as_str(),
            self.edge.target,
            indent = indent
        )?;
        for child in self.children.values() {
            child.fmt_indented(f, indent + 2)?;
        }
        Ok(())
    }
}

/// A validated forest of navigation paths rooted at one entity type.
#[derive(Debug, Clone)]
pub struct InclusionTree {
    root_type: SmolStr,
    nodes: IndexMap<SmolStr, IncludeNode>,
    max_depth: usize,
}

impl InclusionTree {
    /// Create an empty tree for `root_type`.
    pub fn new(schema: &Schema, root_type: impl Into<SmolStr>) -> LoadResult<Self> {
        let root_type = root_type.into();
        if !schema.contains(&root_type) {
            return Err(LoadError::unknown_entity_type(root_type.as_str())
                .with_context("Building inclusion tree"));
        }
        Ok(Self {
            root_type,
            nodes: IndexMap::new(),
            max_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        })
    }

    /// Start a fluent builder for `root_type`.
    pub fn builder<'s>(schema: &'s Schema, root_type: impl Into<SmolStr>) -> IncludeBuilder<'s> {
        IncludeBuilder::new(schema, root_type)
    }

    /// Parse a comma separated list of dotted paths, e.g. `"Posts.Author, Owner"`.
    pub fn parse(schema: &Schema, root_type: impl Into<SmolStr>, paths: &str) -> LoadResult<Self> {
        let mut tree = Self::new(schema, root_type)?;
        for path in paths.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let segments: Vec<&str> = path.split('.').map(str::trim).collect();
            tree.add_path(schema, segments.as_slice())?;
        }
        Ok(tree)
    }

    /// Limit the length of paths added afterwards.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Add a navigation path, merging with any existing shared prefix.
    ///
    /// Returns the node at the end of the path.
    pub fn add_path<S: AsRef<str>>(&mut self, schema: &Schema, path: &[S]) -> LoadResult<&IncludeNode> {
        let joined = path.iter().map(|s| s.as_ref()).collect::<Vec<&str>>().join(".");
        if path.is_empty() {
            return Err(LoadError::invalid_path(self.root_type.as_str(), "", Vec::<String>::new())
                .with_context("Adding an empty include path"));
        }
        if path.len() > self.max_depth {
            return Err(LoadError::include_too_deep(joined, self.max_depth));
        }

        // Validate the whole path before touching the tree so a bad path
        // leaves it unchanged.
        let mut edges = Vec::with_capacity(path.len());
        let mut current_type = self.root_type.clone();
        for segment in path {
            let edge = schema
                .navigation(&current_type, segment.as_ref())
                .map_err(|e| e.with_context(format!("Adding include path '{}'", joined)))?;
            current_type = edge.target.clone();
            edges.push(Arc::clone(edge));
        }

        let mut edges = edges.into_iter();
        let first = edges.next().ok_or_else(|| LoadError::internal("validated path is empty"))?;
        let mut node = self
            .nodes
            .entry(first.name.clone())
            .or_insert_with(|| IncludeNode::new(first));
        for edge in edges {
            node = node
                .children
                .entry(edge.name.clone())
                .or_insert_with(|| IncludeNode::new(edge));
        }

        tracing::trace!(root = %self.root_type, path = %joined, "include path added");
        Ok(node)
    }

    /// Entity type the tree is rooted at.
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    /// Top-level nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &IncludeNode> {
        self.nodes.values()
    }

    /// Get the node at the end of a path, if present.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&IncludeNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(first.as_ref())?;
        for segment in rest {
            node = node.child(segment.as_ref())?;
        }
        Some(node)
    }

    /// Total number of nodes; one batched fetch is issued per node.
    pub fn node_count(&self) -> usize {
        self.nodes.values().map(IncludeNode::subtree_len).sum()
    }

    /// Length of the longest path.
    pub fn depth(&self) -> usize {
        self.nodes.values().map(IncludeNode::depth).max().unwrap_or(0)
    }

    /// Check if the tree includes nothing.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All dotted paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for node in self.nodes.values() {
            node.collect_paths("", &mut out);
        }
        out.sort();
        out
    }
}

impl fmt::Display for InclusionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.root_type)?;
        for node in self.nodes.values() {
            node.fmt_indented(f, 2)?;
        }
        Ok(())
    }
}

/// Fluent builder mirroring `include` / `then_include` chains.
///
/// `include` starts a new path at the root; `then_include` extends the
/// path started by the most recent `include`. Errors are kept until
/// [`build`](Self::build).
#[derive(Debug)]
pub struct IncludeBuilder<'s> {
    schema: &'s Schema,
    tree: LoadResult<InclusionTree>,
    cursor: Vec<SmolStr>,
}

impl<'s> IncludeBuilder<'s> {
    /// Create a builder for `root_type`.
    pub fn new(schema: &'s Schema, root_type: impl Into<SmolStr>) -> Self {
        Self {
            schema,
            tree: InclusionTree::new(schema, root_type),
            cursor: Vec::new(),
        }
    }

    /// Limit the length of include paths.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.tree = self.tree.map(|t| t.with_max_depth(max_depth));
        self
    }

    /// Include a navigation of the root type.
    pub fn include(mut self, navigation: impl Into<SmolStr>) -> Self {
        self.cursor.clear();
        self.cursor.push(navigation.into());
        self.apply();
        self
    }

    /// Include a navigation of the previously included entity.
    pub fn then_include(mut self, navigation: impl Into<SmolStr>) -> Self {
        self.cursor.push(navigation.into());
        self.apply();
        self
    }

    /// Include a full dotted path, e.g. `"Posts.Tags"`.
    pub fn include_path(mut self, path: &str) -> Self {
        self.cursor = path.split('.').map(|s| SmolStr::new(s.trim())).collect();
        self.apply();
        self
    }

    fn apply(&mut self) {
        let result = match &mut self.tree {
            Ok(tree) => tree.add_path(self.schema, self.cursor.as_slice()).map(|_| ()),
            Err(_) => return,
        };
        if let Err(err) = result {
            self.tree = Err(err);
        }
    }

    /// Finish building, reporting the first invalid path.
    pub fn build(self) -> LoadResult<InclusionTree> {
        self.tree
    }
}
