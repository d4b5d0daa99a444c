//! Dependency graph and its ordering algorithms.
//!
//! The graph records "depends-on" edges between service keys. Construction
//! order is [`DependencyGraph::topological_order`] on the graph as declared;
//! teardown order is the same walk on [`DependencyGraph::invert`], which puts
//! every dependent ahead of the services it depends on.

use std::collections::{HashMap, HashSet};

use crate::key::ServiceKey;

pub mod export;

pub use export::{ExportFormat, GraphEdge, GraphMetadata, GraphNode, GraphSnapshot};

/// Directed graph of "depends-on" edges between service keys.
///
/// Every key the graph has seen is a node, in first-seen order, whether or
/// not it has edges. Edges are append-only: duplicates are kept (and are
/// harmless to the orderings) and nothing is ever removed.
///
/// # Examples
///
/// ```rust
/// use wirebox::DependencyGraph;
///
/// let mut graph = DependencyGraph::new();
/// graph.add_edge("a", "b");
/// graph.add_edge("b", "c");
///
/// let order: Vec<_> = graph.topological_order().iter().map(|k| k.to_string()).collect();
/// assert_eq!(order, ["c", "b", "a"]);
///
/// let teardown: Vec<_> = graph.invert().topological_order().iter().map(|k| k.to_string()).collect();
/// assert_eq!(teardown, ["a", "b", "c"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<ServiceKey>,
    edges: HashMap<ServiceKey, Vec<ServiceKey>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key` as a node if it is not one already.
    pub fn add_node(&mut self, key: impl Into<ServiceKey>) {
        let key = key.into();
        if !self.edges.contains_key(&key) {
            self.nodes.push(key.clone());
            self.edges.insert(key, Vec::new());
        }
    }

    /// Records that `from` depends on `to`, appending `to` to `from`'s
    /// dependency list.
    pub fn add_edge(&mut self, from: impl Into<ServiceKey>, to: impl Into<ServiceKey>) {
        let from = from.into();
        let to = to.into();
        self.add_node(from.clone());
        self.add_node(to.clone());
        if let Some(deps) = self.edges.get_mut(&from) {
            deps.push(to);
        }
    }

    /// Returns a new graph with every edge `(from, to)` reversed to
    /// `(to, from)`. Node order is preserved.
    pub fn invert(&self) -> DependencyGraph {
        let mut inverted = DependencyGraph::new();
        for key in &self.nodes {
            inverted.add_node(key.clone());
        }
        for (from, to) in self.edges() {
            inverted.add_edge(to.clone(), from.clone());
        }
        inverted
    }

    /// Orders every node so that for each edge `(from, to)`, `to` precedes
    /// `from`.
    ///
    /// Nodes are taken in insertion order; each one's dependency list is
    /// visited depth-first, dependencies before the node itself, and a key
    /// is emitted the first time the walk finishes it. A key already on the
    /// current walk is skipped, so a cyclic graph still yields every node
    /// once (in an order that necessarily breaks one edge of each cycle).
    pub fn topological_order(&self) -> Vec<ServiceKey> {
        self.walk(self.nodes.iter())
    }

    /// `key` and everything it transitively depends on, dependencies first
    /// and `key` last.
    pub fn transitive_dependencies(&self, key: &ServiceKey) -> Vec<ServiceKey> {
        match self.edges.get_key_value(key) {
            Some((stored, _)) => self.walk(std::iter::once(stored)),
            None => vec![key.clone()],
        }
    }

    /// All nodes in first-seen order.
    pub fn all_services(&self) -> &[ServiceKey] {
        &self.nodes
    }

    /// Dependency keys of `key`, in the order they were added.
    pub fn dependencies_of(&self, key: &ServiceKey) -> &[ServiceKey] {
        self.edges.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `key` is a node.
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.edges.contains_key(key)
    }

    /// Every edge as `(from, to)`, grouped by `from` in node order.
    pub fn edges(&self) -> impl Iterator<Item = (&ServiceKey, &ServiceKey)> {
        self.nodes
            .iter()
            .flat_map(move |from| self.dependencies_of(from).iter().map(move |to| (from, to)))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of edges, duplicates included.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    fn walk<'a>(&'a self, roots: impl Iterator<Item = &'a ServiceKey>) -> Vec<ServiceKey> {
        let mut emitted: HashSet<&'a ServiceKey> = HashSet::new();
        let mut on_walk: HashSet<&'a ServiceKey> = HashSet::new();
        let mut stack: Vec<(&'a ServiceKey, usize)> = Vec::new();
        let mut out = Vec::with_capacity(self.nodes.len());

        for root in roots {
            if emitted.contains(root) {
                continue;
            }
            on_walk.insert(root);
            stack.push((root, 0));

            while let Some(top) = stack.last_mut() {
                let key = top.0;
                let deps = self.dependencies_of(key);
                if top.1 < deps.len() {
                    let dep = &deps[top.1];
                    top.1 += 1;
                    if !emitted.contains(dep) && on_walk.insert(dep) {
                        stack.push((dep, 0));
                    }
                } else {
                    stack.pop();
                    on_walk.remove(key);
                    emitted.insert(key);
                    out.push(key.clone());
                }
            }
        }

        out
    }
}
