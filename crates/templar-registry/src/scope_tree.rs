//! Scope tree: hierarchical storage for namespace-level declarations.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: `ScopeData` (declarations and unscoped enumerators at that level)
//! - Edges: `Contains(name)` for nesting, `Uses` for `using namespace`
//!
//! Class members are not nodes; they live inside their class declaration.

use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use templar_core::decl::Declaration;

/// Result of a lookup that may be ambiguous.
///
/// When several `using namespace` directives bring the same name into
/// scope from different namespaces, the caller decides whether the hits
/// merge (overload sets) or conflict (types).
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionResult<T> {
    /// Found in exactly one place.
    Found(T),
    /// Found through more than one using directive, with the namespace of each hit.
    Ambiguous(Vec<(NodeIndex, T)>),
    NotFound,
}

impl<T> ResolutionResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, ResolutionResult::Found(_))
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ResolutionResult::Ambiguous(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolutionResult::NotFound)
    }

    pub fn ok(self) -> Option<T> {
        match self {
            ResolutionResult::Found(v) => Some(v),
            _ => None,
        }
    }
}

/// Edge types in the scope graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEdge {
    /// Parent namespace contains the child, named by its simple name.
    Contains(String),
    /// `using namespace` directive.
    Uses,
}

/// An unscoped enumerator, visible in the scope enclosing its enum.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumeratorEntry {
    pub owner: Arc<Declaration>,
    pub value: i128,
}

/// Declarations stored at one namespace level.
#[derive(Debug, Clone, Default)]
pub struct ScopeData {
    /// Declarations by simple name; several entries form an overload set.
    pub decls: FxHashMap<String, Vec<Arc<Declaration>>>,
    pub enumerators: FxHashMap<String, EnumeratorEntry>,
}

impl ScopeData {
    pub fn named(&self, name: &str) -> Option<&[Arc<Declaration>]> {
        self.decls.get(name).map(Vec::as_slice).filter(|d| !d.is_empty())
    }
}

/// The namespace graph.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    graph: DiGraph<ScopeData, ScopeEdge>,
    root: NodeIndex,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Create a tree holding only the global namespace.
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(ScopeData::default());
        Self { graph, root }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn scope(&self, node: NodeIndex) -> Option<&ScopeData> {
        self.graph.node_weight(node)
    }

    pub fn scope_mut(&mut self, node: NodeIndex) -> Option<&mut ScopeData> {
        self.graph.node_weight_mut(node)
    }

    /// Find a child namespace by name.
    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph.edges(parent).find_map(|edge| match edge.weight() {
            ScopeEdge::Contains(child) if child == name => Some(edge.target()),
            _ => None,
        })
    }

    pub fn get_or_create_child(&mut self, parent: NodeIndex, name: &str) -> NodeIndex {
        if let Some(child) = self.find_child(parent, name) {
            return child;
        }
        let child = self.graph.add_node(ScopeData::default());
        self.graph.add_edge(parent, child, ScopeEdge::Contains(name.to_string()));
        child
    }

    pub fn get_or_create_path<S: AsRef<str>>(&mut self, path: &[S]) -> NodeIndex {
        let mut current = self.root;
        for segment in path {
            current = self.get_or_create_child(current, segment.as_ref());
        }
        current
    }

    /// An existing namespace by path from the root.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeIndex> {
        self.get_path_from(self.root, path)
    }

    pub fn get_path_from<S: AsRef<str>>(&self, start: NodeIndex, path: &[S]) -> Option<NodeIndex> {
        let mut current = start;
        for segment in path {
            current = self.find_child(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// Deepest existing namespace along `path`, with the number of segments consumed.
    pub fn deepest_prefix<S: AsRef<str>>(&self, path: &[S]) -> (NodeIndex, usize) {
        let mut current = self.root;
        for (depth, segment) in path.iter().enumerate() {
            match self.find_child(current, segment.as_ref()) {
                Some(child) => current = child,
                None => return (current, depth),
            }
        }
        (current, path.len())
    }

    pub fn find_parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find(|edge| matches!(edge.weight(), ScopeEdge::Contains(_)))
            .map(|edge| edge.source())
    }

    pub fn namespace_name(&self, node: NodeIndex) -> Option<&str> {
        if node == self.root {
            return None;
        }
        self.graph
            .edges_directed(node, Direction::Incoming)
            .find_map(|edge| match edge.weight() {
                ScopeEdge::Contains(name) => Some(name.as_str()),
                ScopeEdge::Uses => None,
            })
    }

    /// Full path of a namespace node, outermost first.
    pub fn namespace_path(&self, node: NodeIndex) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = node;
        while current != self.root {
            if let Some(name) = self.namespace_name(current) {
                path.push(name.to_string());
            }
            match self.find_parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    pub fn qualified_name(&self, node: NodeIndex, simple_name: &str) -> String {
        let path = self.namespace_path(node);
        if path.is_empty() {
            simple_name.to_string()
        } else {
            format!("{}::{}", path.join("::"), simple_name)
        }
    }

    /// Add a `using namespace` directive; repeats are ignored.
    pub fn add_using_directive(&mut self, from: NodeIndex, target: NodeIndex) {
        let exists = self
            .graph
            .edges(from)
            .any(|edge| matches!(edge.weight(), ScopeEdge::Uses) && edge.target() == target);
        if !exists {
            self.graph.add_edge(from, target, ScopeEdge::Uses);
        }
    }

    pub fn using_directives(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .edges(node)
            .filter(|edge| matches!(edge.weight(), ScopeEdge::Uses))
            .map(|edge| edge.target())
            .collect()
    }

    /// Resolve an unqualified name from `from`.
    ///
    /// Search order:
    /// 1. `from` and its parents up to the root; the innermost hit hides the rest
    /// 2. namespaces imported by `using namespace` at `from` and its parents
    pub fn resolve(&self, name: &str, from: NodeIndex) -> ResolutionResult<(NodeIndex, &[Arc<Declaration>])> {
        let mut current = Some(from);
        while let Some(node) = current {
            if let Some(decls) = self.scope(node).and_then(|s| s.named(name)) {
                return ResolutionResult::Found((node, decls));
            }
            current = self.find_parent(node);
        }

        let mut matches: Vec<(NodeIndex, (NodeIndex, &[Arc<Declaration>]))> = Vec::new();
        let mut current = Some(from);
        while let Some(node) = current {
            for used in self.using_directives(node) {
                if matches.iter().any(|(n, _)| *n == used) {
                    continue;
                }
                if let Some(decls) = self.scope(used).and_then(|s| s.named(name)) {
                    matches.push((used, (used, decls)));
                }
            }
            current = self.find_parent(node);
        }

        match matches.len() {
            0 => ResolutionResult::NotFound,
            1 => ResolutionResult::Found(matches.remove(0).1),
            _ => ResolutionResult::Ambiguous(matches),
        }
    }

    /// Resolve a namespace named by its first segment from `from`, walking
    /// outward and then through using directives.
    pub fn resolve_namespace(&self, name: &str, from: NodeIndex) -> Option<NodeIndex> {
        let mut current = Some(from);
        while let Some(node) = current {
            if let Some(child) = self.find_child(node, name) {
                return Some(child);
            }
            current = self.find_parent(node);
        }
        let mut current = Some(from);
        while let Some(node) = current {
            if let Some(child) = self.using_directives(node).into_iter().find_map(|u| self.find_child(u, name)) {
                return Some(child);
            }
            current = self.find_parent(node);
        }
        None
    }

    /// Find an unscoped enumerator visible from `from`.
    pub fn resolve_enumerator(&self, name: &str, from: NodeIndex) -> Option<&EnumeratorEntry> {
        let mut current = Some(from);
        while let Some(node) = current {
            if let Some(entry) = self.scope(node).and_then(|s| s.enumerators.get(name)) {
                return Some(entry);
            }
            current = self.find_parent(node);
        }
        let mut current = Some(from);
        while let Some(node) = current {
            for used in self.using_directives(node) {
                if let Some(entry) = self.scope(used).and_then(|s| s.enumerators.get(name)) {
                    return Some(entry);
                }
            }
            current = self.find_parent(node);
        }
        None
    }

    /// Number of namespace nodes, including the root.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
