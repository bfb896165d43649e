//! Graph store for parsed scripts
//!
//! Nodes live in an arena addressed by [`NodeId`]. Identities are assigned
//! monotonically and never reused within a graph's lifetime: removing a node
//! leaves a tombstone slot behind, so a stale id can never silently resolve
//! to an unrelated later node.
//!
//! Children are an ordered, owning relation that reconstructs left-to-right
//! textual order on rendering. Edges are ordered, *non-owning* references to
//! nodes elsewhere in the graph, created by alias terms (`@name`) in a
//! grammar; they are used for lookup and re-rendering, never for destruction
//! or duplication.
//!
//! The store is not internally synchronized: structural mutation must be
//! serialized by the caller. Concurrent read-only traversal guarded by
//! independent [`Visitor`](crate::gram::visit::Visitor)s is safe.

use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;

use crate::gram::grammar::RuleSet;

/// Opaque identity of a node within one [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, non-owning reference to another node.
///
/// `name` is the path text exactly as it was written in the script; the
/// script generator re-emits it instead of expanding the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub name: String,
    pub target: NodeId,
}

/// One node of the parsed graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    /// Name of the rule that produced this node; empty for anonymous
    /// capture leaves.
    pub tag: String,
    /// Index of the rule alternative that matched, anchoring structural
    /// replay on rendering.
    pub alt: usize,
    /// Captured text; empty for composite nodes.
    pub value: String,
    pub children: Vec<NodeId>,
    pub edges: Vec<Edge>,
}

/// Arena of nodes plus the root list and the rule set that produced them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    roots: Vec<NodeId>,
    nodes: Vec<Option<Node>>,
    #[serde(skip)]
    rules: RuleSet,
}

impl Graph {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            roots: Vec::new(),
            nodes: Vec::new(),
            rules,
        }
    }

    /// Allocate a node. The identity counter is the arena itself: slots are
    /// appended and never popped, so ids stay monotonic and unique.
    pub fn new_node(
        &mut self,
        tag: impl Into<String>,
        alt: usize,
        value: impl Into<String>,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node {
            id,
            tag: tag.into(),
            alt,
            value: value.into(),
            children,
            edges: Vec::new(),
        }));
        id
    }

    pub fn push_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(|slot| slot.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(|slot| slot.as_mut())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(|slot| slot.as_ref())
    }

    /// Record a non-owning edge. Returns false when either endpoint is not
    /// a live node.
    pub fn add_edge(&mut self, from: NodeId, name: &str, to: NodeId) -> bool {
        if self.node(to).is_none() {
            return false;
        }
        match self.node_mut(from) {
            Some(node) => {
                node.edges.push(Edge {
                    name: name.to_string(),
                    target: to,
                });
                true
            }
            None => false,
        }
    }

    /// Remove a node: tombstone its slot, detach it from the root list and
    /// from every parent's child list, and strip edges that reference it.
    /// The id is never reused. Returns false when the node was already gone.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let slot = match self.nodes.get_mut(id.0 as usize) {
            Some(slot) => slot,
            None => return false,
        };
        if slot.take().is_none() {
            return false;
        }
        self.roots.retain(|&root| root != id);
        for slot in self.nodes.iter_mut() {
            if let Some(node) = slot {
                node.children.retain(|&child| child != id);
                node.edges.retain(|edge| edge.target != id);
            }
        }
        true
    }

    /// A node's name for path lookup: its own captured value, or the value
    /// of its first direct leaf child (the way `thing ≈ name …` rules put
    /// the identifying capture first).
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id)?;
        if !node.value.is_empty() {
            return Some(&node.value);
        }
        node.children.iter().find_map(|&child| {
            let child = self.node(child)?;
            if child.children.is_empty() && !child.value.is_empty() {
                Some(child.value.as_str())
            } else {
                None
            }
        })
    }

    /// Resolve a `.`-separated path to a node id.
    ///
    /// Each segment is looked up among the current scope's children,
    /// descending transparently through unnamed structural nodes; named
    /// non-matching nodes are scope boundaries. A segment that does not
    /// resolve locally may resolve through the scope node's edges (alias
    /// chaining); the set of in-progress lookups guards that chain, so a
    /// recurring lookup fails instead of looping.
    pub fn resolve_path(&self, path: &str) -> Option<NodeId> {
        let mut resolving = IndexSet::new();
        self.resolve_with(path, &mut resolving)
    }

    fn resolve_with(&self, path: &str, resolving: &mut IndexSet<String>) -> Option<NodeId> {
        if !resolving.insert(path.to_string()) {
            return None;
        }
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let (first, rest) = segments.split_first()?;
        let mut current = self.find_in(&self.roots, first)?;
        for segment in rest {
            current = self.descend(current, segment, resolving)?;
        }
        Some(current)
    }

    fn descend(
        &self,
        from: NodeId,
        segment: &str,
        resolving: &mut IndexSet<String>,
    ) -> Option<NodeId> {
        let node = self.node(from)?;
        if let Some(found) = self.find_in(&node.children, segment) {
            return Some(found);
        }
        let mut edges = Vec::new();
        self.collect_scope_edges(from, &mut edges);
        if edges.is_empty() {
            return None;
        }
        // one hop per (node, segment) pair, so alias cycles terminate
        if !resolving.insert(format!("{}→{}", from, segment)) {
            return None;
        }
        for edge in edges {
            let chained = format!("{edge}.{segment}");
            if let Some(found) = self.resolve_with(&chained, resolving) {
                return Some(found);
            }
        }
        None
    }

    /// Edge paths visible from a scope node: its own edges plus those of
    /// its unnamed structural descendants (named children are scopes of
    /// their own).
    fn collect_scope_edges(&self, id: NodeId, out: &mut Vec<String>) {
        if let Some(node) = self.node(id) {
            for edge in &node.edges {
                out.push(edge.name.clone());
            }
            for &child in &node.children {
                if self.node_name(child).is_none() {
                    self.collect_scope_edges(child, out);
                }
            }
        }
    }

    fn find_in(&self, scope: &[NodeId], segment: &str) -> Option<NodeId> {
        for &id in scope {
            match self.node_name(id) {
                Some(name) if name == segment => return Some(id),
                Some(_) => {}
                None => {
                    if let Some(node) = self.node(id) {
                        if let Some(found) = self.find_in(&node.children, segment) {
                            return Some(found);
                        }
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(graph: &mut Graph, tag: &str, value: &str) -> NodeId {
        graph.new_node(tag, 0, value, vec![])
    }

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let mut graph = Graph::default();
        let a = leaf(&mut graph, "item", "a");
        let b = leaf(&mut graph, "item", "b");
        assert!(graph.remove(b));
        let c = leaf(&mut graph, "item", "c");
        assert_eq!(a, NodeId(0));
        assert_eq!(b, NodeId(1));
        assert_eq!(c, NodeId(2));
        assert!(graph.node(b).is_none());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_remove_strips_edges_and_children() {
        let mut graph = Graph::default();
        let target = leaf(&mut graph, "item", "t");
        let child = leaf(&mut graph, "item", "c");
        let parent = graph.new_node("list", 0, "", vec![child, target]);
        graph.push_root(parent);
        assert!(graph.add_edge(child, "t", target));

        assert!(graph.remove(target));
        let parent = graph.node(parent).unwrap();
        assert_eq!(parent.children, vec![child]);
        assert!(graph.node(child).unwrap().edges.is_empty());
    }

    #[test]
    fn test_add_edge_to_dead_node_is_rejected() {
        let mut graph = Graph::default();
        let a = leaf(&mut graph, "item", "a");
        let b = leaf(&mut graph, "item", "b");
        graph.remove(b);
        assert!(!graph.add_edge(a, "b", b));
    }

    #[test]
    fn test_resolve_path_descends_named_scopes() {
        // root { size { w } } modelled as composite nodes with name leaves
        let mut graph = Graph::default();
        let w_name = leaf(&mut graph, "name", "w");
        let w = graph.new_node("node", 0, "", vec![w_name]);
        let size_name = leaf(&mut graph, "name", "size");
        let size = graph.new_node("node", 0, "", vec![size_name, w]);
        let root_name = leaf(&mut graph, "name", "root");
        let root = graph.new_node("node", 0, "", vec![root_name, size]);
        graph.push_root(root);

        assert_eq!(graph.resolve_path("root"), Some(root));
        assert_eq!(graph.resolve_path("root.size"), Some(size));
        assert_eq!(graph.resolve_path("root.size.w"), Some(w));
        assert_eq!(graph.resolve_path("root.w"), None);
        assert_eq!(graph.resolve_path("size.w"), None);
    }

    #[test]
    fn test_resolve_path_through_unnamed_structural_nodes() {
        let mut graph = Graph::default();
        let b_name = leaf(&mut graph, "name", "b");
        let b = graph.new_node("node", 0, "", vec![b_name]);
        // block nodes carry no name of their own
        let block = graph.new_node("block", 0, "", vec![b]);
        let a_name = leaf(&mut graph, "name", "a");
        let a = graph.new_node("node", 0, "", vec![a_name, block]);
        graph.push_root(a);

        assert_eq!(graph.resolve_path("a.b"), Some(b));
    }

    #[test]
    fn test_resolve_path_follows_alias_edges() {
        let mut graph = Graph::default();
        let w_name = leaf(&mut graph, "name", "w");
        let w = graph.new_node("node", 0, "", vec![w_name]);
        let size_name = leaf(&mut graph, "name", "size");
        let size = graph.new_node("node", 0, "", vec![size_name, w]);
        let root_name = leaf(&mut graph, "name", "root");
        let root = graph.new_node("node", 0, "", vec![root_name, size]);
        let alias_name = leaf(&mut graph, "name", "alias");
        let alias = graph.new_node("node", 0, "", vec![alias_name]);
        graph.push_root(root);
        graph.push_root(alias);
        assert!(graph.add_edge(alias, "root.size", size));

        assert_eq!(graph.resolve_path("alias.w"), Some(w));
    }

    #[test]
    fn test_resolve_path_alias_cycle_fails_not_hangs() {
        let mut graph = Graph::default();
        let x_name = leaf(&mut graph, "name", "x");
        let x = graph.new_node("node", 0, "", vec![x_name]);
        let y_name = leaf(&mut graph, "name", "y");
        let y = graph.new_node("node", 0, "", vec![y_name]);
        graph.push_root(x);
        graph.push_root(y);
        graph.add_edge(x, "y.p", y);
        graph.add_edge(y, "x.p", x);

        assert_eq!(graph.resolve_path("x.p"), None);
        assert_eq!(graph.resolve_path("y.p.q"), None);
    }
}
