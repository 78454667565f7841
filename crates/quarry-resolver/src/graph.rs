//! The dependency graph: arena-allocated nodes and child lists.
//!
//! Nodes and child lists are addressed by index ids rather than owning
//! references, so cyclic structures need no reference counting: a cycle is a
//! leaf node annotated with the id of its matching ancestor. Child lists get
//! their own arena because the conflict resolver keys its bookkeeping on
//! *list identity* — two nodes that logically share children address the
//! same [`ListId`].

use std::collections::BTreeMap;
use std::fmt;

use quarry_core::artifact::ArtifactKey;
use quarry_core::dependency::{Dependency, Exclusion};
use quarry_core::repository::RemoteRepository;

/// Annotation on a leaf that closes a cycle: the ancestor it loops back to.
pub const KEY_CYCLIC_PARENT: &str = "cyclic-parent";

/// Annotation on a verbose-mode loser pointing at the winner of its conflict
/// group.
pub const KEY_CONFLICT_WINNER: &str = "conflict.winner";

/// The scope a winner had before the scope selector rewrote it.
pub const KEY_ORIGINAL_SCOPE: &str = "conflict.originalScope";

/// Coordinates a relocated artifact was originally requested under.
pub const KEY_RELOCATED_FROM: &str = "relocated-from";

/// The raw range expression a node's concrete version was expanded from.
pub const KEY_VERSION_RANGE: &str = "version.range";

/// Index of a node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of an allocated child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(u32);

/// Which node attributes were overridden by dependency management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagedBits(u8);

impl ManagedBits {
    pub const VERSION: ManagedBits = ManagedBits(1 << 0);
    pub const SCOPE: ManagedBits = ManagedBits(1 << 1);
    pub const OPTIONAL: ManagedBits = ManagedBits(1 << 2);
    pub const PROPERTIES: ManagedBits = ManagedBits(1 << 3);
    pub const EXCLUSIONS: ManagedBits = ManagedBits(1 << 4);

    pub fn insert(&mut self, other: ManagedBits) {
        self.0 |= other.0;
    }

    pub fn contains(self, other: ManagedBits) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// A value in a node's free-form data map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    Str(String),
    Node(NodeId),
}

impl DataValue {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            DataValue::Node(id) => Some(*id),
            DataValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Str(s) => Some(s),
            DataValue::Node(_) => None,
        }
    }
}

/// A graph vertex. The root of a collected graph may carry no dependency.
#[derive(Debug, Clone)]
pub struct Node {
    pub dependency: Option<Dependency>,
    pub children: ListId,
    /// Remote repositories considered when this node was resolved.
    pub repositories: Vec<RemoteRepository>,
    pub managed: ManagedBits,
    pub premanaged_version: Option<String>,
    pub premanaged_scope: Option<String>,
    pub premanaged_optional: Option<bool>,
    pub premanaged_exclusions: Option<Vec<Exclusion>>,
    pub premanaged_properties: Option<BTreeMap<String, String>>,
    pub request_context: String,
    pub data: BTreeMap<String, DataValue>,
}

impl Node {
    pub fn key(&self) -> Option<ArtifactKey> {
        self.dependency.as_ref().map(|d| d.artifact.key())
    }

    /// The node's effective scope; empty for dependency-less roots.
    pub fn scope(&self) -> &str {
        self.dependency
            .as_ref()
            .map(Dependency::effective_scope)
            .unwrap_or("")
    }
}

/// The arena holding every node and child list of one collected graph.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    lists: Vec<Vec<NodeId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node with a fresh, empty child list.
    pub fn add_node(&mut self, dependency: Option<Dependency>) -> NodeId {
        let children = self.add_list();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            dependency,
            children,
            repositories: Vec::new(),
            managed: ManagedBits::default(),
            premanaged_version: None,
            premanaged_scope: None,
            premanaged_optional: None,
            premanaged_exclusions: None,
            premanaged_properties: None,
            request_context: "project".to_string(),
            data: BTreeMap::new(),
        });
        id
    }

    fn add_list(&mut self) -> ListId {
        let id = ListId(self.lists.len() as u32);
        self.lists.push(Vec::new());
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        let list = self.nodes[id.index()].children;
        &self.lists[list.0 as usize]
    }

    pub fn list(&self, id: ListId) -> &[NodeId] {
        &self.lists[id.0 as usize]
    }

    pub fn list_mut(&mut self, id: ListId) -> &mut Vec<NodeId> {
        &mut self.lists[id.0 as usize]
    }

    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let list = self.nodes[parent.index()].children;
        self.lists[list.0 as usize].push(child);
    }

    /// Rewrite the scope of a node's dependency in place.
    pub fn set_scope(&mut self, id: NodeId, scope: &str) {
        if let Some(dep) = self.nodes[id.index()].dependency.as_mut() {
            dep.scope = scope.to_string();
        }
    }

    /// Every node reachable from `root`, preorder, each visited once even in
    /// the presence of shared lists.
    pub fn reachable(&self, root: NodeId) -> Vec<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            order.push(id);
            for &child in self.children(id).iter().rev() {
                if !seen[child.index()] {
                    stack.push(child);
                }
            }
        }
        order
    }

    /// Render the tree below `root` for diagnostics, one node per line.
    pub fn render_tree(&self, root: NodeId) -> String {
        let mut out = String::new();
        match self.node(root).dependency {
            Some(ref dep) => out.push_str(&format!("{dep}\n")),
            None => out.push_str("(root)\n"),
        }
        let children = self.children(root);
        let count = children.len();
        for (i, &child) in children.iter().enumerate() {
            self.render_subtree(&mut out, child, "", i + 1 == count);
        }
        out
    }

    fn render_subtree(&self, out: &mut String, id: NodeId, prefix: &str, is_last: bool) {
        let connector = if is_last { "└── " } else { "├── " };
        match self.node(id).dependency {
            Some(ref dep) => out.push_str(&format!("{prefix}{connector}{dep}")),
            None => out.push_str(&format!("{prefix}{connector}(anonymous)")),
        }
        if self.node(id).data.contains_key(KEY_CYCLIC_PARENT) {
            out.push_str(" (cycle)");
        }
        out.push('\n');
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let children = self.children(id);
        let count = children.len();
        for (i, &child) in children.iter().enumerate() {
            self.render_subtree(out, child, &child_prefix, i + 1 == count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::artifact::Artifact;

    fn dep(spec: &str, scope: &str) -> Dependency {
        Dependency::new(Artifact::parse(spec).unwrap(), scope)
    }

    #[test]
    fn arena_allocation() {
        let mut g = Graph::new();
        let root = g.add_node(None);
        let a = g.add_node(Some(dep("g:a:1.0", "compile")));
        let b = g.add_node(Some(dep("g:b:2.0", "test")));
        g.add_child(root, a);
        g.add_child(a, b);

        assert_eq!(g.children(root), &[a]);
        assert_eq!(g.children(a), &[b]);
        assert_eq!(g.node(b).scope(), "test");
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn child_lists_have_distinct_identity() {
        let mut g = Graph::new();
        let a = g.add_node(Some(dep("g:a:1.0", "")));
        let b = g.add_node(Some(dep("g:b:1.0", "")));
        assert_ne!(g.node(a).children, g.node(b).children);
    }

    #[test]
    fn managed_bits_union() {
        let mut bits = ManagedBits::default();
        assert!(bits.is_empty());
        bits.insert(ManagedBits::VERSION);
        bits.insert(ManagedBits::SCOPE);
        assert!(bits.contains(ManagedBits::VERSION));
        assert!(bits.contains(ManagedBits::SCOPE));
        assert!(!bits.contains(ManagedBits::OPTIONAL));
    }

    #[test]
    fn reachable_handles_shared_children() {
        let mut g = Graph::new();
        let root = g.add_node(None);
        let a = g.add_node(Some(dep("g:a:1.0", "")));
        let b = g.add_node(Some(dep("g:b:1.0", "")));
        g.add_child(root, a);
        g.add_child(root, b);
        g.add_child(a, b);

        let order = g.reachable(root);
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], root);
    }

    #[test]
    fn render_marks_cycles() {
        let mut g = Graph::new();
        let root = g.add_node(Some(dep("g:root:1.0", "")));
        let leaf = g.add_node(Some(dep("g:root:1.0", "")));
        g.node_mut(leaf)
            .data
            .insert(KEY_CYCLIC_PARENT.to_string(), DataValue::Node(root));
        g.add_child(root, leaf);

        let rendered = g.render_tree(root);
        assert!(rendered.contains("(cycle)"));
    }
}
