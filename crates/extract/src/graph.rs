use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Work label for characters whose source text is not known.
pub const UNKNOWN_WORK: &str = "Unknown";

/// Label for relationships the extractor did not name.
pub const DEFAULT_LABEL: &str = "related";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub work: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<String>,
}

/// Immutable snapshot of one analysis. Node positions match first-seen
/// order and double as petgraph node indices.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<String, usize>,
    topology: UnGraph<(), ()>,
}

impl Graph {
    /// Callers guarantee unique node ids and edges whose endpoints exist.
    pub(crate) fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut topology = UnGraph::with_capacity(nodes.len(), edges.len());
        let mut index = HashMap::with_capacity(nodes.len());

        for (position, node) in nodes.iter().enumerate() {
            let idx = topology.add_node(());
            debug_assert_eq!(idx.index(), position);
            index.insert(node.id.clone(), position);
        }

        for edge in &edges {
            let a = NodeIndex::new(index[&edge.source]);
            let b = NodeIndex::new(index[&edge.target]);
            topology.add_edge(a, b, ());
        }

        Self {
            nodes,
            edges,
            index,
            topology,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.position(id).map(|p| &self.nodes[p])
    }

    /// Distinct neighbours of the node at `position`, ignoring self-loops.
    pub fn neighbors(&self, position: usize) -> BTreeSet<usize> {
        let idx = NodeIndex::new(position);
        self.topology
            .neighbors(idx)
            .filter(|n| *n != idx)
            .map(NodeIndex::index)
            .collect()
    }

    pub fn degree(&self, position: usize) -> usize {
        self.neighbors(position).len()
    }

    /// Undirected topology; node `i` is the node at position `i`.
    pub fn topology(&self) -> &UnGraph<(), ()> {
        &self.topology
    }
}
