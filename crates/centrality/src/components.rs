use extract::Graph;
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;

/// Size of the connected component each node belongs to, by node position.
pub fn component_sizes(graph: &Graph) -> Vec<usize> {
    let n = graph.len();
    let mut sets = UnionFind::<usize>::new(n);

    for edge in graph.topology().raw_edges() {
        sets.union(edge.source().index(), edge.target().index());
    }

    let labels = sets.into_labeling();
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for &label in &labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    labels.iter().map(|label| counts[label]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{GraphBuilder, RawEdge, RawNode};

    #[test]
    fn test_two_components_and_an_isolate() {
        let nodes: Vec<RawNode> = ["A", "B", "C", "D", "E"].iter().map(|id| RawNode::with_id(id)).collect();
        let edges = vec![
            RawEdge::between("A", "B"),
            RawEdge::between("B", "C"),
            RawEdge::between("D", "E"),
        ];
        let graph = GraphBuilder::new().build(&nodes, &edges);

        assert_eq!(component_sizes(&graph), vec![3, 3, 3, 2, 2]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = GraphBuilder::new().build(&[], &[]);
        assert!(component_sizes(&graph).is_empty());
    }
}
