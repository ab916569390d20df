use extract::Graph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::components::component_sizes;

/// Size units added per unit of centrality.
pub const SCALE_FACTOR: f64 = 50.0;

pub const DEFAULT_BASE_OFFSET: f64 = 5.0;
pub const MIN_BASE_OFFSET: f64 = 4.0;
pub const MAX_BASE_OFFSET: f64 = 5.0;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScoringError {
    #[error("base offset {0} is outside [4, 5]")]
    InvalidBaseOffset(f64),
}

/// What a node's degree is normalised against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringScope {
    /// Every other node in the analysis.
    #[default]
    Global,
    /// Every other node in the same connected component. Keeps small
    /// unrelated works from being dwarfed when several are merged.
    PerComponent,
}

/// Maps centrality onto the visual size used by graph renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizePolicy {
    base_offset: f64,
}

impl SizePolicy {
    pub fn new(base_offset: f64) -> Result<Self, ScoringError> {
        if !(MIN_BASE_OFFSET..=MAX_BASE_OFFSET).contains(&base_offset) {
            return Err(ScoringError::InvalidBaseOffset(base_offset));
        }
        Ok(Self { base_offset })
    }

    pub fn base_offset(&self) -> f64 {
        self.base_offset
    }

    pub fn size(&self, centrality: f64) -> f64 {
        self.base_offset + centrality * SCALE_FACTOR
    }
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            base_offset: DEFAULT_BASE_OFFSET,
        }
    }
}

/// Centrality per node id, iterated in graph node order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CentralityMap {
    ids: Vec<String>,
    scores: Vec<f64>,
    index: HashMap<String, usize>,
}

impl CentralityMap {
    pub fn get(&self, id: &str) -> Option<f64> {
        self.index.get(id).map(|&i| self.scores[i])
    }

    /// Score of the node at `position` in the graph that was scored.
    pub fn at(&self, position: usize) -> f64 {
        self.scores[position]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.ids.iter().map(String::as_str).zip(self.scores.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().sum()
    }
}

/// Degree centrality over an immutable graph snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentralityScorer {
    scope: ScoringScope,
}

impl CentralityScorer {
    pub fn new(scope: ScoringScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> ScoringScope {
        self.scope
    }

    pub fn score(&self, graph: &Graph) -> CentralityMap {
        let n = graph.len();

        let denominators: Vec<usize> = match self.scope {
            ScoringScope::Global => vec![n.saturating_sub(1); n],
            ScoringScope::PerComponent => component_sizes(graph)
                .into_iter()
                .map(|size| size - 1)
                .collect(),
        };

        let scores: Vec<f64> = (0..n)
            .map(|position| match denominators[position] {
                0 => 0.0,
                others => graph.degree(position) as f64 / others as f64,
            })
            .collect();

        let ids: Vec<String> = graph.nodes().iter().map(|node| node.id.clone()).collect();
        let index = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        debug!(nodes = n, scope = ?self.scope, "Scored graph");

        CentralityMap { ids, scores, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{GraphBuilder, RawEdge, RawNode};
    use proptest::prelude::*;

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
        let nodes: Vec<RawNode> = ids.iter().map(|id| RawNode::with_id(id)).collect();
        let edges: Vec<RawEdge> = edges.iter().map(|(s, t)| RawEdge::between(s, t)).collect();
        GraphBuilder::new().build(&nodes, &edges)
    }

    #[test]
    fn test_path_of_three() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let scores = CentralityScorer::default().score(&g);

        assert_eq!(scores.get("A"), Some(0.5));
        assert_eq!(scores.get("B"), Some(1.0));
        assert_eq!(scores.get("C"), Some(0.5));

        let policy = SizePolicy::default();
        assert_eq!(policy.size(scores.get("A").unwrap()), 30.0);
        assert_eq!(policy.size(scores.get("B").unwrap()), 55.0);
    }

    #[test]
    fn test_single_and_empty_graphs_score_zero() {
        let single = graph(&["A"], &[("A", "A")]);
        let scores = CentralityScorer::default().score(&single);
        assert_eq!(scores.get("A"), Some(0.0));

        let empty = graph(&[], &[]);
        let scores = CentralityScorer::default().score(&empty);
        assert!(scores.is_empty());
        assert_eq!(scores.total(), 0.0);
    }

    #[test]
    fn test_size_for_point_four() {
        // hub connected to two of five other nodes
        let g = graph(&["H", "A", "B", "C", "D", "E"], &[("H", "A"), ("H", "B")]);
        let scores = CentralityScorer::default().score(&g);

        assert_eq!(scores.get("H"), Some(0.4));
        assert_eq!(SizePolicy::default().size(0.4), 25.0);
    }

    #[test]
    fn test_per_component_scope() {
        let g = graph(&["A", "B", "C", "X", "Y", "Z"], &[("A", "B"), ("B", "C"), ("X", "Y")]);

        let global = CentralityScorer::new(ScoringScope::Global).score(&g);
        assert_eq!(global.get("X"), Some(0.2));
        assert_eq!(global.get("B"), Some(0.4));

        let local = CentralityScorer::new(ScoringScope::PerComponent).score(&g);
        assert_eq!(local.get("X"), Some(1.0));
        assert_eq!(local.get("B"), Some(1.0));
        assert_eq!(local.get("A"), Some(0.5));
        assert_eq!(local.get("Z"), Some(0.0));
    }

    #[test]
    fn test_iteration_follows_graph_order() {
        let g = graph(&["C", "A", "B"], &[("A", "B")]);
        let scores = CentralityScorer::default().score(&g);

        let ids: Vec<&str> = scores.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert_eq!(scores.at(1), 0.5);
    }

    #[test]
    fn test_base_offset_range() {
        assert!(SizePolicy::new(4.0).is_ok());
        assert!(SizePolicy::new(4.5).is_ok());
        assert_eq!(SizePolicy::new(3.9), Err(ScoringError::InvalidBaseOffset(3.9)));
        assert!(SizePolicy::new(f64::NAN).is_err());
    }

    #[test]
    fn test_scope_deserializes_snake_case() {
        let scope: ScoringScope = serde_json::from_str("\"per_component\"").unwrap();
        assert_eq!(scope, ScoringScope::PerComponent);
    }

    fn arb_graph() -> impl Strategy<Value = Graph> {
        (1usize..12).prop_flat_map(|n| {
            prop::collection::vec((0..n, 0..n), 0..30).prop_map(move |pairs| {
                let ids: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
                let nodes: Vec<RawNode> = ids.iter().map(|id| RawNode::with_id(id)).collect();
                let edges: Vec<RawEdge> = pairs
                    .iter()
                    .map(|&(s, t)| RawEdge::between(&ids[s], &ids[t]))
                    .collect();
                GraphBuilder::new().build(&nodes, &edges)
            })
        })
    }

    proptest! {
        #[test]
        fn prop_scores_within_unit_interval(g in arb_graph(), per_component in any::<bool>()) {
            let scope = if per_component { ScoringScope::PerComponent } else { ScoringScope::Global };
            let scores = CentralityScorer::new(scope).score(&g);

            prop_assert_eq!(scores.len(), g.len());
            if g.len() <= 1 {
                prop_assert_eq!(scores.total(), 0.0);
            }
            for (_, value) in scores.iter() {
                prop_assert!((0.0..=1.0).contains(&value));
            }
        }

        #[test]
        fn prop_scoring_is_idempotent(g in arb_graph()) {
            let scorer = CentralityScorer::default();
            prop_assert_eq!(scorer.score(&g), scorer.score(&g));
        }

        #[test]
        fn prop_size_is_exact(centrality in 0.0f64..=1.0, base in 4.0f64..=5.0) {
            let policy = SizePolicy::new(base).unwrap();
            prop_assert_eq!(policy.size(centrality), base + centrality * 50.0);
        }
    }
}
