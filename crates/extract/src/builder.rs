use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::GraphError;
use crate::graph::{DEFAULT_LABEL, Edge, Graph, Node, UNKNOWN_WORK};
use crate::schema::{RawEdge, RawNode, non_blank};

/// What happened to the raw records during a build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub nodes_in: usize,
    pub duplicates_merged: usize,
    pub edges_in: usize,
    /// Records that were skipped, in input order.
    pub issues: Vec<GraphError>,
}

impl BuildReport {
    pub fn nodes_dropped(&self) -> usize {
        self.issues
            .iter()
            .filter(|e| matches!(e, GraphError::MalformedNode { .. }))
            .count()
    }

    pub fn edges_dropped(&self) -> usize {
        self.issues.len() - self.nodes_dropped()
    }
}

/// Node fields collected while merging duplicates. First non-empty value wins.
#[derive(Default)]
struct PendingNode {
    id: String,
    name: Option<String>,
    work: Option<String>,
    description: Option<String>,
}

impl PendingNode {
    fn absorb(&mut self, raw: &RawNode) {
        if self.name.is_none() {
            self.name = raw.name();
        }
        if self.work.is_none() {
            self.work = raw.work();
        }
        if self.description.is_none() {
            self.description = raw.description();
        }
    }

    fn finish(self) -> Node {
        Node {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            work: self.work.unwrap_or_else(|| UNKNOWN_WORK.to_string()),
            description: self.description,
            id: self.id,
        }
    }
}

/// Turns raw extractor records into a deduplicated, consistent [`Graph`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, raw_nodes: &[RawNode], raw_edges: &[RawEdge]) -> Graph {
        self.build_with_report(raw_nodes, raw_edges).0
    }

    pub fn build_with_report(
        &self,
        raw_nodes: &[RawNode],
        raw_edges: &[RawEdge],
    ) -> (Graph, BuildReport) {
        let mut report = BuildReport {
            nodes_in: raw_nodes.len(),
            edges_in: raw_edges.len(),
            ..BuildReport::default()
        };

        let mut pending: Vec<PendingNode> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (position, raw) in raw_nodes.iter().enumerate() {
            let Some(key) = raw.key() else {
                warn!(position, node = ?raw, "Dropping node without id or name");
                report.issues.push(GraphError::MalformedNode { position });
                continue;
            };

            let slot = match seen.get(&key) {
                Some(&slot) => {
                    report.duplicates_merged += 1;
                    slot
                }
                None => {
                    seen.insert(key.clone(), pending.len());
                    pending.push(PendingNode {
                        id: key,
                        ..PendingNode::default()
                    });
                    pending.len() - 1
                }
            };
            pending[slot].absorb(raw);
        }

        let mut edges = Vec::with_capacity(raw_edges.len());

        for (position, raw) in raw_edges.iter().enumerate() {
            let source = raw.source.as_ref().and_then(|e| e.resolve());
            let target = raw.target.as_ref().and_then(|e| e.resolve());

            let (Some(source), Some(target)) = (source, target) else {
                debug!(position, "Dropping edge with undecodable endpoint");
                report.issues.push(GraphError::MalformedEdge { position });
                continue;
            };

            let missing = [&source, &target]
                .into_iter()
                .find(|id| !seen.contains_key(id.as_str()))
                .cloned();
            if let Some(missing) = missing {
                debug!(%source, %target, %missing, "Dropping dangling edge");
                report.issues.push(GraphError::DanglingEdge {
                    from: source,
                    to: target,
                    missing,
                });
                continue;
            }

            edges.push(Edge {
                source,
                target,
                label: non_blank(raw.label.as_deref()).unwrap_or_else(|| DEFAULT_LABEL.to_string()),
                work: non_blank(raw.work.as_deref()),
            });
        }

        let nodes = pending.into_iter().map(PendingNode::finish).collect();
        let graph = Graph::from_parts(nodes, edges);

        debug!(
            nodes = graph.len(),
            edges = graph.edges().len(),
            merged = report.duplicates_merged,
            skipped = report.issues.len(),
            "Built relationship graph"
        );

        (graph, report)
    }
}
