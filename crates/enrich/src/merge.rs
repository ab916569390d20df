use extract::Edge;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::pipeline::{AnnotatedNode, EnrichedGraph};

/// A node accumulated across several analyses, one per work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedNode {
    pub id: String,
    pub name: String,
    pub work_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub size: f64,
    pub val: f64,
}

impl From<&AnnotatedNode> for MergedNode {
    fn from(node: &AnnotatedNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            work_list: vec![node.work.clone()],
            description: node.description.clone(),
            size: node.size,
            val: node.size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedGraph {
    pub nodes: Vec<MergedNode>,
    pub links: Vec<Edge>,
}

impl From<&EnrichedGraph> for MergedGraph {
    fn from(graph: &EnrichedGraph) -> Self {
        merge_analyses(&MergedGraph::default(), graph)
    }
}

/// Fold a freshly enriched analysis into an accumulated view. Existing nodes
/// gain the new work and keep the larger size; links are unique by
/// `(source, target, label)`. Neither input is modified.
pub fn merge_analyses(previous: &MergedGraph, incoming: &EnrichedGraph) -> MergedGraph {
    let mut nodes = previous.nodes.clone();
    let mut positions: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.clone(), i))
        .collect();

    for node in &incoming.nodes {
        match positions.get(&node.id) {
            Some(&i) => {
                let existing = &mut nodes[i];
                if !existing.work_list.contains(&node.work) {
                    existing.work_list.push(node.work.clone());
                }
                if existing.description.is_none() {
                    existing.description = node.description.clone();
                }
                existing.size = existing.size.max(node.size);
            }
            None => {
                positions.insert(node.id.clone(), nodes.len());
                nodes.push(MergedNode::from(node));
            }
        }
    }

    for node in &mut nodes {
        node.val = node.size;
    }

    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let links = previous
        .links
        .iter()
        .chain(&incoming.links)
        .filter(|link| seen.insert((link.source.clone(), link.target.clone(), link.label.clone())))
        .cloned()
        .collect();

    MergedGraph { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnrichmentPipeline;
    use extract::{NodeRecord, RawEdge, RawNode, ScalarId};
    use pretty_assertions::assert_eq;

    fn character(id: &str, work: &str) -> RawNode {
        RawNode::Record(NodeRecord {
            id: Some(ScalarId::Text(id.to_string())),
            name: None,
            work: Some(work.to_string()),
            description: None,
        })
    }

    #[test]
    fn test_merge_two_works() {
        let pipeline = EnrichmentPipeline::default();
        let hobbit = pipeline.enrich(
            &[character("Bilbo", "Hobbit"), character("Gandalf", "Hobbit"), character("Smaug", "Hobbit")],
            &[
                RawEdge::between("Bilbo", "Gandalf").labelled("FRIEND"),
                RawEdge::between("Bilbo", "Smaug").labelled("ENEMY"),
            ],
        );
        let lotr = pipeline.enrich(
            &[character("Frodo", "LotR"), character("Gandalf", "LotR")],
            &[
                RawEdge::between("Frodo", "Gandalf").labelled("MENTOR"),
                RawEdge::between("Frodo", "Gandalf").labelled("MENTOR"),
            ],
        );

        let merged = merge_analyses(&MergedGraph::from(&hobbit), &lotr);

        let ids: Vec<&str> = merged.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Bilbo", "Gandalf", "Smaug", "Frodo"]);

        let gandalf = &merged.nodes[1];
        assert_eq!(gandalf.work_list, vec!["Hobbit".to_string(), "LotR".to_string()]);
        // 30 in the Hobbit, 55 in LotR
        assert_eq!(gandalf.size, 55.0);
        assert_eq!(gandalf.val, 55.0);

        assert_eq!(merged.links.len(), 3);
    }

    #[test]
    fn test_merging_same_analysis_twice_changes_nothing() {
        let enriched = EnrichmentPipeline::default().enrich(
            &[character("A", "W"), character("B", "W")],
            &[RawEdge::between("A", "B")],
        );

        let once = MergedGraph::from(&enriched);
        let twice = merge_analyses(&once, &enriched);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_val_tracks_size_for_untouched_nodes() {
        let previous = MergedGraph {
            nodes: vec![MergedNode {
                id: "Beorn".to_string(),
                name: "Beorn".to_string(),
                work_list: vec!["Hobbit".to_string()],
                description: None,
                size: 30.0,
                val: 12.0,
            }],
            links: Vec::new(),
        };
        let incoming = EnrichmentPipeline::default().enrich(&[character("Frodo", "LotR")], &[]);

        let merged = merge_analyses(&previous, &incoming);

        assert_eq!(merged.nodes[0].id, "Beorn");
        assert_eq!(merged.nodes[0].val, 30.0);
        assert!(merged.nodes.iter().all(|n| n.val == n.size));
    }
}
