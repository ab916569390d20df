use centrality::{CentralityMap, CentralityScorer, SizePolicy};
use classifier::{FeatureVector, PredictionResult, RelationshipClassifier};
use extract::{BuildReport, Edge, Graph, GraphBuilder, RawEdge, RawNode};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Node as handed to the store and the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedNode {
    pub id: String,
    pub name: String,
    pub work: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Degree centrality in [0, 1].
    #[serde(default)]
    pub centrality: f64,
    pub size: f64,
    /// Same as `size`; older graph renderers read this field.
    pub val: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedGraph {
    pub nodes: Vec<AnnotatedNode>,
    pub links: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkPrediction {
    pub source: String,
    pub target: String,
    pub label: String,
    pub features: FeatureVector,
    pub prediction: PredictionResult,
}

/// GraphBuilder -> CentralityScorer -> payload assembly. Holds no state
/// between calls, so the same input always produces the same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichmentPipeline {
    builder: GraphBuilder,
    scorer: CentralityScorer,
    sizing: SizePolicy,
}

impl EnrichmentPipeline {
    pub fn new(scorer: CentralityScorer, sizing: SizePolicy) -> Self {
        Self {
            builder: GraphBuilder::new(),
            scorer,
            sizing,
        }
    }

    pub fn enrich(&self, raw_nodes: &[RawNode], raw_edges: &[RawEdge]) -> EnrichedGraph {
        self.enrich_with_report(raw_nodes, raw_edges).0
    }

    pub fn enrich_with_report(
        &self,
        raw_nodes: &[RawNode],
        raw_edges: &[RawEdge],
    ) -> (EnrichedGraph, BuildReport) {
        let (graph, report) = self.builder.build_with_report(raw_nodes, raw_edges);
        let enriched = self.annotate(&graph);

        info!(
            nodes = enriched.nodes.len(),
            links = enriched.links.len(),
            skipped = report.issues.len(),
            "Enriched analysis"
        );

        (enriched, report)
    }

    /// Score an already-built snapshot and assemble the output payload.
    pub fn annotate(&self, graph: &Graph) -> EnrichedGraph {
        let centrality = self.scorer.score(graph);

        let nodes = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(position, node)| {
                let score = centrality.at(position);
                let size = self.sizing.size(score);
                AnnotatedNode {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    work: node.work.clone(),
                    description: node.description.clone(),
                    centrality: score,
                    size,
                    val: size,
                }
            })
            .collect();

        EnrichedGraph {
            nodes,
            links: graph.edges().to_vec(),
        }
    }

    /// Predict a relationship type for every surviving link.
    pub fn classify_links(
        &self,
        classifier: &RelationshipClassifier,
        raw_nodes: &[RawNode],
        raw_edges: &[RawEdge],
    ) -> Vec<LinkPrediction> {
        let graph = self.builder.build(raw_nodes, raw_edges);
        let centrality = self.scorer.score(&graph);

        graph
            .edges()
            .iter()
            .filter_map(|edge| {
                let features = feature_vector(&graph, &centrality, edge)?;
                Some(LinkPrediction {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    label: edge.label.clone(),
                    prediction: classifier.predict(&features),
                    features,
                })
            })
            .collect()
    }
}

/// Classifier input for one edge of a scored graph. `None` when an endpoint
/// is not part of `graph`.
pub fn feature_vector(graph: &Graph, centrality: &CentralityMap, edge: &Edge) -> Option<FeatureVector> {
    let source = graph.node(&edge.source)?;
    let target = graph.node(&edge.target)?;
    let edge_work = edge.work.as_deref().unwrap_or(&target.work);

    Some(FeatureVector {
        source_centrality: centrality.get(&source.id)?,
        target_centrality: centrality.get(&target.id)?,
        source_name_length: name_length(&source.name),
        target_name_length: name_length(&target.name),
        same_work: source.work == target.work,
        source_in_work: source.work == edge_work,
    })
}

fn name_length(name: &str) -> u32 {
    u32::try_from(name.chars().count()).unwrap_or(u32::MAX)
}
