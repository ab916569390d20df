pub mod merge;
pub mod pipeline;

pub use merge::{MergedGraph, MergedNode, merge_analyses};
pub use pipeline::{AnnotatedNode, EnrichedGraph, EnrichmentPipeline, LinkPrediction, feature_vector};
