//! Structural importance for character graphs.
//!
//! Scores are plain degree centrality, recomputed from scratch for every
//! graph snapshot, plus the presentation policy that turns them into node
//! sizes.

pub mod components;
pub mod scorer;

pub use components::component_sizes;
pub use scorer::{
    CentralityMap, CentralityScorer, DEFAULT_BASE_OFFSET, SCALE_FACTOR, ScoringError,
    ScoringScope, SizePolicy,
};
