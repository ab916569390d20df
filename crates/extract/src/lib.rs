pub mod builder;
pub mod error;
pub mod graph;
pub mod llm;
pub mod prompt;
pub mod schema;

pub use builder::{BuildReport, GraphBuilder};
pub use error::GraphError;
pub use graph::{DEFAULT_LABEL, Edge, Graph, Node, UNKNOWN_WORK};
pub use llm::OllamaClient;
pub use schema::{Endpoint, EndpointObject, ExtractionResult, NodeRecord, RawEdge, RawNode, ScalarId};

use anyhow::{Context, Result};
use tracing::info;

/// Client side of the text-understanding service: sends lore text to the
/// model and returns whatever nodes and edges it produced, unvalidated.
pub struct LoreExtractor {
    llm_client: OllamaClient,
    max_input_chars: usize,
    json_attempts: usize,
}

impl LoreExtractor {
    pub fn new(llm_client: OllamaClient, max_input_chars: usize) -> Self {
        Self {
            llm_client,
            max_input_chars,
            json_attempts: 3,
        }
    }

    /// Extract raw characters and relationships from a piece of text
    pub async fn extract_from_text(&self, text: &str) -> Result<ExtractionResult> {
        let sample = truncate_chars(text, self.max_input_chars);
        let prompt = prompt::build_extraction_prompt(sample);

        let json_str = self
            .llm_client
            .generate_json_with_retry(&prompt, self.json_attempts)
            .await
            .context("Failed to extract characters after retries")?;

        let result: ExtractionResult =
            serde_json::from_str(&json_str).context("Failed to parse extraction result")?;

        info!(
            model = self.llm_client.model(),
            chars = sample.chars().count(),
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            "Extraction finished"
        );

        Ok(result)
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
