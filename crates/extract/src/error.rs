use thiserror::Error;

/// Structural problems found while building a graph. None of these abort a
/// build: the offending record is skipped and the error is reported.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("malformed node at position {position}: no usable id or name")]
    MalformedNode { position: usize },

    #[error("edge at position {position} has an endpoint without a usable id")]
    MalformedEdge { position: usize },

    #[error("dangling edge {from} -> {to}: unknown node '{missing}'")]
    DanglingEdge {
        from: String,
        to: String,
        missing: String,
    },
}
