//! Pipeline-specific error types.

use crate::pipeline::id::NodeId;
use crate::pipeline::information::KeyId;
use crate::types::Extent;
use thiserror::Error;

/// Errors that can occur while building or updating a pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A node's information phase needed an upstream key that was absent.
    #[error("Node '{node}' is missing required metadata {key:?}")]
    MissingMetadata { node: String, key: KeyId },

    /// The cache layer only handles single-input/single-output nodes.
    #[error("Node '{node}' has {inputs} input(s) and {outputs} output(s); caching needs exactly one of each")]
    UnsupportedTopology {
        node: String,
        inputs: usize,
        outputs: usize,
    },

    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// Origin or spacing differ between input and output. Not fatal; the
    /// reconciler logs it and transfers nothing.
    #[error("Node '{node}' input/output transforms differ (origin {input_origin:?} vs {output_origin:?}, spacing {input_spacing:?} vs {output_spacing:?})")]
    IncompatibleTransform {
        node: String,
        input_origin: [f64; 3],
        output_origin: [f64; 3],
        input_spacing: [f64; 3],
        output_spacing: [f64; 3],
    },

    #[error("Node '{node}' update extent {update} is outside its whole extent {whole}")]
    InvalidUpdateExtent {
        node: String,
        update: Extent,
        whole: Extent,
    },

    #[error("Node '{node}' port error: {message}")]
    PortArity { node: String, message: String },

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Data kind mismatch: {0}")]
    DataKindMismatch(String),

    #[error("Cycle detected in pipeline graph")]
    CycleDetected,

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    /// A node's own `request_data` failed.
    #[error("Node '{node}' error: {message}")]
    Node { node: String, message: String },
}

impl PipelineError {
    /// Shorthand for a node's own execution failure.
    pub fn node(node: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Node {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn missing(node: impl Into<String>, key: KeyId) -> Self {
        PipelineError::MissingMetadata {
            node: node.into(),
            key,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
