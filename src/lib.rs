//! # extent-pipeline: demand-driven extent pipeline
//!
//! A dataflow engine in which nodes produce data objects only when a consumer
//! requests them, and only for the region requested. Structured data is
//! addressed by integer extents, unstructured data by piece descriptors.
//!
//! ## Architecture
//!
//! - **Pipeline**: DAG of nodes with a three-phase update (information,
//!   update extent, data)
//! - **Executives**: per-node policy deciding whether a node must run
//! - **Cache layer**: slot table answering requests contained in earlier
//!   results, evicting the oldest
//! - **Attribute reconciler**: passes or copies input arrays a node does not
//!   compute itself
//! - **Configuration**: pipeline descriptions in TOML or JSON
//!
//! ## Example
//!
//! ```
//! use extent_pipeline::pipeline::{AnyNode, BuiltinNode, Pipeline, ReconcileOptions};
//! use extent_pipeline::pipeline::nodes::{BoxSmoothNode, ImageSourceNode};
//! use extent_pipeline::types::Extent;
//!
//! let mut pipeline = Pipeline::default();
//! let source = pipeline.add_node(AnyNode::Builtin(BuiltinNode::ImageSource(
//!     ImageSourceNode::new("source", Extent::new(0, 31, 0, 31, 0, 0)),
//! )));
//! let smooth = pipeline.add_node(AnyNode::Builtin(BuiltinNode::BoxSmooth(
//!     BoxSmoothNode::new("smooth", 1, ReconcileOptions::default()),
//! )));
//! pipeline.add_edge(source, smooth).unwrap();
//!
//! let stats = pipeline.update(smooth, 0, Extent::new(0, 7, 0, 7, 0, 0)).unwrap();
//! assert_eq!(stats.nodes_executed, 2);
//! let data = pipeline.output_data(smooth, 0).unwrap();
//! assert_eq!(data.extent(), Extent::new(0, 7, 0, 7, 0, 0));
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use config::{ExecutionSettings, PipelineFile};
pub use error::{Error, Result, ResultExt};
pub use pipeline::{NodeId, Pipeline, PipelineBuilder, PipelineError, UpdateStats};
pub use types::{Extent, ExtentType, PieceRequest, UpdateRequest};
