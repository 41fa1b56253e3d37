//! Demand-driven, extent-aware execution pipeline.
//!
//! Nodes are connected output port → input port into a DAG. Nothing runs until
//! a consumer asks an output for a region; the request then travels upstream
//! and only the data needed to satisfy it is produced.
//!
//! # Architecture
//!
//! ```text
//! [ImageSource] ──► [BoxSmooth] ──► [ExtractRegion]
//!                        ▲
//!                  CachedExecutive
//! ```
//!
//! An update of one output runs three phases over the upstream closure of its
//! node: information (sources first), update extent (target first) and data
//! (post-order, only where needed). Each node's [`Executive`] decides whether
//! it must run; [`CachedExecutive`] answers repeated requests from a slot
//! table of earlier results.
//!
//! # Design
//!
//! - **Enum dispatch**: `BuiltinNode` and `ExecutiveKind` avoid boxing on the
//!   request path; plugins go through `Box<dyn Algorithm>`.
//! - **Shared data**: data objects and attribute arrays are `Arc`-shared;
//!   producers write copy-on-write.
//! - **Typed metadata**: [`Information`] keys are marker types fixing their
//!   value type.
//! - **Compiled plans**: the upstream closure of each update target is sorted
//!   once per graph generation.

pub mod cache;
pub mod compiled_plan;
pub mod compiler;
pub mod data_object;
pub mod error;
pub mod executive;
pub mod executor;
pub mod id;
pub mod information;
pub mod mtime;
pub mod node;
pub mod node_type;
pub mod nodes;
pub mod port;
pub mod reconcile;

pub use cache::{CacheSlot, CachedExecutive, DEFAULT_CACHE_SIZE};
pub use compiled_plan::{CompiledPlan, PlanStats};
pub use compiler::PipelineCompiler;
pub use data_object::{ArrayHandle, AttributeSet, DataArray, DataHandle, DataObject};
pub use error::{PipelineError, PipelineResult};
pub use executive::{ExecContext, Executive, ExecutiveKind, StreamingExecutive};
pub use executor::{Edge, NodeSlot, Pipeline, PipelineBuilder, PipelineNodeIds, UpdateStats};
pub use id::{EdgeId, NodeId, PortId};
pub use information::{Information, InformationKey, KeyId};
pub use node::{Algorithm, AnyNode, BuiltinNode};
pub use node_type::{NodeFactory, NodeType, ParamValue};
pub use port::{DataKind, PortDescriptor, PortDirection};
pub use reconcile::{
    AttributeReconciler, ProducedArrayGuard, ReconcileOptions, ReconcileOutcome, SkipReason,
};
