//! Per-node execution policy: when a node must run, and how it runs.
//!
//! The [`Pipeline`](crate::pipeline::executor::Pipeline) drives the three
//! request phases over the graph. For the data phase it consults the
//! executive attached to each node:
//!
//! - [`Executive::need_to_execute`] decides whether the node's current output
//!   already satisfies the negotiated request.
//! - [`Executive::execute_data`] runs the node and stamps its outputs.
//!
//! [`StreamingExecutive`] is the plain demand-driven policy.
//! [`CachedExecutive`](crate::pipeline::cache::CachedExecutive) layers a slot
//! table of earlier results on top of it. [`ExecutiveKind`] dispatches between
//! the two without boxing.

use crate::pipeline::cache::CachedExecutive;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::information::Information;
use crate::pipeline::node::AnyNode;
use crate::types::ExtentType;
use std::sync::Arc;

/// Everything an executive may look at while deciding on or running one node.
///
/// `outputs` are staged copies of the node's output information. The pipeline
/// commits them only when the data phase for this node succeeds.
pub struct ExecContext<'a> {
    pub node_name: &'a str,
    /// Output port the request arrived on.
    pub port: usize,
    pub inputs: &'a [Information],
    pub outputs: &'a mut [Information],
    /// Max modification time over the node and everything upstream of it.
    pub pipeline_mtime: u64,
    pub input_ports: usize,
    pub output_ports: usize,
    /// Set by an executive that satisfied the request from a cache.
    pub cache_hit: bool,
}

impl ExecContext<'_> {
    /// The output information the request arrived on.
    pub fn requested(&self) -> Option<&Information> {
        self.outputs.get(self.port)
    }
}

/// Execution policy for one node.
pub trait Executive {
    /// Whether the node must run to satisfy the current request.
    fn need_to_execute(&mut self, ctx: &mut ExecContext<'_>) -> PipelineResult<bool> {
        Ok(data_is_stale(ctx) || !request_satisfied(ctx))
    }

    /// Run the node's `request_data` and stamp the produced outputs.
    fn execute_data(&mut self, node: &mut AnyNode, ctx: &mut ExecContext<'_>) -> PipelineResult<()> {
        run_request_data(node, ctx)
    }
}

/// True when the requested output has no usable data, asked for another pass,
/// or is older than the pipeline.
pub fn data_is_stale(ctx: &ExecContext<'_>) -> bool {
    let Some(info) = ctx.requested() else {
        return true;
    };
    let Some(data) = info.data_object() else {
        tracing::trace!("'{}': no data object yet", ctx.node_name);
        return true;
    };
    if !data.is_generated() {
        tracing::trace!("'{}': output never generated", ctx.node_name);
        return true;
    }
    if info.continue_executing() {
        tracing::trace!("'{}': continuing a multi-pass execution", ctx.node_name);
        return true;
    }
    if data.mtime() < ctx.pipeline_mtime {
        tracing::trace!(
            "'{}': data mtime {} older than pipeline mtime {}",
            ctx.node_name,
            data.mtime(),
            ctx.pipeline_mtime
        );
        return true;
    }
    false
}

/// True when the current output already covers the requested region: a
/// containing extent for structured data, the exact piece for piece data.
pub fn request_satisfied(ctx: &ExecContext<'_>) -> bool {
    let Some(info) = ctx.requested() else {
        return false;
    };
    let Some(data) = info.data_object() else {
        return false;
    };
    match data.extent_type() {
        ExtentType::Structured => match info.update_extent() {
            Some(requested) => data.extent().contains(&requested),
            None => true,
        },
        ExtentType::Pieces => {
            let requested = info.piece_request().unwrap_or_default();
            data.piece() == Some(requested)
        }
    }
}

/// Clear the continue flags, run the node, then mark every output generated.
pub fn run_request_data(node: &mut AnyNode, ctx: &mut ExecContext<'_>) -> PipelineResult<()> {
    for info in ctx.outputs.iter_mut() {
        info.set_continue_executing(false);
    }

    tracing::trace!("request_data on '{}'", ctx.node_name);
    node.request_data(ctx.inputs, ctx.outputs)?;

    mark_outputs_generated(ctx);
    Ok(())
}

/// Stamp each output data object as freshly produced.
///
/// Piece outputs record the piece that was requested. A structured output that does not cover its update extent is kept
/// but reported.
pub fn mark_outputs_generated(ctx: &mut ExecContext<'_>) {
    for info in ctx.outputs.iter_mut() {
        let update_extent = info.update_extent();
        let piece = info.piece_request();
        let Some(handle) = info.data_object_mut() else {
            continue;
        };
        let data = Arc::make_mut(handle);
        match data.extent_type() {
            ExtentType::Structured => {
                if let Some(requested) = update_extent {
                    if !data.extent().contains(&requested) {
                        tracing::warn!(
                            "'{}' produced {} but {} was requested",
                            ctx.node_name,
                            data.extent(),
                            requested
                        );
                    }
                }
            }
            ExtentType::Pieces => data.set_piece(Some(piece.unwrap_or_default())),
        }
        data.data_has_been_generated();
    }
}

/// The plain demand-driven policy.
#[derive(Debug, Clone, Default)]
pub struct StreamingExecutive;

impl Executive for StreamingExecutive {}

/// Enum dispatch over the executive implementations.
#[derive(Debug)]
pub enum ExecutiveKind {
    Streaming(StreamingExecutive),
    Cached(CachedExecutive),
}

impl Default for ExecutiveKind {
    fn default() -> Self {
        ExecutiveKind::Streaming(StreamingExecutive)
    }
}

impl ExecutiveKind {
    pub fn need_to_execute(&mut self, ctx: &mut ExecContext<'_>) -> PipelineResult<bool> {
        match self {
            ExecutiveKind::Streaming(e) => e.need_to_execute(ctx),
            ExecutiveKind::Cached(e) => e.need_to_execute(ctx),
        }
    }

    pub fn execute_data(&mut self, node: &mut AnyNode, ctx: &mut ExecContext<'_>) -> PipelineResult<()> {
        match self {
            ExecutiveKind::Streaming(e) => e.execute_data(node, ctx),
            ExecutiveKind::Cached(e) => e.execute_data(node, ctx),
        }
    }

    pub fn as_cached(&self) -> Option<&CachedExecutive> {
        match self {
            ExecutiveKind::Cached(e) => Some(e),
            ExecutiveKind::Streaming(_) => None,
        }
    }

    pub fn as_cached_mut(&mut self) -> Option<&mut CachedExecutive> {
        match self {
            ExecutiveKind::Cached(e) => Some(e),
            ExecutiveKind::Streaming(_) => None,
        }
    }
}
