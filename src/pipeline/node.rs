//! Node abstraction for the pipeline.
//!
//! Two-layer design:
//! - **`Algorithm` trait** for user-defined nodes and test instrumentation.
//! - **`BuiltinNode` enum** for the built-in nodes. The compiler can inline
//!   match arms, eliminating dynamic dispatch on the request path.
//!
//! `AnyNode` wraps either variant so the pipeline can handle both uniformly.
//!
//! # Request contract
//!
//! Every node answers three requests, always in this order within one update:
//!
//! 1. [`request_information`](Algorithm::request_information): derive output
//!    metadata (whole extent, origin, spacing) from the inputs. Metadata only.
//! 2. [`request_update_extent`](Algorithm::request_update_extent): given what
//!    was asked of the outputs, write what the inputs must provide. The
//!    executive has already copied the request through unchanged, so nodes
//!    without a stencil need not override it.
//! 3. [`request_data`](Algorithm::request_data): produce the output data
//!    objects. Inputs already cover their negotiated update extents.
//!
//! A node may set `CONTINUE_EXECUTING` on an output during `request_data` to be
//! re-invoked immediately.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::information::Information;
use crate::pipeline::node_type::ParamValue;
use crate::pipeline::port::PortDescriptor;

/// Trait for pluggable/user-defined nodes.
pub trait Algorithm: Send {
    /// Human-readable name of this node.
    fn name(&self) -> &str;

    /// Port descriptors for this node.
    fn ports(&self) -> &[PortDescriptor];

    /// Modification time of the node's own parameters.
    fn mtime(&self) -> u64;

    /// Mark the node's parameters as changed.
    fn modified(&mut self);

    /// Called when a parameter is set from outside the pipeline.
    fn set_parameter(&mut self, key: &str, _value: &ParamValue) -> PipelineResult<()> {
        Err(PipelineError::node(
            self.name(),
            format!("unknown parameter '{}'", key),
        ))
    }

    fn request_information(
        &mut self,
        _inputs: &[Information],
        _outputs: &mut [Information],
    ) -> PipelineResult<()> {
        Ok(())
    }

    fn request_update_extent(
        &mut self,
        _inputs: &mut [Information],
        _outputs: &[Information],
    ) -> PipelineResult<()> {
        Ok(())
    }

    fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()>;
}

// Forward-declare built-in node types (defined in nodes/ submodule).
use crate::pipeline::nodes::{
    BoxSmoothNode, ExtractRegionNode, ImageSourceNode, PieceSourceNode, ShiftScaleNode,
};

/// Enum dispatch for built-in nodes. No dynamic dispatch overhead.
pub enum BuiltinNode {
    ImageSource(ImageSourceNode),
    PieceSource(PieceSourceNode),
    ShiftScale(ShiftScaleNode),
    ExtractRegion(ExtractRegionNode),
    BoxSmooth(BoxSmoothNode),
}

impl BuiltinNode {
    pub fn name(&self) -> &str {
        match self {
            BuiltinNode::ImageSource(n) => n.name(),
            BuiltinNode::PieceSource(n) => n.name(),
            BuiltinNode::ShiftScale(n) => n.name(),
            BuiltinNode::ExtractRegion(n) => n.name(),
            BuiltinNode::BoxSmooth(n) => n.name(),
        }
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        match self {
            BuiltinNode::ImageSource(n) => n.ports(),
            BuiltinNode::PieceSource(n) => n.ports(),
            BuiltinNode::ShiftScale(n) => n.ports(),
            BuiltinNode::ExtractRegion(n) => n.ports(),
            BuiltinNode::BoxSmooth(n) => n.ports(),
        }
    }

    pub fn mtime(&self) -> u64 {
        match self {
            BuiltinNode::ImageSource(n) => n.mtime(),
            BuiltinNode::PieceSource(n) => n.mtime(),
            BuiltinNode::ShiftScale(n) => n.mtime(),
            BuiltinNode::ExtractRegion(n) => n.mtime(),
            BuiltinNode::BoxSmooth(n) => n.mtime(),
        }
    }

    pub fn modified(&mut self) {
        match self {
            BuiltinNode::ImageSource(n) => n.modified(),
            BuiltinNode::PieceSource(n) => n.modified(),
            BuiltinNode::ShiftScale(n) => n.modified(),
            BuiltinNode::ExtractRegion(n) => n.modified(),
            BuiltinNode::BoxSmooth(n) => n.modified(),
        }
    }

    pub fn set_parameter(&mut self, key: &str, value: &ParamValue) -> PipelineResult<()> {
        match self {
            BuiltinNode::ImageSource(n) => n.set_parameter(key, value),
            BuiltinNode::PieceSource(n) => n.set_parameter(key, value),
            BuiltinNode::ShiftScale(n) => n.set_parameter(key, value),
            BuiltinNode::ExtractRegion(n) => n.set_parameter(key, value),
            BuiltinNode::BoxSmooth(n) => n.set_parameter(key, value),
        }
    }

    pub fn request_information(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        match self {
            BuiltinNode::ImageSource(n) => n.request_information(inputs, outputs),
            BuiltinNode::PieceSource(n) => n.request_information(inputs, outputs),
            BuiltinNode::ShiftScale(n) => n.request_information(inputs, outputs),
            BuiltinNode::ExtractRegion(n) => n.request_information(inputs, outputs),
            BuiltinNode::BoxSmooth(n) => n.request_information(inputs, outputs),
        }
    }

    pub fn request_update_extent(
        &mut self,
        inputs: &mut [Information],
        outputs: &[Information],
    ) -> PipelineResult<()> {
        match self {
            BuiltinNode::ImageSource(n) => n.request_update_extent(inputs, outputs),
            BuiltinNode::PieceSource(n) => n.request_update_extent(inputs, outputs),
            BuiltinNode::ShiftScale(n) => n.request_update_extent(inputs, outputs),
            BuiltinNode::ExtractRegion(n) => n.request_update_extent(inputs, outputs),
            BuiltinNode::BoxSmooth(n) => n.request_update_extent(inputs, outputs),
        }
    }

    pub fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        match self {
            BuiltinNode::ImageSource(n) => n.request_data(inputs, outputs),
            BuiltinNode::PieceSource(n) => n.request_data(inputs, outputs),
            BuiltinNode::ShiftScale(n) => n.request_data(inputs, outputs),
            BuiltinNode::ExtractRegion(n) => n.request_data(inputs, outputs),
            BuiltinNode::BoxSmooth(n) => n.request_data(inputs, outputs),
        }
    }
}

/// Wrapper that holds either a built-in node (enum dispatch) or a plugin (trait object).
pub enum AnyNode {
    Builtin(BuiltinNode),
    Plugin(Box<dyn Algorithm>),
}

impl AnyNode {
    /// Wrap a user-defined node.
    pub fn plugin(node: impl Algorithm + 'static) -> Self {
        AnyNode::Plugin(Box::new(node))
    }

    pub fn name(&self) -> &str {
        match self {
            AnyNode::Builtin(n) => n.name(),
            AnyNode::Plugin(n) => n.name(),
        }
    }

    pub fn ports(&self) -> &[PortDescriptor] {
        match self {
            AnyNode::Builtin(n) => n.ports(),
            AnyNode::Plugin(n) => n.ports(),
        }
    }

    pub fn mtime(&self) -> u64 {
        match self {
            AnyNode::Builtin(n) => n.mtime(),
            AnyNode::Plugin(n) => n.mtime(),
        }
    }

    pub fn modified(&mut self) {
        match self {
            AnyNode::Builtin(n) => n.modified(),
            AnyNode::Plugin(n) => n.modified(),
        }
    }

    pub fn set_parameter(&mut self, key: &str, value: &ParamValue) -> PipelineResult<()> {
        match self {
            AnyNode::Builtin(n) => n.set_parameter(key, value),
            AnyNode::Plugin(n) => n.set_parameter(key, value),
        }
    }

    pub fn request_information(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        match self {
            AnyNode::Builtin(n) => n.request_information(inputs, outputs),
            AnyNode::Plugin(n) => n.request_information(inputs, outputs),
        }
    }

    pub fn request_update_extent(
        &mut self,
        inputs: &mut [Information],
        outputs: &[Information],
    ) -> PipelineResult<()> {
        match self {
            AnyNode::Builtin(n) => n.request_update_extent(inputs, outputs),
            AnyNode::Plugin(n) => n.request_update_extent(inputs, outputs),
        }
    }

    pub fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        match self {
            AnyNode::Builtin(n) => n.request_data(inputs, outputs),
            AnyNode::Plugin(n) => n.request_data(inputs, outputs),
        }
    }
}

impl std::fmt::Debug for AnyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyNode::Builtin(n) => write!(f, "Builtin({})", n.name()),
            AnyNode::Plugin(n) => write!(f, "Plugin({})", n.name()),
        }
    }
}
