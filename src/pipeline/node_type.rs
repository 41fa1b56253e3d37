//! Node types and parameters for nodes created from configuration.
//!
//! [`NodeFactory`] turns a [`NodeType`] plus a parameter table into a
//! built-in node. Parameters use [`ParamValue`], which deserializes from the
//! plain TOML/JSON values of a pipeline file.

use crate::config::ExecutionSettings;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::node::{AnyNode, BuiltinNode};
use crate::pipeline::nodes::{
    BoxSmoothNode, ExtractRegionNode, ImageSourceNode, PieceSourceNode, ShiftScaleNode,
};
use crate::pipeline::reconcile::ReconcileOptions;
use crate::types::Extent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
}

impl ParamValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers are accepted where a float is expected.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// A six-integer list as an extent.
    pub fn as_extent(&self) -> Option<Extent> {
        match self {
            ParamValue::IntList(v) => <[i64; 6]>::try_from(v.as_slice()).ok().map(Extent),
            _ => None,
        }
    }

    /// A three-number list, integers allowed.
    pub fn as_vector3(&self) -> Option<[f64; 3]> {
        match self {
            ParamValue::FloatList(v) => <[f64; 3]>::try_from(v.as_slice()).ok(),
            ParamValue::IntList(v) if v.len() == 3 => Some([v[0] as f64, v[1] as f64, v[2] as f64]),
            _ => None,
        }
    }
}

impl From<Extent> for ParamValue {
    fn from(value: Extent) -> Self {
        ParamValue::IntList(value.0.to_vec())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

/// Error for a parameter whose value has the wrong shape.
pub(crate) fn bad_param(node: &str, key: &str, expected: &str) -> PipelineError {
    PipelineError::node(node, format!("parameter '{}' expects {}", key, expected))
}

/// Types of built-in nodes that can be created from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    // Sources
    /// Analytic structured image.
    ImageSource,
    /// Piece-addressed point set.
    PieceSource,

    // Filters
    /// Point-wise `(v + shift) * scale` on the active scalars.
    ShiftScale,
    /// Restriction to a volume of interest.
    ExtractRegion,
    /// Box-average smoothing with a stencil radius.
    BoxSmooth,
}

impl NodeType {
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::ImageSource => "Image Source",
            NodeType::PieceSource => "Piece Source",
            NodeType::ShiftScale => "Shift/Scale",
            NodeType::ExtractRegion => "Extract Region",
            NodeType::BoxSmooth => "Box Smooth",
        }
    }

    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::ImageSource,
            NodeType::PieceSource,
            NodeType::ShiftScale,
            NodeType::ExtractRegion,
            NodeType::BoxSmooth,
        ]
    }

    pub fn is_source(&self) -> bool {
        matches!(self, NodeType::ImageSource | NodeType::PieceSource)
    }

    /// Parameters the node accepts, for help output.
    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            NodeType::ImageSource => &["whole_extent", "origin", "spacing", "scalar_name"],
            NodeType::PieceSource => &["total_points"],
            NodeType::ShiftScale => &["shift", "scale", "release_data"],
            NodeType::ExtractRegion => &["voi", "release_data"],
            NodeType::BoxSmooth => &["radius", "release_data"],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NodeType::ImageSource => {
                "Generates a structured image over its whole extent.\n\
                 Point scalars are i + 10j + 100k; also emits point\n\
                 coordinates and a cell index array."
            }
            NodeType::PieceSource => {
                "Splits a point set into pieces on request.\n\
                 Ghost levels extend a piece into its neighbours."
            }
            NodeType::ShiftScale => {
                "Computes (v + shift) * scale on the active scalars.\n\
                 Other input arrays are passed or copied through."
            }
            NodeType::ExtractRegion => {
                "Restricts the image to a volume of interest.\n\
                 The output whole extent is the input's clipped to it."
            }
            NodeType::BoxSmooth => {
                "Averages the active scalars over a box stencil.\n\
                 Requests its input grown by the stencil radius."
            }
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Factory for creating built-in nodes from configuration.
pub struct NodeFactory {
    reconcile: ReconcileOptions,
}

impl NodeFactory {
    pub fn new(settings: &ExecutionSettings) -> Self {
        Self {
            reconcile: ReconcileOptions {
                release_data: settings.release_data,
            },
        }
    }

    /// Create a node of the given type, then apply `params` in key order.
    pub fn create(
        &self,
        node_type: NodeType,
        name: &str,
        params: &BTreeMap<String, ParamValue>,
    ) -> PipelineResult<AnyNode> {
        let mut node = match node_type {
            NodeType::ImageSource => BuiltinNode::ImageSource(ImageSourceNode::new(
                name,
                ImageSourceNode::DEFAULT_WHOLE_EXTENT,
            )),
            NodeType::PieceSource => BuiltinNode::PieceSource(PieceSourceNode::new(
                name,
                PieceSourceNode::DEFAULT_TOTAL_POINTS,
            )),
            NodeType::ShiftScale => {
                BuiltinNode::ShiftScale(ShiftScaleNode::new(name, 0.0, 1.0, self.reconcile))
            }
            NodeType::ExtractRegion => BuiltinNode::ExtractRegion(ExtractRegionNode::new(
                name,
                ExtractRegionNode::UNBOUNDED,
                self.reconcile,
            )),
            NodeType::BoxSmooth => {
                BuiltinNode::BoxSmooth(BoxSmoothNode::new(name, 1, self.reconcile))
            }
        };

        for (key, value) in params {
            node.set_parameter(key, value)?;
        }
        tracing::debug!("Created {} node '{}'", node_type, name);
        Ok(AnyNode::Builtin(node))
    }
}
