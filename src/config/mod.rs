//! Pipeline description files.
//!
//! A [`PipelineFile`] names the nodes of a pipeline, how they are wired and
//! which updates to run. It is stored as TOML (`.toml`) or JSON (any other
//! extension).
//!
//! # Example
//!
//! ```toml
//! [settings]
//! default_cache_size = 4
//!
//! [[nodes]]
//! name = "source"
//! type = "image_source"
//! params = { whole_extent = [0, 63, 0, 63, 0, 0] }
//!
//! [[nodes]]
//! name = "smooth"
//! type = "box_smooth"
//! params = { radius = 2 }
//! cached = 4
//!
//! [[edges]]
//! from = "source"
//! to = "smooth"
//!
//! [[requests]]
//! node = "smooth"
//! request = { extent = [0, 15, 0, 15, 0, 0] }
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Error, Result, ResultExt};
use crate::pipeline::executor::{Pipeline, PipelineBuilder, PipelineNodeIds};
use crate::pipeline::node_type::{NodeType, ParamValue};
use crate::types::UpdateRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Extension selecting the TOML format; everything else is JSON.
pub const TOML_EXTENSION: &str = "toml";

/// One node of a pipeline description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    /// Unique name, used by edges and requests.
    pub name: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,

    /// Put a cache layer with this many slots in front of the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<u32>,
}

impl NodeDescription {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            params: BTreeMap::new(),
            cached: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_cache(mut self, size: u32) -> Self {
        self.cached = Some(size);
        self
    }
}

/// A connection between two described nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDescription {
    pub from: String,
    #[serde(default)]
    pub from_port: usize,
    pub to: String,
    #[serde(default)]
    pub to_port: usize,
}

impl EdgeDescription {
    /// Output 0 of `from` to input 0 of `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            from_port: 0,
            to: to.into(),
            to_port: 0,
        }
    }
}

fn whole_extent() -> UpdateRequest {
    UpdateRequest::WholeExtent
}

/// An update to run once the pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescription {
    pub node: String,
    #[serde(default)]
    pub port: usize,
    #[serde(default = "whole_extent")]
    pub request: UpdateRequest,
}

/// A complete pipeline description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineFile {
    #[serde(default)]
    pub settings: ExecutionSettings,

    #[serde(default)]
    pub nodes: Vec<NodeDescription>,

    #[serde(default)]
    pub edges: Vec<EdgeDescription>,

    #[serde(default)]
    pub requests: Vec<RequestDescription>,
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TOML_EXTENSION))
}

impl PipelineFile {
    /// Load a description, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read pipeline file {:?}: {}", path, e))
        })?;

        if is_toml(path) {
            toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse pipeline file {:?}: {}", path, e))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse pipeline file {:?}: {}", path, e))
            })
        }
    }

    /// Save the description, choosing the format by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create pipeline directory: {}", e))
            })?;
        }

        let content = if is_toml(path) {
            toml::to_string_pretty(self)
                .map_err(|e| Error::Serialization(format!("Failed to serialize pipeline: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| Error::Serialization(format!("Failed to serialize pipeline: {}", e)))?
        };

        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!("Failed to write pipeline file {:?}: {}", path, e))
        })
    }

    /// Build the described pipeline. Requests are not run.
    pub fn build(&self) -> Result<(Pipeline, PipelineNodeIds)> {
        PipelineBuilder::from_file(self).context("Building pipeline")
    }

    /// Description of a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeDescription> {
        self.nodes.iter().find(|n| n.name == name)
    }
}
