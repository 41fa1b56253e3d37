//! Execution settings shared by every pipeline built from a description.
//!
//! # Main Types
//!
//! - [`ExecutionSettings`] - cache sizing, attribute release policy, log filter

use crate::pipeline::cache::DEFAULT_CACHE_SIZE;
use serde::{Deserialize, Serialize};

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,extent_pipeline=debug";

/// Settings applied when building and running a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Slot count used by [`Pipeline::enable_cache`](crate::pipeline::Pipeline::enable_cache).
    pub default_cache_size: u32,

    /// Passed to every attribute reconciler the node factory builds. When
    /// true, copied attribute arrays are always freshly allocated.
    pub release_data: bool,

    /// `tracing` filter directive used by the CLI when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            default_cache_size: DEFAULT_CACHE_SIZE,
            release_data: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
