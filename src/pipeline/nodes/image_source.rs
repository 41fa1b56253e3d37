//! ImageSource node: an analytic structured image.
//!
//! Advertises its whole extent, origin and spacing during the information
//! phase and generates exactly the requested update extent. Point scalars are
//! `i + 10j + 100k`, so any region can be checked against its indices.

use crate::pipeline::data_object::DataArray;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::information::keys::*;
use crate::pipeline::information::Information;
use crate::pipeline::mtime::TimeStamp;
use crate::pipeline::node::Algorithm;
use crate::pipeline::node_type::{bad_param, ParamValue};
use crate::pipeline::nodes::output_data;
use crate::pipeline::port::{DataKind, PortDescriptor};
use crate::types::Extent;
use std::sync::Arc;

static PORTS: &[PortDescriptor] = &[PortDescriptor::output("out", DataKind::Image)];

/// Name of the 3-component physical coordinate point array.
pub const COORDS_ARRAY: &str = "coords";
/// Name of the cell array holding each cell's linear index in the whole
/// cell extent.
pub const CELL_INDEX_ARRAY: &str = "cell_index";

pub struct ImageSourceNode {
    name: String,
    whole_extent: Extent,
    origin: [f64; 3],
    spacing: [f64; 3],
    scalar_name: String,
    mtime: TimeStamp,
}

impl ImageSourceNode {
    pub const DEFAULT_WHOLE_EXTENT: Extent = Extent::new(0, 15, 0, 15, 0, 0);

    pub fn new(name: impl Into<String>, whole_extent: Extent) -> Self {
        Self {
            name: name.into(),
            whole_extent,
            origin: [0.0; 3],
            spacing: [1.0; 3],
            scalar_name: "scalars".to_string(),
            mtime: TimeStamp::new(),
        }
    }

    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_scalar_name(mut self, name: impl Into<String>) -> Self {
        self.scalar_name = name.into();
        self
    }

    pub fn whole_extent(&self) -> Extent {
        self.whole_extent
    }

    pub fn set_whole_extent(&mut self, whole_extent: Extent) {
        if self.whole_extent != whole_extent {
            self.whole_extent = whole_extent;
            self.mtime.modified();
        }
    }

    pub fn scalar_name(&self) -> &str {
        &self.scalar_name
    }

    /// Scalar value generated at point `(i, j, k)`.
    pub fn sample(i: i64, j: i64, k: i64) -> f64 {
        (i + 10 * j + 100 * k) as f64
    }
}

impl Algorithm for ImageSourceNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn ports(&self) -> &[PortDescriptor] {
        PORTS
    }

    fn mtime(&self) -> u64 {
        self.mtime.get()
    }

    fn modified(&mut self) {
        self.mtime.modified();
    }

    fn set_parameter(&mut self, key: &str, value: &ParamValue) -> PipelineResult<()> {
        match key {
            "whole_extent" => {
                let ext = value
                    .as_extent()
                    .ok_or_else(|| bad_param(&self.name, key, "six integers"))?;
                self.set_whole_extent(ext);
            }
            "origin" => {
                self.origin = value
                    .as_vector3()
                    .ok_or_else(|| bad_param(&self.name, key, "three numbers"))?;
                self.mtime.modified();
            }
            "spacing" => {
                self.spacing = value
                    .as_vector3()
                    .ok_or_else(|| bad_param(&self.name, key, "three numbers"))?;
                self.mtime.modified();
            }
            "scalar_name" => {
                self.scalar_name = value
                    .as_str()
                    .ok_or_else(|| bad_param(&self.name, key, "a string"))?
                    .to_string();
                self.mtime.modified();
            }
            _ => return Err(bad_param(&self.name, key, "a known parameter name")),
        }
        Ok(())
    }

    fn request_information(
        &mut self,
        _inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let out = &mut outputs[0];
        out.set(WHOLE_EXTENT, self.whole_extent);
        out.set(ORIGIN, self.origin);
        out.set(SPACING, self.spacing);
        Ok(())
    }

    fn request_data(
        &mut self,
        _inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let update = outputs[0]
            .update_extent()
            .unwrap_or(self.whole_extent)
            .intersection(&self.whole_extent);
        let whole_cells = self.whole_extent.cell_extent();

        let out = output_data(&self.name, outputs)?;
        out.initialize();
        out.set_extent(update);
        out.set_origin(self.origin);
        out.set_spacing(self.spacing);

        let scalars = out.allocate_scalars(&self.scalar_name, 1)?;
        for (n, [i, j, k]) in update.indices().enumerate() {
            scalars.values_mut()[n] = Self::sample(i, j, k);
        }

        let mut coords = DataArray::zeros(COORDS_ARRAY, 3, update.num_points())?;
        for (n, [i, j, k]) in update.indices().enumerate() {
            let tuple = coords.tuple_mut(n);
            for (axis, index) in [i, j, k].into_iter().enumerate() {
                tuple[axis] = self.origin[axis] + self.spacing[axis] * index as f64;
            }
        }
        out.point_data_mut().insert(Arc::new(coords));

        let cells = update.cell_extent();
        let mut cell_index = DataArray::zeros(CELL_INDEX_ARRAY, 1, cells.num_points())?;
        for (n, [i, j, k]) in cells.indices().enumerate() {
            cell_index.values_mut()[n] = whole_cells.offset_of(i, j, k).unwrap_or(0) as f64;
        }
        out.cell_data_mut().set_scalars(Arc::new(cell_index));

        tracing::debug!("'{}' generated {}", self.name, update);
        Ok(())
    }
}
