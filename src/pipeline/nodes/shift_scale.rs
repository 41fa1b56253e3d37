//! ShiftScale node: `(v + shift) * scale` over the active point scalars.
//!
//! The output keeps the input's scalar name. Every other input array reaches
//! the output through the attribute reconciler.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::information::Information;
use crate::pipeline::mtime::TimeStamp;
use crate::pipeline::node::Algorithm;
use crate::pipeline::node_type::{bad_param, ParamValue};
use crate::pipeline::nodes::{drop_stale_attributes, input_data, output_data};
use crate::pipeline::port::{DataKind, PortDescriptor};
use crate::pipeline::reconcile::{AttributeReconciler, ReconcileOptions, ReconcileOutcome};

static PORTS: &[PortDescriptor] = &[
    PortDescriptor::input("in", DataKind::Image),
    PortDescriptor::output("out", DataKind::Image),
];

pub struct ShiftScaleNode {
    name: String,
    shift: f64,
    scale: f64,
    reconciler: AttributeReconciler,
    last_outcome: Option<ReconcileOutcome>,
    mtime: TimeStamp,
}

impl ShiftScaleNode {
    pub fn new(name: impl Into<String>, shift: f64, scale: f64, options: ReconcileOptions) -> Self {
        Self {
            name: name.into(),
            shift,
            scale,
            reconciler: AttributeReconciler::new(options),
            last_outcome: None,
            mtime: TimeStamp::new(),
        }
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// How pass-through attributes were handled on the last execution.
    pub fn last_outcome(&self) -> Option<ReconcileOutcome> {
        self.last_outcome
    }
}

impl Algorithm for ShiftScaleNode {
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
            "shift" => {
                self.shift = value
                    .as_float()
                    .ok_or_else(|| bad_param(&self.name, key, "a number"))?;
            }
            "scale" => {
                self.scale = value
                    .as_float()
                    .ok_or_else(|| bad_param(&self.name, key, "a number"))?;
            }
            "release_data" => {
                let release_data = value
                    .as_bool()
                    .ok_or_else(|| bad_param(&self.name, key, "a boolean"))?;
                self.reconciler = AttributeReconciler::new(ReconcileOptions { release_data });
            }
            _ => return Err(bad_param(&self.name, key, "a known parameter name")),
        }
        self.mtime.modified();
        Ok(())
    }

    fn request_data(
        &mut self,
        inputs: &[Information],
        outputs: &mut [Information],
    ) -> PipelineResult<()> {
        let input = input_data(&self.name, inputs)?;
        let in_ext = input.extent();
        let in_scalars = input
            .point_data()
            .scalars()
            .ok_or_else(|| PipelineError::node(&self.name, "input has no active point scalars"))?;
        let update = outputs[0].update_extent().unwrap_or(in_ext);
        if !in_ext.contains(&update) {
            return Err(PipelineError::node(
                &self.name,
                format!("input {} does not cover requested {}", in_ext, update),
            ));
        }

        let (shift, scale) = (self.shift, self.scale);
        let out = output_data(&self.name, outputs)?;
        out.set_extent(update);
        out.set_origin(input.origin());
        out.set_spacing(input.spacing());
        // Only point scalars are produced here.
        out.cell_data_mut().set_active_scalars(None);

        let result = out.allocate_scalars(in_scalars.name(), in_scalars.components())?;
        for (n, [i, j, k]) in update.indices().enumerate() {
            let Some(from) = in_ext.offset_of(i, j, k) else {
                continue;
            };
            for (dst, src) in result.tuple_mut(n).iter_mut().zip(in_scalars.tuple(from)) {
                *dst = (src + shift) * scale;
            }
        }

        let outcome = self.reconciler.reconcile(&self.name, input, out)?;
        drop_stale_attributes(out, outcome);
        self.last_outcome = Some(outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::data_object::{DataArray, DataObject};
    use crate::pipeline::information::keys::*;
    use crate::pipeline::reconcile::SkipReason;
    use crate::types::{Extent, ExtentType};
    use std::sync::Arc;

    fn input(extent: Extent) -> Vec<Information> {
        let mut data = DataObject::image(extent, [0.0; 3], [1.0; 3]);
        let values: Vec<f64> = (0..extent.num_points()).map(|v| v as f64).collect();
        data.point_data_mut()
            .set_scalars(Arc::new(DataArray::new("s", 1, values)));
        data.point_data_mut()
            .insert(Arc::new(DataArray::new("other", 1, vec![7.0; extent.num_points()])));
        data.data_has_been_generated();
        let mut info = Information::new();
        info.set(DATA_OBJECT, Arc::new(data));
        vec![info]
    }

    fn output(update: Extent) -> Vec<Information> {
        let mut info = Information::new();
        info.set(DATA_OBJECT, Arc::new(DataObject::new(ExtentType::Structured)));
        info.set(UPDATE_EXTENT, update);
        vec![info]
    }

    #[test]
    fn test_shift_scale_values_and_pass() {
        let whole = Extent::new(0, 3, 0, 1, 0, 0);
        let inputs = input(whole);
        let mut outputs = output(whole);
        let mut node = ShiftScaleNode::new("ss", 1.0, 2.0, ReconcileOptions::default());
        node.request_data(&inputs, &mut outputs).unwrap();

        let data = outputs[0].data_object().unwrap();
        let scalars = data.point_data().scalars().unwrap();
        assert_eq!(scalars.name(), "s");
        assert_eq!(scalars.values()[0], 2.0);
        assert_eq!(scalars.values()[7], 16.0);
        assert_eq!(node.last_outcome(), Some(ReconcileOutcome::Passed));

        // The pass-through array is shared, not copied
        let passed = data.point_data().get("other").unwrap();
        let source = inputs[0].data_object().unwrap().point_data().get("other").unwrap();
        assert!(Arc::ptr_eq(passed, source));
    }

    #[test]
    fn test_sub_region_copies_other_arrays() {
        let inputs = input(Extent::new(0, 3, 0, 1, 0, 0));
        let update = Extent::new(1, 2, 1, 1, 0, 0);
        let mut outputs = output(update);
        let mut node = ShiftScaleNode::new("ss", 0.0, 1.0, ReconcileOptions::default());
        node.request_data(&inputs, &mut outputs).unwrap();

        let data = outputs[0].data_object().unwrap();
        assert_eq!(data.extent(), update);
        assert_eq!(data.point_data().scalars().unwrap().values(), &[5.0, 6.0]);
        assert_eq!(data.point_data().get("other").unwrap().values(), &[7.0, 7.0]);
        assert_eq!(node.last_outcome(), Some(ReconcileOutcome::Copied));
        assert!(data.is_consistent());
    }

    #[test]
    fn test_single_array_input_keeps_only_result() {
        let extent = Extent::new(0, 3, 0, 0, 0, 0);
        let mut data = DataObject::image(extent, [0.0; 3], [1.0; 3]);
        data.point_data_mut()
            .set_scalars(Arc::new(DataArray::new("s", 1, vec![1.0; 4])));
        let mut info = Information::new();
        info.set(DATA_OBJECT, Arc::new(data));

        let mut outputs = output(Extent::new(1, 2, 0, 0, 0, 0));
        let mut node = ShiftScaleNode::new("ss", 0.0, 3.0, ReconcileOptions::default());
        node.request_data(&[info], &mut outputs).unwrap();
        let out = outputs[0].data_object().unwrap();
        assert_eq!(
            node.last_outcome(),
            Some(ReconcileOutcome::Skipped(SkipReason::SingleArray))
        );
        assert_eq!(out.point_data().len(), 1);
        assert_eq!(out.point_data().scalars().unwrap().values(), &[3.0, 3.0]);
    }

    #[test]
    fn test_missing_scalars_is_an_error() {
        let extent = Extent::new(0, 1, 0, 0, 0, 0);
        let mut info = Information::new();
        info.set(DATA_OBJECT, Arc::new(DataObject::image(extent, [0.0; 3], [1.0; 3])));
        let mut outputs = output(extent);
        let mut node = ShiftScaleNode::new("ss", 0.0, 1.0, ReconcileOptions::default());
        let err = node.request_data(&[info], &mut outputs).unwrap_err();
        assert!(matches!(err, PipelineError::Node { .. }));
    }
}
