//! Pipeline builders for tests

use extent_pipeline::pipeline::nodes::{
    BoxSmoothNode, ExtractRegionNode, ImageSourceNode, PieceSourceNode, ShiftScaleNode,
};
use extent_pipeline::pipeline::{AnyNode, BuiltinNode, NodeId, Pipeline, ReconcileOptions};
use extent_pipeline::types::Extent;

pub fn image_source(pipeline: &mut Pipeline, name: &str, whole: Extent) -> NodeId {
    pipeline.add_node(AnyNode::Builtin(BuiltinNode::ImageSource(
        ImageSourceNode::new(name, whole),
    )))
}

pub fn piece_source(pipeline: &mut Pipeline, name: &str, total_points: usize) -> NodeId {
    pipeline.add_node(AnyNode::Builtin(BuiltinNode::PieceSource(
        PieceSourceNode::new(name, total_points),
    )))
}

pub fn shift_scale(pipeline: &mut Pipeline, name: &str, shift: f64, scale: f64) -> NodeId {
    pipeline.add_node(AnyNode::Builtin(BuiltinNode::ShiftScale(ShiftScaleNode::new(
        name,
        shift,
        scale,
        ReconcileOptions::default(),
    ))))
}

pub fn box_smooth(pipeline: &mut Pipeline, name: &str, radius: i64) -> NodeId {
    pipeline.add_node(AnyNode::Builtin(BuiltinNode::BoxSmooth(BoxSmoothNode::new(
        name,
        radius,
        ReconcileOptions::default(),
    ))))
}

pub fn extract_region(pipeline: &mut Pipeline, name: &str, voi: Extent) -> NodeId {
    pipeline.add_node(AnyNode::Builtin(BuiltinNode::ExtractRegion(
        ExtractRegionNode::new(name, voi, ReconcileOptions::default()),
    )))
}

/// `source -> shift_scale(shift, scale)`, returning both ids.
pub fn source_and_filter(whole: Extent, shift: f64, scale: f64) -> (Pipeline, NodeId, NodeId) {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", whole);
    let filter = shift_scale(&mut pipeline, "filter", shift, scale);
    pipeline.add_edge(source, filter).unwrap();
    (pipeline, source, filter)
}

/// Column strips `[x, x + width - 1] x [0, height - 1]`, one per `count`.
pub fn column_strips(count: i64, width: i64, height: i64) -> Vec<Extent> {
    (0..count)
        .map(|n| Extent::new(n * width, (n + 1) * width - 1, 0, height - 1, 0, 0))
        .collect()
}
