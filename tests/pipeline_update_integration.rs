//! Integration tests for the demand-driven update
//!
//! These tests drive whole pipelines through `Pipeline::update`:
//! - Re-execution only when something upstream changed
//! - Request negotiation across stencils and shared producers
//! - Multi-pass nodes and failing nodes
//! - Piece requests

mod common;

use common::builders::*;
use common::mock_nodes::{BlendNode, PassNode, SplitNode};
use common::{assert_region_values, scalar_at};
use extent_pipeline::pipeline::nodes::piece_source::{GHOST_ARRAY, POINT_ID_ARRAY};
use extent_pipeline::pipeline::nodes::ImageSourceNode;
use extent_pipeline::pipeline::{ParamValue, Pipeline, PipelineError};
use extent_pipeline::types::{Extent, PieceRequest, UpdateRequest};
use std::sync::Arc;

const WHOLE: Extent = Extent::new(0, 15, 0, 15, 0, 0);

#[test]
fn test_second_identical_update_executes_nothing() {
    let (mut pipeline, source, filter) = source_and_filter(WHOLE, 1.0, 2.0);
    let request = Extent::new(2, 9, 3, 7, 0, 0);

    let first = pipeline.update(filter, 0, request).unwrap();
    assert_eq!(first.nodes_executed, 2);

    let second = pipeline.update(filter, 0, request).unwrap();
    assert_eq!(second.nodes_executed, 0);
    assert_eq!(second.nodes_reused, 1);
    assert_eq!(pipeline.execution_count(source), 1);
    assert_eq!(pipeline.execution_count(filter), 1);

    let data = pipeline.output_data(filter, 0).unwrap();
    assert_eq!(data.extent(), request);
    assert_region_values(&data, request, |v| (v + 1.0) * 2.0);
}

#[test]
fn test_contained_request_reuses_output() {
    let (mut pipeline, _source, filter) = source_and_filter(WHOLE, 0.0, 1.0);
    pipeline.update(filter, 0, UpdateRequest::WholeExtent).unwrap();

    let stats = pipeline.update(filter, 0, Extent::new(4, 5, 4, 5, 0, 0)).unwrap();
    assert_eq!(stats.nodes_executed, 0);
    assert_eq!(pipeline.output_data(filter, 0).unwrap().extent(), WHOLE);
}

#[test]
fn test_partially_overlapping_request_re_executes() {
    let (mut pipeline, source, filter) = source_and_filter(WHOLE, 0.0, 1.0);
    pipeline.update(filter, 0, Extent::new(0, 7, 0, 7, 0, 0)).unwrap();

    let request = Extent::new(4, 11, 0, 7, 0, 0);
    let stats = pipeline.update(filter, 0, request).unwrap();
    assert_eq!(stats.nodes_executed, 2);
    assert_eq!(pipeline.execution_count(source), 2);
    assert_eq!(pipeline.output_data(filter, 0).unwrap().extent(), request);
}

#[test]
fn test_parameter_change_re_executes_downstream_only() {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", WHOLE);
    let first = shift_scale(&mut pipeline, "first", 1.0, 2.0);
    let second = shift_scale(&mut pipeline, "second", 0.0, 1.0);
    pipeline.add_edge(source, first).unwrap();
    pipeline.add_edge(first, second).unwrap();

    assert_eq!(
        pipeline.update(second, 0, UpdateRequest::WholeExtent).unwrap().nodes_executed,
        3
    );

    pipeline
        .set_parameter(first, "shift", &ParamValue::from(3.0))
        .unwrap();
    let stats = pipeline.update(second, 0, UpdateRequest::WholeExtent).unwrap();
    assert_eq!(stats.nodes_executed, 2);
    assert_eq!(pipeline.execution_count(source), 1);
    assert_eq!(pipeline.execution_count(first), 2);
    assert_eq!(pipeline.execution_count(second), 2);

    let data = pipeline.output_data(second, 0).unwrap();
    assert_region_values(&data, WHOLE, |v| (v + 3.0) * 2.0);
}

#[test]
fn test_modified_source_re_executes_everything() {
    let (mut pipeline, source, filter) = source_and_filter(WHOLE, 0.0, 1.0);
    pipeline.update(filter, 0, UpdateRequest::WholeExtent).unwrap();

    pipeline.mark_modified(source).unwrap();
    let stats = pipeline.update(filter, 0, UpdateRequest::WholeExtent).unwrap();
    assert_eq!(stats.nodes_executed, 2);
}

#[test]
fn test_downstream_modification_leaves_upstream_alone() {
    let (mut pipeline, source, filter) = source_and_filter(WHOLE, 0.0, 1.0);
    pipeline.update(filter, 0, UpdateRequest::WholeExtent).unwrap();

    pipeline.mark_modified(filter).unwrap();
    let stats = pipeline.update(filter, 0, UpdateRequest::WholeExtent).unwrap();
    assert_eq!(stats.nodes_executed, 1);
    assert_eq!(pipeline.execution_count(source), 1);
}

#[test]
fn test_only_upstream_closure_takes_part() {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", WHOLE);
    let used = shift_scale(&mut pipeline, "used", 0.0, 1.0);
    let unused = shift_scale(&mut pipeline, "unused", 0.0, 1.0);
    pipeline.add_edge(source, used).unwrap();
    pipeline.add_edge(source, unused).unwrap();

    pipeline.update(used, 0, UpdateRequest::WholeExtent).unwrap();
    assert_eq!(pipeline.execution_count(unused), 0);
    assert!(pipeline.output_data(unused, 0).is_none());
}

#[test]
fn test_stencil_grows_upstream_request() {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", WHOLE);
    let smooth = box_smooth(&mut pipeline, "smooth", 2);
    pipeline.add_edge(source, smooth).unwrap();

    let request = Extent::new(0, 3, 5, 8, 0, 0);
    pipeline.update(smooth, 0, request).unwrap();

    // Grown by the radius, clipped to the whole extent
    let upstream = pipeline.output_data(source, 0).unwrap();
    assert_eq!(upstream.extent(), Extent::new(0, 5, 3, 10, 0, 0));
    assert_eq!(pipeline.output_data(smooth, 0).unwrap().extent(), request);
}

#[test]
fn test_shared_producer_gets_union_of_requests() {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", WHOLE);
    let smooth = box_smooth(&mut pipeline, "smooth", 1);
    let shift = shift_scale(&mut pipeline, "shift", 0.0, 1.0);
    let blend = pipeline.add_node(BlendNode::new("blend"));
    pipeline.add_edge(source, smooth).unwrap();
    pipeline.add_edge(source, shift).unwrap();
    pipeline.connect(smooth, 0, blend, 0).unwrap();
    pipeline.connect(shift, 0, blend, 1).unwrap();

    let request = Extent::new(4, 7, 4, 7, 0, 0);
    let stats = pipeline.update(blend, 0, request).unwrap();
    assert_eq!(stats.nodes_executed, 4);
    assert_eq!(pipeline.execution_count(source), 1);
    assert_eq!(
        pipeline.output_data(source, 0).unwrap().extent(),
        Extent::new(3, 8, 3, 8, 0, 0)
    );
    assert_eq!(pipeline.output_data(shift, 0).unwrap().extent(), request);
}

#[test]
fn test_requests_on_every_output_port_reach_upstream() {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", WHOLE);
    let split = pipeline.add_node(SplitNode::new("split"));
    let smooth = box_smooth(&mut pipeline, "smooth", 2);
    let shift = shift_scale(&mut pipeline, "shift", 0.0, 1.0);
    let blend = pipeline.add_node(BlendNode::new("blend"));
    pipeline.add_edge(source, split).unwrap();
    pipeline.connect(split, 0, smooth, 0).unwrap();
    pipeline.connect(split, 1, shift, 0).unwrap();
    pipeline.connect(smooth, 0, blend, 0).unwrap();
    pipeline.connect(shift, 0, blend, 1).unwrap();

    let request = Extent::new(6, 9, 6, 9, 0, 0);
    let stats = pipeline.update(blend, 0, request).unwrap();
    assert_eq!(stats.nodes_executed, 5);
    assert_eq!(pipeline.execution_count(split), 1);

    // Port 0 needs the stencil margin, port 1 only the request
    let grown = Extent::new(4, 11, 4, 11, 0, 0);
    assert_eq!(
        pipeline.output_information(split, 0).unwrap().update_extent(),
        Some(grown)
    );
    assert_eq!(
        pipeline.output_information(split, 1).unwrap().update_extent(),
        Some(request)
    );
    assert_eq!(pipeline.output_data(source, 0).unwrap().extent(), grown);
    assert_eq!(pipeline.output_data(smooth, 0).unwrap().extent(), request);
}

#[test]
fn test_extract_region_clips_whole_extent() {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", WHOLE);
    let voi = Extent::new(10, 20, 2, 5, 0, 0);
    let extract = extract_region(&mut pipeline, "extract", voi);
    pipeline.add_edge(source, extract).unwrap();

    pipeline.update(extract, 0, UpdateRequest::WholeExtent).unwrap();
    let expected = Extent::new(10, 15, 2, 5, 0, 0);
    let data = pipeline.output_data(extract, 0).unwrap();
    assert_eq!(data.extent(), expected);
    assert_eq!(
        pipeline.output_information(extract, 0).unwrap().whole_extent(),
        Some(expected)
    );
    assert_eq!(
        data.point_data().get("scalars").unwrap().tuple(0)[0],
        ImageSourceNode::sample(10, 2, 0)
    );

    let err = pipeline.update(extract, 0, voi).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidUpdateExtent { .. }));
}

#[test]
fn test_continue_executing_reruns_node() {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", WHOLE);
    let (pass, tally) = PassNode::image("multi");
    let multi = pipeline.add_node(pass.with_passes(3).into_node());
    pipeline.add_edge(source, multi).unwrap();

    let stats = pipeline.update(multi, 0, UpdateRequest::WholeExtent).unwrap();
    assert_eq!(tally.runs(), 3);
    assert_eq!(stats.nodes_executed, 4);
    assert_eq!(pipeline.execution_count(multi), 3);
    assert_eq!(pipeline.execution_count(source), 1);
    assert!(!pipeline
        .output_information(multi, 0)
        .unwrap()
        .continue_executing());

    let again = pipeline.update(multi, 0, UpdateRequest::WholeExtent).unwrap();
    assert_eq!(again.nodes_executed, 0);
    assert_eq!(tally.runs(), 3);
}

#[test]
fn test_failed_execution_keeps_previous_output() {
    let mut pipeline = Pipeline::default();
    let source = image_source(&mut pipeline, "source", WHOLE);
    let (pass, tally) = PassNode::image("flaky");
    let flaky = pipeline.add_node(pass.into_node());
    pipeline.add_edge(source, flaky).unwrap();

    pipeline.update(flaky, 0, UpdateRequest::WholeExtent).unwrap();
    let good = pipeline.output_data(flaky, 0).unwrap();

    tally.set_failing(true);
    pipeline.mark_modified(flaky).unwrap();
    let err = pipeline.update(flaky, 0, UpdateRequest::WholeExtent).unwrap_err();
    assert!(matches!(err, PipelineError::Node { .. }));
    assert_eq!(pipeline.execution_count(flaky), 1);
    assert!(Arc::ptr_eq(&pipeline.output_data(flaky, 0).unwrap(), &good));

    tally.set_failing(false);
    let stats = pipeline.update(flaky, 0, UpdateRequest::WholeExtent).unwrap();
    assert_eq!(stats.nodes_executed, 1);
    assert_eq!(tally.runs(), 3);
    assert_eq!(pipeline.execution_count(flaky), 2);
}

#[test]
fn test_missing_input_is_reported() {
    let mut pipeline = Pipeline::default();
    let filter = shift_scale(&mut pipeline, "filter", 0.0, 1.0);
    let err = pipeline.update(filter, 0, UpdateRequest::WholeExtent).unwrap_err();
    assert!(matches!(err, PipelineError::PortArity { .. }), "unexpected error {err:?}");
    assert_eq!(pipeline.execution_count(filter), 0);
}

#[test]
fn test_piece_requests() {
    let mut pipeline = Pipeline::default();
    let source = piece_source(&mut pipeline, "pieces", 1000);
    let (pass, tally) = PassNode::pieces("forward");
    let forward = pipeline.add_node(pass.into_node());
    pipeline.add_edge(source, forward).unwrap();

    let piece = PieceRequest::new(1, 4, 0);
    pipeline.update(forward, 0, piece).unwrap();
    let data = pipeline.output_data(forward, 0).unwrap();
    assert_eq!(data.piece(), Some(piece));
    let ids = data.point_data().get(POINT_ID_ARRAY).unwrap();
    assert_eq!(ids.num_tuples(), 250);
    assert_eq!(ids.values()[0], 250.0);

    // Same piece again is satisfied, a ghost level is not
    assert_eq!(pipeline.update(forward, 0, piece).unwrap().nodes_executed, 0);
    let ghosted = PieceRequest::new(1, 4, 1);
    assert_eq!(pipeline.update(forward, 0, ghosted).unwrap().nodes_executed, 2);
    let data = pipeline.output_data(forward, 0).unwrap();
    assert_eq!(data.piece(), Some(ghosted));
    let ghosts = data.point_data().get(GHOST_ARRAY).unwrap();
    assert_eq!(ghosts.num_tuples(), 252);
    assert_eq!(ghosts.values()[0], 1.0);
    assert_eq!(ghosts.values()[1], 0.0);
    assert_eq!(tally.runs(), 2);
}

#[test]
fn test_whole_extent_on_pieces_means_whole_data_set() {
    let mut pipeline = Pipeline::default();
    let source = piece_source(&mut pipeline, "pieces", 40);
    pipeline.update(source, 0, UpdateRequest::WholeExtent).unwrap();
    let data = pipeline.output_data(source, 0).unwrap();
    assert_eq!(data.piece(), Some(PieceRequest::default()));
    assert_eq!(data.point_data().get(POINT_ID_ARRAY).unwrap().num_tuples(), 40);
}

#[test]
fn test_invalid_piece_fails_at_the_source() {
    let mut pipeline = Pipeline::default();
    let source = piece_source(&mut pipeline, "pieces", 40);
    let err = pipeline
        .update(source, 0, PieceRequest::new(4, 4, 0))
        .unwrap_err();
    assert!(matches!(err, PipelineError::Node { .. }));
    assert!(!pipeline.output_data(source, 0).unwrap().is_generated());
}

#[test]
fn test_values_after_sub_region_update() {
    let (mut pipeline, _source, filter) = source_and_filter(WHOLE, -1.0, 0.5);
    let request = Extent::new(3, 3, 2, 4, 0, 0);
    pipeline.update(filter, 0, request).unwrap();
    let data = pipeline.output_data(filter, 0).unwrap();
    assert_eq!(scalar_at(&data, 3, 4, 0), (43.0 - 1.0) * 0.5);
}
