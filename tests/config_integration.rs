//! Integration tests for pipeline description files
//!
//! These tests validate the description workflow end to end:
//! - Saving and loading in TOML and JSON
//! - Building a pipeline from a description
//! - Running the described requests

mod common;

use common::assert_region_values;
use extent_pipeline::config::{
    EdgeDescription, ExecutionSettings, NodeDescription, PipelineFile, RequestDescription,
};
use extent_pipeline::pipeline::{NodeType, PipelineError};
use extent_pipeline::types::{Extent, PieceRequest, UpdateRequest};
use extent_pipeline::Error;
use tempfile::TempDir;

fn smoothing_description() -> PipelineFile {
    PipelineFile {
        settings: ExecutionSettings {
            default_cache_size: 3,
            ..Default::default()
        },
        nodes: vec![
            NodeDescription::new("source", NodeType::ImageSource)
                .with_param("whole_extent", Extent::new(0, 23, 0, 23, 0, 0))
                .with_param("scalar_name", "density"),
            NodeDescription::new("shift", NodeType::ShiftScale)
                .with_param("shift", 2.0)
                .with_param("scale", 0.5)
                .with_cache(2),
            NodeDescription::new("smooth", NodeType::BoxSmooth).with_param("radius", 1i64),
        ],
        edges: vec![
            EdgeDescription::new("source", "shift"),
            EdgeDescription::new("shift", "smooth"),
        ],
        requests: vec![
            RequestDescription {
                node: "shift".to_string(),
                port: 0,
                request: UpdateRequest::Extent(Extent::new(0, 7, 0, 7, 0, 0)),
            },
            RequestDescription {
                node: "smooth".to_string(),
                port: 0,
                request: UpdateRequest::WholeExtent,
            },
        ],
    }
}

#[test]
fn test_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pipelines").join("smoothing.toml");
    let file = smoothing_description();

    file.save(&path).unwrap();
    let loaded = PipelineFile::load(&path).unwrap();
    assert_eq!(loaded, file);
}

#[test]
fn test_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("smoothing.json");
    let mut file = smoothing_description();
    file.requests.push(RequestDescription {
        node: "source".to_string(),
        port: 0,
        request: UpdateRequest::Piece(PieceRequest::new(0, 1, 0)),
    });

    file.save(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"box_smooth\""));
    assert_eq!(PipelineFile::load(&path).unwrap(), file);
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[[nodes]]\nname = 3\n").unwrap();
    assert!(matches!(PipelineFile::load(&path), Err(Error::Config(_))));
}

#[test]
fn test_built_pipeline_runs_requests() {
    let file = smoothing_description();
    let (mut pipeline, ids) = file.build().unwrap();
    assert_eq!(pipeline.node_count(), 3);
    assert_eq!(pipeline.edges().len(), 2);
    assert_eq!(pipeline.cache_size(ids["shift"]), Some(2));
    assert_eq!(pipeline.cache_size(ids["smooth"]), None);

    let shift = ids["shift"];
    let first = &file.requests[0];
    let stats = pipeline.update(shift, first.port, first.request).unwrap();
    assert_eq!(stats.nodes_executed, 2);
    let data = pipeline.output_data(shift, 0).unwrap();
    assert_eq!(data.point_data().scalars_name(), Some("density"));
    assert_region_values(&data, Extent::new(0, 7, 0, 7, 0, 0), |v| (v + 2.0) * 0.5);

    let smooth = ids["smooth"];
    let second = &file.requests[1];
    let stats = pipeline.update(smooth, second.port, second.request).unwrap();
    assert_eq!(stats.nodes_executed, 3);
    assert_eq!(
        pipeline.output_data(smooth, 0).unwrap().extent(),
        Extent::new(0, 23, 0, 23, 0, 0)
    );
}

#[test]
fn test_unknown_edge_endpoint_fails_build() {
    let mut file = smoothing_description();
    file.edges.push(EdgeDescription::new("missing", "smooth"));
    let err = file.build().unwrap_err();
    assert!(err.to_string().contains("Building pipeline"));
    match err {
        Error::WithContext { source, .. } => {
            assert!(matches!(*source, Error::Pipeline(PipelineError::InvalidEdge(_))));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_duplicate_node_name_fails_build() {
    let mut file = smoothing_description();
    file.nodes
        .push(NodeDescription::new("shift", NodeType::ShiftScale));
    assert!(file.build().is_err());
}

#[test]
fn test_bad_parameter_fails_build() {
    let mut file = smoothing_description();
    file.nodes[2] = NodeDescription::new("smooth", NodeType::BoxSmooth).with_param("radius", -2i64);
    assert!(file.build().is_err());
}
