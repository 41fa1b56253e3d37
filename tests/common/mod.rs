//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_nodes;

use extent_pipeline::pipeline::nodes::ImageSourceNode;
use extent_pipeline::pipeline::DataObject;
use extent_pipeline::types::Extent;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Active scalar value of `data` at point `(i, j, k)`.
pub fn scalar_at(data: &DataObject, i: i64, j: i64, k: i64) -> f64 {
    let offset = data
        .extent()
        .offset_of(i, j, k)
        .unwrap_or_else(|| panic!("({i},{j},{k}) is outside {}", data.extent()));
    data.point_data()
        .scalars()
        .expect("data has active scalars")
        .tuple(offset)[0]
}

/// Check that every point of `region` holds `f(source sample)`.
pub fn assert_region_values(data: &DataObject, region: Extent, f: impl Fn(f64) -> f64) {
    assert!(
        data.extent().contains(&region),
        "{} does not cover {}",
        data.extent(),
        region
    );
    for [i, j, k] in region.indices() {
        assert_float_eq(
            scalar_at(data, i, j, k),
            f(ImageSourceNode::sample(i, j, k)),
            1e-9,
        );
    }
}
