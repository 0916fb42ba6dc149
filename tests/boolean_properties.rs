// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Behavioural properties of the boolean operations

use bsp_csg::{primitives, Csg, CsgConfig, Node, Plane, Polygon, Side};
use nalgebra::{Point3, Vector3};
use std::sync::Arc;

fn cube(min: [f64; 3], max: [f64; 3]) -> Csg {
    Csg::from_polygons(primitives::cube(Point3::from(min), Point3::from(max)))
}

fn unit_cube() -> Csg {
    cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
}

fn offset_cube() -> Csg {
    cube([0.5, 0.5, 0.5], [1.5, 1.5, 1.5])
}

fn ball() -> Csg {
    Csg::from_polygons(primitives::sphere(Point3::new(0.9, 0.8, 0.7), 0.55, 12))
}

/// Points on a 0.1 grid offset by 0.05 from every multiple of 0.5.
fn sample_grid() -> Vec<Point3<f64>> {
    let coords: Vec<f64> = (0..21).map(|k| -0.25 + 0.1 * f64::from(k)).collect();
    let mut points = Vec::with_capacity(coords.len().pow(3));
    for &x in &coords {
        for &y in &coords {
            for &z in &coords {
                points.push(Point3::new(x, y, z));
            }
        }
    }
    points
}

fn contains_all(polygons: &[Polygon], reference: &[Polygon]) -> bool {
    polygons
        .iter()
        .all(|p| reference.iter().any(|r| p.same_as(r)))
}

#[test]
fn test_invert_is_an_involution() {
    let config = CsgConfig::default();
    let polygons = ball().into_polygons();
    let mut tree = Node::build(polygons.clone(), &config).unwrap();
    let before = tree.all_polygons();

    tree.invert();
    tree.invert();
    let after = tree.all_polygons();

    assert_eq!(after.len(), before.len());
    assert!(contains_all(&after, &before));
    for (a, b) in after.iter().zip(&before) {
        assert_eq!(a.vertices, b.vertices);
    }
}

#[test]
fn test_union_is_commutative() {
    for (a, b) in [(unit_cube(), offset_cube()), (unit_cube(), ball())] {
        let ab = a.union(&b).unwrap();
        let ba = b.union(&a).unwrap();

        for point in sample_grid() {
            let expected = a.contains(&point) || b.contains(&point);
            assert_eq!(ab.contains(&point), expected, "union(a, b) at {point:?}");
            assert_eq!(ba.contains(&point), expected, "union(b, a) at {point:?}");
        }
    }
}

#[test]
fn test_intersection_lies_in_both_operands() {
    let a = unit_cube();
    let b = ball();
    let result = a.intersect(&b).unwrap();
    assert!(!result.is_empty());

    for polygon in result.polygons() {
        // Step just inside the result surface.
        let probe = polygon.centroid() - polygon.plane.normal * 1e-5;
        assert!(a.contains(&probe), "outside a: {probe:?}");
        assert!(b.contains(&probe), "outside b: {probe:?}");
    }
}

#[test]
fn test_disjoint_difference_returns_operand_unchanged() {
    let a = unit_cube();
    let b = cube([3.0, 3.0, 3.0], [4.0, 4.0, 4.0]);
    let result = a.difference(&b).unwrap();

    assert_eq!(result.polygons().len(), a.polygons().len());
    for (x, y) in result.polygons().iter().zip(a.polygons()) {
        assert!(x.same_as(y));
        assert!(Arc::ptr_eq(&x.tag, &y.tag));
    }
}

#[test]
fn test_cube_against_empty_solid() {
    let a = unit_cube();
    let empty = Csg::from_polygons(Vec::new());

    let union = a.union(&empty).unwrap();
    assert_eq!(union.polygons().len(), 12);
    assert!(contains_all(union.polygons(), a.polygons()));

    let difference = a.difference(&empty).unwrap();
    assert_eq!(difference.polygons().len(), 12);
    for (x, y) in difference.polygons().iter().zip(a.polygons()) {
        assert!(x.same_as(y));
    }

    assert!(a.intersect(&empty).unwrap().polygons().is_empty());
}

#[test]
fn test_overlapping_cubes() {
    let a = unit_cube();
    let b = offset_cube();

    let both = a.intersect(&b).unwrap();
    assert!(both.contains(&Point3::new(0.6, 0.6, 0.6)));
    assert!(!both.contains(&Point3::new(0.1, 0.1, 0.1)));

    let difference = a.difference(&b).unwrap();
    for point in sample_grid() {
        let inside_a = a.contains(&point);
        let in_corner = point.x > 0.5 && point.y > 0.5 && point.z > 0.5;
        assert_eq!(
            difference.contains(&point),
            inside_a && !in_corner,
            "difference at {point:?}"
        );
        assert_eq!(
            both.contains(&point),
            inside_a && b.contains(&point),
            "intersection at {point:?}"
        );
    }
}

#[test]
fn test_results_do_not_depend_on_parallelism() {
    let sequential = CsgConfig::default().with_parallel(false).with_clip_batch(1);
    let a = unit_cube();
    let b = ball();

    let parallel_result = a.difference(&b).unwrap();
    let sequential_result = a.clone().with_config(sequential).difference(&b).unwrap();

    assert_eq!(parallel_result.polygons().len(), sequential_result.polygons().len());
    for (x, y) in parallel_result.polygons().iter().zip(sequential_result.polygons()) {
        assert!(x.same_as(y));
    }
}

#[test]
fn test_near_coplanar_triangle_is_coplanar() {
    let plane = Plane::new(Vector3::z(), 0.0);
    let triangle = Polygon::from_points(vec![
        Point3::new(0.0, 0.0, 0.0005),
        Point3::new(1.0, 0.0, -0.0005),
        Point3::new(0.0, 1.0, 0.0),
    ])
    .unwrap();

    let classification = plane.classify(&triangle, 1e-3);
    assert_eq!(classification.polygon, Side::Coplanar);
}
