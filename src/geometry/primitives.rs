// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator
//!
//! All generators return convex polygons wound counter-clockwise when seen
//! from outside the solid.

use super::{Csg, Polygon, PolygonTag};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;
use std::sync::Arc;

/// Geometric primitives
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cube {
        min: Point3<f64>,
        max: Point3<f64>,
    },
    Sphere {
        center: Point3<f64>,
        radius: f64,
        segments: u32,
    },
    Cylinder {
        center: Point3<f64>,
        radius: f64,
        height: f64,
        segments: u32,
    },
}

impl Primitive {
    pub fn to_polygons(&self) -> Vec<Polygon> {
        match *self {
            Self::Cube { min, max } => cube(min, max),
            Self::Sphere {
                center,
                radius,
                segments,
            } => sphere(center, radius, segments),
            Self::Cylinder {
                center,
                radius,
                height,
                segments,
            } => cylinder(center, radius, height, segments),
        }
    }

    pub fn to_csg(&self) -> Csg {
        Csg::from_polygons(self.to_polygons())
    }
}

fn polygons_from(faces: Vec<Vec<Point3<f64>>>) -> Vec<Polygon> {
    let tag = Arc::new(PolygonTag::default());
    faces
        .into_iter()
        .filter_map(|vertices| Polygon::new(vertices, Arc::clone(&tag)).ok())
        .collect()
}

/// Axis-aligned box as 12 triangles.
pub fn cube(min: Point3<f64>, max: Point3<f64>) -> Vec<Polygon> {
    let positions = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    let faces: [[usize; 3]; 12] = [
        // z+
        [4, 5, 6],
        [4, 6, 7],
        // z-
        [1, 0, 3],
        [1, 3, 2],
        // x+
        [5, 1, 2],
        [5, 2, 6],
        // x-
        [0, 4, 7],
        [0, 7, 3],
        // y+
        [7, 6, 2],
        [7, 2, 3],
        // y-
        [0, 1, 5],
        [0, 5, 4],
    ];

    polygons_from(
        faces
            .iter()
            .map(|face| face.iter().map(|&i| positions[i]).collect())
            .collect(),
    )
}

/// UV sphere with `segments` slices and half as many rings.
///
/// Rings end in triangle fans at the poles; everything else is quads.
pub fn sphere(center: Point3<f64>, radius: f64, segments: u32) -> Vec<Polygon> {
    let slices = segments.max(3);
    let rings = (segments / 2).max(2);

    let vertex = |ring: u32, slice: u32| -> Point3<f64> {
        if ring == 0 {
            return center + Vector3::z() * radius;
        }
        if ring == rings {
            return center - Vector3::z() * radius;
        }
        let phi = PI * f64::from(ring) / f64::from(rings);
        let theta = 2.0 * PI * f64::from(slice % slices) / f64::from(slices);
        center
            + Vector3::new(
                phi.sin() * theta.cos(),
                phi.sin() * theta.sin(),
                phi.cos(),
            ) * radius
    };

    let mut faces = Vec::with_capacity((slices * rings) as usize);
    for ring in 0..rings {
        for slice in 0..slices {
            let a = vertex(ring, slice);
            let b = vertex(ring + 1, slice);
            let c = vertex(ring + 1, slice + 1);
            let d = vertex(ring, slice + 1);
            if ring == 0 {
                faces.push(vec![a, b, c]);
            } else if ring + 1 == rings {
                faces.push(vec![a, c, d]);
            } else {
                faces.push(vec![a, b, c, d]);
            }
        }
    }
    polygons_from(faces)
}

/// Closed cylinder along z, centred on `center`.
pub fn cylinder(center: Point3<f64>, radius: f64, height: f64, segments: u32) -> Vec<Polygon> {
    let slices = segments.max(3);
    let half = height / 2.0;

    let ring: Vec<Vector3<f64>> = (0..slices)
        .map(|i| {
            let angle = 2.0 * PI * f64::from(i) / f64::from(slices);
            Vector3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
        })
        .collect();
    let bottom: Vec<Point3<f64>> = ring.iter().map(|r| center + *r - Vector3::z() * half).collect();
    let top: Vec<Point3<f64>> = ring.iter().map(|r| center + *r + Vector3::z() * half).collect();

    let mut faces = Vec::with_capacity(slices as usize + 2);
    faces.push(bottom.iter().rev().copied().collect());
    faces.push(top.clone());
    for i in 0..slices as usize {
        let next = (i + 1) % slices as usize;
        faces.push(vec![bottom[i], bottom[next], top[next], top[i]]);
    }
    polygons_from(faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_outward(polygons: &[Polygon], inside: Point3<f64>) {
        for polygon in polygons {
            assert!(
                polygon.plane.signed_distance(&inside) < 0.0,
                "polygon faces inward: {:?}",
                polygon.vertices
            );
        }
    }

    #[test]
    fn test_cube_generation() {
        let polygons = cube(Point3::origin(), Point3::new(10.0, 10.0, 10.0));
        assert_eq!(polygons.len(), 12);
        assert_outward(&polygons, Point3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_sphere_generation() {
        let center = Point3::new(1.0, 2.0, 3.0);
        let polygons = sphere(center, 2.0, 16);
        assert_eq!(polygons.len(), 16 * 8);
        assert_outward(&polygons, center);
        for polygon in &polygons {
            for v in &polygon.vertices {
                assert_relative_eq!((v - center).norm(), 2.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cylinder_generation() {
        let polygons = cylinder(Point3::origin(), 1.0, 4.0, 12);
        assert_eq!(polygons.len(), 14);
        assert_outward(&polygons, Point3::origin());
        let csg = Csg::from_polygons(polygons);
        assert_relative_eq!(csg.bounds().min.z, -2.0);
        assert_relative_eq!(csg.bounds().max.z, 2.0);
    }

    #[test]
    fn test_primitive_enum() {
        let cube = Primitive::Cube {
            min: Point3::origin(),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        assert_eq!(cube.to_polygons().len(), 12);
        assert!(cube.to_csg().contains(&Point3::new(0.5, 0.5, 0.5)));
    }
}
