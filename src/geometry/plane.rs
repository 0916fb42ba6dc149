// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Partitioning planes: point/polygon classification and polygon splitting

use super::Polygon;
use crate::utils::math;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::BitOr;

/// Distance tolerance used when ordering planes into buckets.
pub const PLANE_COMPARE_EPSILON: f64 = 0.001;

/// Position of a vertex or polygon relative to a plane.
///
/// The discriminants combine with `|`: a polygon with vertices on both sides
/// classifies as `Front | Back == Spanning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Coplanar = 0,
    Front = 1,
    Back = 2,
    Spanning = 3,
}

impl Side {
    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Side::Coplanar,
            1 => Side::Front,
            2 => Side::Back,
            _ => Side::Spanning,
        }
    }
}

impl BitOr for Side {
    type Output = Side;

    fn bitor(self, rhs: Side) -> Side {
        Side::from_bits(self as u8 | rhs as u8)
    }
}

/// Per-vertex sides of one polygon plus the side of the polygon as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub vertices: Vec<Side>,
    pub polygon: Side,
}

/// Plane `normal · x = dist` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub dist: f64,
}

impl Plane {
    pub fn new(normal: Vector3<f64>, dist: f64) -> Self {
        Self { normal, dist }
    }

    /// Plane through three points, oriented by their winding.
    ///
    /// Collinear points produce a non-finite normal; callers must not pass
    /// degenerate triangles.
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Self {
        let normal = math::triangle_normal(a, b, c).normalize();
        Self {
            normal,
            dist: normal.dot(&a.coords),
        }
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.dist = -self.dist;
    }

    pub fn flipped(&self) -> Self {
        Self::new(-self.normal, -self.dist)
    }

    /// Signed distance of `point` from the plane.
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.dist
    }

    pub fn classify_point(&self, point: &Point3<f64>, epsilon: f64) -> Side {
        let t = self.signed_distance(point);
        if t < -epsilon {
            Side::Back
        } else if t > epsilon {
            Side::Front
        } else {
            Side::Coplanar
        }
    }

    /// Classify every vertex of `polygon` and the polygon as a whole.
    ///
    /// A polygon with more than two vertices within `epsilon` of the plane and
    /// at least one vertex off it is treated as lying in the plane: every vertex
    /// is reported as `Coplanar`. This keeps near-planar polygons whose outer
    /// vertices drifted past the tolerance from being cut into slivers.
    pub fn classify(&self, polygon: &Polygon, epsilon: f64) -> Classification {
        let mut vertices = Vec::with_capacity(polygon.vertices.len());
        let mut polygon_side = Side::Coplanar;
        let mut coplanar_hits = 0usize;
        let mut off_plane = false;

        for vertex in &polygon.vertices {
            let side = self.classify_point(vertex, epsilon);
            if side == Side::Coplanar {
                coplanar_hits += 1;
                if coplanar_hits > 2 && off_plane {
                    // Outcome is already fixed, the rest of the scan cannot change it.
                    break;
                }
            } else {
                off_plane = true;
            }
            polygon_side = polygon_side | side;
            vertices.push(side);
        }

        if coplanar_hits > 2 && off_plane {
            return Classification {
                vertices: vec![Side::Coplanar; polygon.vertices.len()],
                polygon: Side::Coplanar,
            };
        }

        Classification {
            vertices,
            polygon: polygon_side,
        }
    }

    /// Route `polygon` for tree construction.
    ///
    /// Coplanar polygons accumulate in `coplanar`, everything else goes to
    /// `front`/`back`, spanning polygons are cut in two.
    pub fn split_for_build(
        &self,
        polygon: Polygon,
        classification: &Classification,
        coplanar: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        match classification.polygon {
            Side::Coplanar => coplanar.push(polygon),
            Side::Front => front.push(polygon),
            Side::Back => back.push(polygon),
            Side::Spanning => self.split_spanning(&polygon, &classification.vertices, front, back),
        }
    }

    /// Route `polygon` for clipping against another tree.
    ///
    /// Coplanar polygons never stay here: same-facing ones go to `front`,
    /// opposite-facing ones to `back`.
    pub fn split_for_clip(
        &self,
        polygon: Polygon,
        classification: &Classification,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        match classification.polygon {
            Side::Coplanar => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    front.push(polygon);
                } else {
                    back.push(polygon);
                }
            }
            Side::Front => front.push(polygon),
            Side::Back => back.push(polygon),
            Side::Spanning => self.split_spanning(&polygon, &classification.vertices, front, back),
        }
    }

    fn split_spanning(
        &self,
        polygon: &Polygon,
        sides: &[Side],
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        let size = polygon.vertices.len();
        let mut f = Vec::with_capacity(size + 1);
        let mut b = Vec::with_capacity(size + 1);

        for i in 0..size {
            let j = (i + 1) % size;
            let ti = sides[i];
            let tj = sides[j];
            let vi = &polygon.vertices[i];
            let vj = &polygon.vertices[j];

            if ti != Side::Back {
                f.push(*vi);
            }
            if ti != Side::Front {
                b.push(*vi);
            }
            if ti | tj == Side::Spanning {
                let t = (self.dist - self.normal.dot(&vi.coords)) / self.normal.dot(&(vj - vi));
                let v = math::lerp(vi, vj, t);
                f.push(v);
                b.push(v);
            }
        }

        if f.len() >= 3 {
            front.push(polygon.fragment(f));
        }
        if b.len() >= 3 {
            back.push(polygon.fragment(b));
        }
    }

    /// Ordering used for per-plane buckets.
    ///
    /// Normals compare component-wise; planes with equal normals and distances
    /// closer than [`PLANE_COMPARE_EPSILON`] compare equal. `-0.0` and `0.0`
    /// are the same component.
    pub fn compare(&self, other: &Plane) -> Ordering {
        let component = |a: f64, b: f64| (a + 0.0).total_cmp(&(b + 0.0));
        let normal_order = component(self.normal.x, other.normal.x)
            .then(component(self.normal.y, other.normal.y))
            .then(component(self.normal.z, other.normal.z));
        if normal_order != Ordering::Equal {
            return normal_order;
        }
        if (self.dist - other.dist).abs() < PLANE_COMPARE_EPSILON {
            Ordering::Equal
        } else {
            self.dist.total_cmp(&other.dist)
        }
    }
}

/// [`Plane`] wrapper ordered by [`Plane::compare`], for use as a map key.
#[derive(Debug, Clone, Copy)]
pub struct PlaneKey(pub Plane);

impl PartialEq for PlaneKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.compare(&other.0) == Ordering::Equal
    }
}

impl Eq for PlaneKey {}

impl PartialOrd for PlaneKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlaneKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.compare(&other.0)
    }
}
