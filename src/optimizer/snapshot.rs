// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Result triangles and the indexed working mesh the heuristics edit

use crate::geometry::{Plane, PlaneKey, Polygon, PolygonTag};
use crate::utils::math;
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One output triangle with the plane and tag of the polygon it came from.
#[derive(Debug, Clone)]
pub struct ResultTriangle {
    pub vertices: [Point3<f64>; 3],
    pub plane: Plane,
    pub tag: Arc<PolygonTag>,
}

impl ResultTriangle {
    /// Normal from the vertex winding, not from the cached plane.
    pub fn normal(&self) -> Vector3<f64> {
        let [a, b, c] = &self.vertices;
        math::triangle_normal(a, b, c)
    }

    pub fn area(&self) -> f64 {
        let [a, b, c] = &self.vertices;
        math::triangle_area(a, b, c)
    }

    /// Identity by exact vertex positions.
    pub fn key(&self) -> TriangleKey {
        TriangleKey::new(&self.vertices)
    }
}

/// Hashable identity of a triangle: the bit patterns of its vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleKey([u64; 9]);

impl TriangleKey {
    pub fn new(vertices: &[Point3<f64>; 3]) -> Self {
        let mut bits = [0u64; 9];
        for (i, v) in vertices.iter().enumerate() {
            bits[i * 3..i * 3 + 3].copy_from_slice(&point_bits(v));
        }
        Self(bits)
    }
}

/// Immutable triangle list handed to renderers and record builders.
#[derive(Debug, Clone, Default)]
pub struct ResultSnapshot {
    pub triangles: Vec<ResultTriangle>,
    /// Number of optimizer passes that changed the mesh before this snapshot.
    pub generation: u64,
}

impl ResultSnapshot {
    /// Fan-triangulate every polygon.
    pub fn from_polygons(polygons: &[Polygon]) -> Self {
        let triangles = polygons
            .iter()
            .flat_map(|polygon| {
                polygon.triangles().map(move |vertices| ResultTriangle {
                    vertices,
                    plane: polygon.plane,
                    tag: Arc::clone(&polygon.tag),
                })
            })
            .collect();
        Self {
            triangles,
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn area(&self) -> f64 {
        self.triangles.iter().map(ResultTriangle::area).sum()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Face {
    pub v: [usize; 3],
    pub plane: Plane,
    pub tag: Arc<PolygonTag>,
    pub alive: bool,
}

impl Face {
    pub fn contains(&self, vertex: usize) -> bool {
        self.v.contains(&vertex)
    }
}

/// Triangles over a shared position table.
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkingMesh {
    pub positions: Vec<Point3<f64>>,
    pub faces: Vec<Face>,
}

/// Bit patterns with `-0.0` folded into `0.0`.
fn point_bits(p: &Point3<f64>) -> [u64; 3] {
    [p.x, p.y, p.z].map(|c| (c + 0.0).to_bits())
}

impl WorkingMesh {
    /// Index a snapshot, sharing bit-identical positions.
    pub fn from_snapshot(snapshot: &ResultSnapshot) -> Self {
        let mut mesh = Self::default();
        let mut index: AHashMap<[u64; 3], usize> = AHashMap::new();

        for triangle in &snapshot.triangles {
            let mut v = [0usize; 3];
            for (slot, position) in v.iter_mut().zip(&triangle.vertices) {
                *slot = *index.entry(point_bits(position)).or_insert_with(|| {
                    mesh.positions.push(*position);
                    mesh.positions.len() - 1
                });
            }
            mesh.faces.push(Face {
                v,
                plane: triangle.plane,
                tag: Arc::clone(&triangle.tag),
                alive: true,
            });
        }
        mesh
    }

    pub fn into_snapshot(self, generation: u64) -> ResultSnapshot {
        let positions = self.positions;
        let triangles = self
            .faces
            .into_iter()
            .filter(|face| face.alive)
            .map(|face| ResultTriangle {
                vertices: face.v.map(|i| positions[i]),
                plane: face.plane,
                tag: face.tag,
            })
            .collect();
        ResultSnapshot {
            triangles,
            generation,
        }
    }

    pub fn face_points(&self, face: usize) -> [Point3<f64>; 3] {
        self.faces[face].v.map(|i| self.positions[i])
    }

    /// Normal of `v` under the current positions, unnormalized.
    pub fn normal_of(&self, v: [usize; 3]) -> Vector3<f64> {
        math::triangle_normal(&self.positions[v[0]], &self.positions[v[1]], &self.positions[v[2]])
    }

    pub fn live_faces(&self) -> impl Iterator<Item = usize> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, face)| face.alive)
            .map(|(i, _)| i)
    }

    /// Live faces grouped by plane. Planes within the comparison tolerance
    /// share a bucket.
    pub fn plane_buckets(&self) -> PlaneBuckets {
        let mut map: BTreeMap<PlaneKey, Vec<usize>> = BTreeMap::new();
        for face in self.live_faces() {
            map.entry(PlaneKey(self.faces[face].plane))
                .or_default()
                .push(face);
        }

        let mut bucket_of = vec![usize::MAX; self.faces.len()];
        let buckets: Vec<Vec<usize>> = map.into_values().collect();
        for (id, faces) in buckets.iter().enumerate() {
            for &face in faces {
                bucket_of[face] = id;
            }
        }
        PlaneBuckets { buckets, bucket_of }
    }

    /// Live faces around each vertex.
    pub fn vertex_faces(&self) -> Vec<Vec<usize>> {
        let mut incident = vec![Vec::new(); self.positions.len()];
        for face in self.live_faces() {
            for &v in &self.faces[face].v {
                incident[v].push(face);
            }
        }
        incident
    }
}

/// Face lists per plane, in plane order.
#[derive(Debug, Clone)]
pub(crate) struct PlaneBuckets {
    pub buckets: Vec<Vec<usize>>,
    /// Bucket id for each face index; `usize::MAX` for dead faces.
    pub bucket_of: Vec<usize>,
}
