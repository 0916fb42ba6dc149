// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Edge collapse of interior vertices in flat regions

use super::snapshot::{PlaneBuckets, WorkingMesh};
use nalgebra::Vector3;
use tracing::trace;

/// Smallest accepted `normal · plane_normal` of a rewritten triangle.
const MIN_ORIENTED_AREA: f64 = 1e-12;

/// Remove one interior vertex of a planar region.
///
/// A vertex qualifies when all of its triangles sit in one plane bucket and
/// close a full fan around it. It is merged into the first ring neighbour for
/// which no remaining triangle degenerates or turns over.
pub(crate) fn collapse(mesh: &mut WorkingMesh, buckets: &PlaneBuckets) -> bool {
    let incident = mesh.vertex_faces();

    for (bucket, faces) in buckets.buckets.iter().enumerate() {
        for &face in faces {
            if !mesh.faces[face].alive {
                continue;
            }
            for vertex in mesh.faces[face].v {
                if let Some(target) = collapse_target(mesh, &incident[vertex], buckets, bucket, vertex) {
                    apply(mesh, &incident[vertex], vertex, target);
                    trace!(vertex, target, "collapsed interior vertex");
                    return true;
                }
            }
        }
    }
    false
}

fn collapse_target(
    mesh: &WorkingMesh,
    fan: &[usize],
    buckets: &PlaneBuckets,
    bucket: usize,
    vertex: usize,
) -> Option<usize> {
    if fan.len() < 3 || fan.iter().any(|&f| buckets.bucket_of[f] != bucket) {
        return None;
    }

    let mut outgoing = Vec::with_capacity(fan.len());
    let mut incoming = Vec::with_capacity(fan.len());
    for &f in fan {
        let v = mesh.faces[f].v;
        let k = v.iter().position(|&x| x == vertex)?;
        outgoing.push(v[(k + 1) % 3]);
        incoming.push(v[(k + 2) % 3]);
    }
    outgoing.sort_unstable();
    incoming.sort_unstable();
    let simple = outgoing.windows(2).all(|w| w[0] != w[1]);
    if !simple || outgoing != incoming {
        return None;
    }

    let normal = mesh.faces[fan[0]].plane.normal;
    outgoing
        .into_iter()
        .find(|&target| keeps_orientation(mesh, fan, vertex, target, &normal))
}

fn keeps_orientation(
    mesh: &WorkingMesh,
    fan: &[usize],
    vertex: usize,
    target: usize,
    normal: &Vector3<f64>,
) -> bool {
    fan.iter()
        .map(|&f| &mesh.faces[f])
        .filter(|face| !face.contains(target))
        .all(|face| {
            let moved = face.v.map(|x| if x == vertex { target } else { x });
            mesh.normal_of(moved).dot(normal) > MIN_ORIENTED_AREA
        })
}

fn apply(mesh: &mut WorkingMesh, fan: &[usize], vertex: usize, target: usize) {
    for &f in fan {
        let face = &mut mesh.faces[f];
        if face.contains(target) {
            face.alive = false;
        } else {
            face.v = face.v.map(|x| if x == vertex { target } else { x });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{primitives, Plane, PolygonTag};
    use crate::optimizer::snapshot::{Face, ResultSnapshot};
    use crate::utils::math;
    use nalgebra::Point3;
    use std::sync::Arc;

    fn face(v: [usize; 3]) -> Face {
        Face {
            v,
            plane: Plane::new(Vector3::z(), 0.0),
            tag: Arc::new(PolygonTag::default()),
            alive: true,
        }
    }

    fn live_area(mesh: &WorkingMesh) -> f64 {
        mesh.live_faces()
            .map(|f| {
                let [a, b, c] = mesh.face_points(f);
                math::triangle_area(&a, &b, &c)
            })
            .sum()
    }

    #[test]
    fn test_collapse_centre_of_square() {
        let mut mesh = WorkingMesh {
            positions: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.5, 0.5, 0.0),
            ],
            faces: vec![
                face([0, 1, 4]),
                face([1, 2, 4]),
                face([2, 3, 4]),
                face([3, 0, 4]),
            ],
        };
        let buckets = mesh.plane_buckets();
        assert!(collapse(&mut mesh, &buckets));

        assert_eq!(mesh.live_faces().count(), 2);
        assert!((live_area(&mesh) - 1.0).abs() < 1e-12);
        assert!(mesh
            .live_faces()
            .all(|f| !mesh.faces[f].contains(4) && mesh.normal_of(mesh.faces[f].v).z > 0.0));

        let buckets = mesh.plane_buckets();
        assert!(!collapse(&mut mesh, &buckets));
    }

    #[test]
    fn test_no_collapse_on_convex_solid() {
        let polygons = primitives::cube(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let mut mesh = WorkingMesh::from_snapshot(&ResultSnapshot::from_polygons(&polygons));
        let buckets = mesh.plane_buckets();
        assert!(!collapse(&mut mesh, &buckets));
    }

    #[test]
    fn test_open_fan_is_kept() {
        let mut mesh = WorkingMesh {
            positions: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.5, 0.5, 0.0),
            ],
            faces: vec![face([0, 1, 4]), face([1, 2, 4]), face([2, 3, 4])],
        };
        let buckets = mesh.plane_buckets();
        assert!(!collapse(&mut mesh, &buckets));
    }
}
