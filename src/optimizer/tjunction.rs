// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! T-junction repair
//!
//! A vertex lying strictly inside an edge of some triangle leaves a crack
//! along that edge. Splitting the triangle at the vertex closes it.

use super::snapshot::{Face, PlaneBuckets, WorkingMesh};
use crate::utils::math;
use tracing::trace;

/// Split the first triangle found with a mesh vertex inside one of its edges.
///
/// Buckets are scanned in plane order. Returns whether a split happened.
pub(crate) fn repair(mesh: &mut WorkingMesh, buckets: &PlaneBuckets, epsilon: f64) -> bool {
    let mut used = vec![false; mesh.positions.len()];
    for face in mesh.live_faces() {
        for &v in &mesh.faces[face].v {
            used[v] = true;
        }
    }
    let mut by_x: Vec<usize> = (0..mesh.positions.len()).filter(|&v| used[v]).collect();
    by_x.sort_by(|&a, &b| mesh.positions[a].x.total_cmp(&mesh.positions[b].x));

    for bucket in &buckets.buckets {
        for &face in bucket {
            if !mesh.faces[face].alive {
                continue;
            }
            for edge in 0..3 {
                if let Some(vertex) = vertex_on_edge(mesh, &by_x, face, edge, epsilon) {
                    split(mesh, face, edge, vertex);
                    trace!(face, vertex, "split T-junction");
                    return true;
                }
            }
        }
    }
    false
}

fn vertex_on_edge(
    mesh: &WorkingMesh,
    by_x: &[usize],
    face: usize,
    edge: usize,
    epsilon: f64,
) -> Option<usize> {
    let v = mesh.faces[face].v;
    let (a, b) = (v[edge], v[(edge + 1) % 3]);
    let pa = mesh.positions[a];
    let pb = mesh.positions[b];
    let length = (pb - pa).norm();
    if length <= epsilon {
        return None;
    }
    let margin = epsilon / length;

    let lo = pa.x.min(pb.x) - epsilon;
    let hi = pa.x.max(pb.x) + epsilon;
    let start = by_x.partition_point(|&i| mesh.positions[i].x < lo);

    by_x[start..]
        .iter()
        .take_while(|&&i| mesh.positions[i].x <= hi)
        .copied()
        .filter(|&i| !v.contains(&i))
        .find(|&i| {
            let (t, distance) = math::project_onto_segment(&mesh.positions[i], &pa, &pb);
            t > margin && t < 1.0 - margin && distance < epsilon
        })
}

/// Replace `(a, b, c)` by `(a, m, c)` and `(m, b, c)` where `m` sits on `a..b`.
fn split(mesh: &mut WorkingMesh, face: usize, edge: usize, vertex: usize) {
    let original = mesh.faces[face].v;
    let a = original[edge];
    let b = original[(edge + 1) % 3];
    let c = original[(edge + 2) % 3];

    let second = Face {
        v: [vertex, b, c],
        ..mesh.faces[face].clone()
    };
    mesh.faces[face].v = [a, vertex, c];
    mesh.faces.push(second);
}
