// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Diagonal flips between coplanar triangle pairs

use super::snapshot::{PlaneBuckets, TriangleKey, WorkingMesh};
use crate::utils::math;
use ahash::{AHashMap, AHashSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::trace;

/// Pairs already found not worth flipping.
pub(crate) type FlipCache = AHashSet<(TriangleKey, TriangleKey)>;

const MIN_ORIENTED_AREA: f64 = 1e-12;
const MIN_ANGLE_GAIN: f64 = 1e-9;

/// Flip one shared diagonal that raises the smaller minimum angle of its
/// two triangles.
///
/// Buckets are visited in random order; edges inside a bucket in index
/// order. Rejected pairs are remembered in `cache` by vertex positions.
pub(crate) fn flip(
    mesh: &mut WorkingMesh,
    buckets: &PlaneBuckets,
    rng: &mut StdRng,
    cache: &mut FlipCache,
) -> bool {
    let mut order: Vec<usize> = (0..buckets.buckets.len()).collect();
    order.shuffle(rng);

    for bucket in order {
        let mut edges: AHashMap<(usize, usize), Vec<(usize, usize)>> = AHashMap::new();
        for &face in &buckets.buckets[bucket] {
            if !mesh.faces[face].alive {
                continue;
            }
            let v = mesh.faces[face].v;
            for edge in 0..3 {
                let (a, b) = (v[edge], v[(edge + 1) % 3]);
                edges.entry((a.min(b), a.max(b))).or_default().push((face, edge));
            }
        }

        let mut shared: Vec<((usize, usize), [(usize, usize); 2])> = edges
            .into_iter()
            .filter_map(|(key, sides)| match sides.as_slice() {
                &[first, second] => Some((key, [first, second])),
                _ => None,
            })
            .collect();
        shared.sort_unstable_by_key(|(key, _)| *key);

        for (_, [first, second]) in shared {
            if try_flip(mesh, first, second, cache) {
                trace!(a = first.0, b = second.0, "flipped diagonal");
                return true;
            }
        }
    }
    false
}

/// Forget pairs whose triangles are no longer both in `mesh`.
pub(crate) fn prune(cache: &mut FlipCache, mesh: &WorkingMesh) {
    if cache.is_empty() {
        return;
    }
    let live: AHashSet<TriangleKey> = mesh
        .live_faces()
        .map(|face| TriangleKey::new(&mesh.face_points(face)))
        .collect();
    cache.retain(|(a, b)| live.contains(a) && live.contains(b));
}

fn try_flip(
    mesh: &mut WorkingMesh,
    (f1, e1): (usize, usize),
    (f2, e2): (usize, usize),
    cache: &mut FlipCache,
) -> bool {
    let v1 = mesh.faces[f1].v;
    let v2 = mesh.faces[f2].v;
    let (a, b, c) = (v1[e1], v1[(e1 + 1) % 3], v1[(e1 + 2) % 3]);
    if v2[e2] != b || v2[(e2 + 1) % 3] != a {
        return false;
    }
    let d = v2[(e2 + 2) % 3];
    if c == d {
        return false;
    }

    let k1 = TriangleKey::new(&mesh.face_points(f1));
    let k2 = TriangleKey::new(&mesh.face_points(f2));
    let key = if k1 <= k2 { (k1, k2) } else { (k2, k1) };
    if cache.contains(&key) {
        return false;
    }

    let normal = mesh.faces[f1].plane.normal;
    let n1 = [c, a, d];
    let n2 = [d, b, c];
    let convex = mesh.normal_of(n1).dot(&normal) > MIN_ORIENTED_AREA
        && mesh.normal_of(n2).dot(&normal) > MIN_ORIENTED_AREA;

    if convex && min_angle(mesh, n1).min(min_angle(mesh, n2))
        > min_angle(mesh, v1).min(min_angle(mesh, v2)) + MIN_ANGLE_GAIN
    {
        mesh.faces[f1].v = n1;
        mesh.faces[f2].v = n2;
        return true;
    }

    cache.insert(key);
    false
}

fn min_angle(mesh: &WorkingMesh, v: [usize; 3]) -> f64 {
    let [p0, p1, p2] = v.map(|i| mesh.positions[i]);
    math::min_triangle_angle(&p0, &p1, &p2)
}
