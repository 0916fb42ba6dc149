// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Vertex welding

use super::snapshot::WorkingMesh;
use ahash::AHashMap;

/// Merge vertices closer than `tolerance` and kill faces that lose a corner.
///
/// Returns the number of merged vertices and the number of removed faces.
/// Positions are matched through a uniform grid with `tolerance`-sized cells;
/// the first vertex seen in a neighbourhood represents it.
pub(crate) fn weld(mesh: &mut WorkingMesh, tolerance: f64) -> (usize, usize) {
    if tolerance <= 0.0 || mesh.positions.is_empty() {
        return (0, 0);
    }

    let cell = |value: f64| (value / tolerance).floor() as i64;
    let mut grid: AHashMap<(i64, i64, i64), Vec<usize>> = AHashMap::new();
    let mut remap: Vec<usize> = (0..mesh.positions.len()).collect();
    let mut merged = 0;

    for (i, position) in mesh.positions.iter().enumerate() {
        let key = (cell(position.x), cell(position.y), cell(position.z));

        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbour = (key.0 + dx, key.1 + dy, key.2 + dz);
                    if let Some(candidates) = grid.get(&neighbour) {
                        if let Some(&j) = candidates
                            .iter()
                            .find(|&&j| (mesh.positions[j] - position).norm() < tolerance)
                        {
                            found = Some(j);
                            break 'search;
                        }
                    }
                }
            }
        }

        match found {
            Some(j) => {
                remap[i] = j;
                merged += 1;
            }
            None => grid.entry(key).or_default().push(i),
        }
    }

    let mut removed = 0;
    for face in mesh.faces.iter_mut().filter(|face| face.alive) {
        face.v = face.v.map(|v| remap[v]);
        if face.v[0] == face.v[1] || face.v[1] == face.v[2] || face.v[0] == face.v[2] {
            face.alive = false;
            removed += 1;
        }
    }

    (merged, removed)
}
