// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operations on polygon soups
//!
//! A [`Csg`] is an immutable list of outward-facing convex polygons. Every
//! operation returns a new value. Internally each operation builds one BSP
//! tree per operand and composes invert and clip steps on them.
//!
//! Polygons of the left operand whose bounding boxes do not touch the right
//! operand's box cannot be affected by it. `difference` and `union` set those
//! aside before building any tree and append them to the result unchanged.

use super::output::CompiledCsg;
use super::parallel;
use super::{BoundingBox, Colour, Node, Polygon, PolygonTag};
use crate::config::CsgConfig;
use crate::error::CsgResult;
use crate::optimizer::ResultSnapshot;
use crate::utils::math;
use nalgebra::{Matrix4, Point3};
use std::f64::consts::PI;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Immutable solid described by its boundary polygons.
#[derive(Debug, Clone, Default)]
pub struct Csg {
    polygons: Vec<Polygon>,
    bounds: OnceLock<BoundingBox>,
    config: CsgConfig,
}

impl Csg {
    /// Wrap a list of polygons using the default configuration.
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons,
            bounds: OnceLock::new(),
            config: CsgConfig::default(),
        }
    }

    /// The solid with no polygons.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Use `config` for operations where this solid is the left operand.
    #[must_use]
    pub fn with_config(mut self, config: CsgConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CsgConfig {
        &self.config
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Axis-aligned bounds of all vertices, computed once.
    ///
    /// The empty solid has the empty box, which intersects nothing.
    pub fn bounds(&self) -> BoundingBox {
        *self.bounds.get_or_init(|| {
            BoundingBox::from_points(self.polygons.iter().flat_map(|p| p.vertices.iter()))
        })
    }

    fn derive(&self, polygons: Vec<Polygon>) -> Self {
        Self {
            polygons,
            bounds: OnceLock::new(),
            config: self.config.clone(),
        }
    }

    /// Everything inside either solid.
    pub fn union(&self, other: &Csg) -> CsgResult<Csg> {
        parallel::guarded("union", || {
            let config = &self.config;
            let (left, right) = parallel::join(
                config,
                || difference_polygons(self, other, false, config),
                || difference_polygons(other, self, false, config),
            );
            let mut polygons = left?;
            polygons.extend(right?);

            debug!(
                a = self.polygons.len(),
                b = other.polygons.len(),
                result = polygons.len(),
                "union"
            );
            Ok(self.derive(polygons))
        })
    }

    /// Everything inside this solid but outside `other`.
    pub fn difference(&self, other: &Csg) -> CsgResult<Csg> {
        self.difference_with(other, true)
    }

    /// Difference with control over the cut surface.
    ///
    /// With `include_other` false the result omits the parts of `other`'s
    /// surface that would close the cut, leaving only this solid's clipped
    /// boundary. `union` is built from two such open differences.
    pub fn difference_with(&self, other: &Csg, include_other: bool) -> CsgResult<Csg> {
        parallel::guarded("difference", || {
            let polygons = difference_polygons(self, other, include_other, &self.config)?;
            Ok(self.derive(polygons))
        })
    }

    /// Everything inside both solids.
    pub fn intersect(&self, other: &Csg) -> CsgResult<Csg> {
        if self.is_empty() || other.is_empty() {
            return Ok(self.derive(Vec::new()));
        }

        parallel::guarded("intersect", || {
            let config = &self.config;
            let (a, b) = parallel::join(
                config,
                || Node::build(self.polygons.clone(), config),
                || Node::build(other.polygons.clone(), config),
            );
            let (mut a, mut b) = (a?, b?);

            a.invert();
            b.clip_to(&a, config);
            b.invert();
            a.clip_to(&b, config);
            b.clip_to(&a, config);
            a.build_for_result(b.into_polygons(), config);
            a.invert();

            let polygons = a.into_polygons();
            debug!(
                a = self.polygons.len(),
                b = other.polygons.len(),
                result = polygons.len(),
                "intersect"
            );
            Ok(self.derive(polygons))
        })
    }

    /// Apply an affine transform to every polygon.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Csg {
        self.derive(self.polygons.iter().map(|p| p.transformed(matrix)).collect())
    }

    /// Transform and give every polygon the same new tag.
    pub fn transformed_tagged(&self, matrix: &Matrix4<f64>, colour: Colour, id: i32) -> Csg {
        let polygons = self
            .polygons
            .iter()
            .map(|polygon| {
                let tag = PolygonTag::new(polygon.tag.source, colour, id);
                polygon.transformed(matrix).with_tag(Arc::new(tag))
            })
            .collect();
        self.derive(polygons)
    }

    /// Generalized winding number of `point` with respect to the surface.
    ///
    /// Close to 1 inside a closed outward-facing surface and 0 outside.
    /// Cracks and T-junctions only perturb it slightly.
    pub fn winding_number(&self, point: &Point3<f64>) -> f64 {
        let total: f64 = self
            .polygons
            .iter()
            .flat_map(|polygon| polygon.triangles())
            .map(|[a, b, c]| math::solid_angle(point, &a, &b, &c))
            .sum();
        total / (4.0 * PI)
    }

    pub fn contains(&self, point: &Point3<f64>) -> bool {
        self.winding_number(point) > 0.5
    }

    /// Triangulate for the caller's document.
    ///
    /// `parent` identifies the owning entity and is handed back to every
    /// record builder. The returned value also owns the background optimizer
    /// when it is enabled in the config.
    pub fn compile(&self, parent: u64) -> CsgResult<CompiledCsg> {
        let snapshot = ResultSnapshot::from_polygons(&self.polygons);
        debug!(
            parent,
            polygons = self.polygons.len(),
            triangles = snapshot.len(),
            "compiled solid"
        );
        CompiledCsg::new(parent, snapshot, &self.config.optimizer)
    }
}

/// Polygons of `a` with everything inside `b` removed.
///
/// When `include_b` is set, the parts of `b`'s surface inside `a` are added,
/// flipped, to close the cut.
fn difference_polygons(
    a: &Csg,
    b: &Csg,
    include_b: bool,
    config: &CsgConfig,
) -> CsgResult<Vec<Polygon>> {
    let b_bounds = b.bounds();
    if !a.bounds().intersects(&b_bounds) {
        debug!(polygons = a.polygons.len(), "difference of disjoint solids");
        return Ok(a.polygons.clone());
    }

    let (candidates, untouched): (Vec<Polygon>, Vec<Polygon>) = a
        .polygons
        .iter()
        .cloned()
        .partition(|polygon| b_bounds.intersects(&polygon.bounds()));

    debug!(
        candidates = candidates.len(),
        untouched = untouched.len(),
        others = b.polygons.len(),
        include_b,
        "difference"
    );

    if candidates.is_empty() && !include_b {
        return Ok(untouched);
    }

    let (tree_a, tree_b) = parallel::join(
        config,
        || Node::build(candidates, config),
        || Node::build(b.polygons.clone(), config),
    );
    let (mut tree_a, mut tree_b) = (tree_a?, tree_b?);

    tree_a.invert();
    tree_a.clip_to(&tree_b, config);
    tree_b.clip_to(&tree_a, config);
    tree_b.invert();
    tree_b.clip_to(&tree_a, config);
    tree_b.invert();

    let grafted = if include_b {
        tree_b.into_polygons()
    } else {
        Vec::new()
    };
    tree_a.build_for_result(grafted, config);
    tree_a.invert();

    let mut result = untouched;
    tree_a.into_polygons_into(&mut result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn cube(min: [f64; 3], max: [f64; 3]) -> Csg {
        Csg::from_polygons(primitives::cube(Point3::from(min), Point3::from(max)))
    }

    #[test]
    fn test_bounds_are_cached_and_empty_for_empty_solid() {
        let solid = cube([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        assert_eq!(solid.bounds().max, Point3::new(1.0, 2.0, 3.0));
        assert!(Csg::empty().bounds().is_empty());
    }

    #[test]
    fn test_winding_number_of_cube() {
        let solid = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        assert_relative_eq!(
            solid.winding_number(&Point3::new(0.3, 0.4, 0.5)),
            1.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            solid.winding_number(&Point3::new(2.0, 0.4, 0.5)),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_difference_with_empty_keeps_everything() {
        let a = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let result = a.difference(&Csg::empty()).unwrap();
        assert_eq!(result.polygons().len(), a.polygons().len());
        for (x, y) in result.polygons().iter().zip(a.polygons()) {
            assert!(x.same_as(y));
        }
    }

    #[test]
    fn test_empty_operands() {
        let a = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let empty = Csg::empty();

        assert_eq!(a.union(&empty).unwrap().polygons().len(), 12);
        assert_eq!(empty.union(&a).unwrap().polygons().len(), 12);
        assert!(a.intersect(&empty).unwrap().is_empty());
        assert!(empty.intersect(&a).unwrap().is_empty());
        assert!(empty.difference(&a).unwrap().is_empty());
    }

    #[test]
    fn test_difference_carves_corner() {
        let a = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = cube([0.5, 0.5, 0.5], [1.5, 1.5, 1.5]);
        let result = a.difference(&b).unwrap();

        assert!(result.contains(&Point3::new(0.25, 0.25, 0.25)));
        assert!(result.contains(&Point3::new(0.75, 0.25, 0.75)));
        assert!(!result.contains(&Point3::new(0.75, 0.75, 0.75)));
        assert!(!result.contains(&Point3::new(1.25, 1.25, 1.25)));
    }

    #[test]
    fn test_open_difference_omits_cut_surface() {
        let a = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = cube([0.5, 0.5, 0.5], [1.5, 1.5, 1.5]);
        let closed = a.difference_with(&b, true).unwrap();
        let open = a.difference_with(&b, false).unwrap();
        assert!(open.polygons().len() < closed.polygons().len());
        // The corner patches of a's faces inside b are gone.
        for polygon in open.polygons() {
            let c = polygon.centroid();
            assert!(!(c.x > 0.5 + 1e-6 && c.y > 0.5 + 1e-6 && c.z > 0.5 + 1e-6));
        }
    }

    #[test]
    fn test_nested_cubes() {
        let small = cube([4.0, 4.0, 4.0], [6.0, 6.0, 6.0]);
        let big = cube([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);

        assert!(small.difference(&big).unwrap().is_empty());

        let union = big.union(&small).unwrap();
        assert_eq!(union.polygons().len(), 12);
        for (x, y) in union.polygons().iter().zip(big.polygons()) {
            assert!(x.same_as(y));
        }
        assert_eq!(small.union(&big).unwrap().polygons().len(), 12);

        let hollow = big.difference(&small).unwrap();
        assert_eq!(hollow.polygons().len(), 24);
        assert!(!hollow.contains(&Point3::new(5.0, 5.0, 5.0)));
        assert!(hollow.contains(&Point3::new(1.0, 1.0, 1.0)));
        assert!(hollow.contains(&Point3::new(5.0, 5.0, 8.0)));
    }

    #[test]
    fn test_intersect_of_overlapping_cubes() {
        let a = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = cube([0.5, 0.5, 0.5], [1.5, 1.5, 1.5]);
        let result = a.intersect(&b).unwrap();

        assert!(result.contains(&Point3::new(0.6, 0.6, 0.6)));
        assert!(!result.contains(&Point3::new(0.1, 0.1, 0.1)));
        assert!(!result.contains(&Point3::new(1.2, 1.2, 1.2)));
        let bounds = result.bounds();
        assert!(bounds.approx_eq(
            &BoundingBox::new(Point3::new(0.5, 0.5, 0.5), Point3::new(1.0, 1.0, 1.0)),
            1e-9
        ));
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let a = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let b = Csg::from_polygons(primitives::sphere(Point3::new(1.0, 0.5, 0.5), 0.6, 12));

        let parallel = a.difference(&b).unwrap();
        let sequential = a
            .clone()
            .with_config(CsgConfig::default().with_parallel(false))
            .difference(&b)
            .unwrap();

        assert_eq!(parallel.polygons().len(), sequential.polygons().len());
        for (x, y) in parallel.polygons().iter().zip(sequential.polygons()) {
            assert!(x.same_as(y));
        }
    }

    #[test]
    fn test_transformed_tagged() {
        let a = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let red = Colour::new(4, 1.0, 0.0, 0.0, 1.0);
        let moved = a.transformed_tagged(
            &Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)),
            red,
            7,
        );
        assert!(moved.polygons().iter().all(|p| p.tag.colour == red && p.tag.id == 7));
        assert_eq!(moved.bounds().min.x, 10.0);
        assert!(moved.contains(&Point3::new(10.5, 0.5, 0.5)));
    }

    #[test]
    fn test_mirrored_solid_stays_outward() {
        let a = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let mirrored = a.transformed(&Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0)));
        assert_relative_eq!(
            mirrored.winding_number(&Point3::new(-0.5, 0.5, 0.5)),
            1.0,
            epsilon = 1e-9
        );
    }
}
