// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Convex polygons with a cached plane and a provenance tag

use super::{BoundingBox, Plane};
use crate::error::{CsgError, CsgResult};
use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// RGBA colour plus the document's colour code.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colour {
    pub code: i32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Colour {
    /// Placeholder colour that inherits from the parent entity.
    pub const INHERIT: Colour = Colour {
        code: 16,
        r: 0.5,
        g: 0.5,
        b: 0.5,
        a: 1.0,
    };

    pub fn new(code: i32, r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { code, r, g, b, a }
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self::INHERIT
    }
}

/// Where a polygon came from. Carried through splits, never interpreted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonTag {
    /// Opaque handle of the source entity in the caller's document.
    pub source: Option<u64>,
    pub colour: Colour,
    pub id: i32,
}

impl PolygonTag {
    pub fn new(source: Option<u64>, colour: Colour, id: i32) -> Self {
        Self { source, colour, id }
    }
}

/// Planar polygon with at least three vertices.
///
/// Fragments produced by splitting share their parent's tag.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: Vec<Point3<f64>>,
    pub plane: Plane,
    pub tag: Arc<PolygonTag>,
}

impl Polygon {
    /// Build a polygon whose plane is taken from its first three vertices.
    pub fn new(vertices: Vec<Point3<f64>>, tag: Arc<PolygonTag>) -> CsgResult<Self> {
        if vertices.len() < 3 {
            return Err(CsgError::DegeneratePolygon {
                vertices: vertices.len(),
            });
        }
        let plane = Plane::from_points(&vertices[0], &vertices[1], &vertices[2]);
        Ok(Self {
            vertices,
            plane,
            tag,
        })
    }

    /// Build an untagged polygon.
    pub fn from_points(vertices: Vec<Point3<f64>>) -> CsgResult<Self> {
        Self::new(vertices, Arc::new(PolygonTag::default()))
    }

    /// A piece of this polygon: same plane, same tag.
    pub(crate) fn fragment(&self, vertices: Vec<Point3<f64>>) -> Self {
        Self {
            vertices,
            plane: self.plane,
            tag: Arc::clone(&self.tag),
        }
    }

    /// Reverse the winding and the plane.
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    pub fn flipped(&self) -> Self {
        let mut polygon = self.clone();
        polygon.flip();
        polygon
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    pub fn centroid(&self) -> Point3<f64> {
        let sum = self
            .vertices
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, v| acc + v.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Apply an affine transform.
    ///
    /// Mirroring transforms reverse the winding so the polygon keeps facing
    /// out of its solid.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Self {
        let mut vertices: Vec<Point3<f64>> = self
            .vertices
            .iter()
            .map(|v| matrix.transform_point(v))
            .collect();
        if matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            vertices.reverse();
        }
        let plane = Plane::from_points(&vertices[0], &vertices[1], &vertices[2]);
        Self {
            vertices,
            plane,
            tag: Arc::clone(&self.tag),
        }
    }

    /// Same geometry under a new tag.
    pub fn with_tag(mut self, tag: Arc<PolygonTag>) -> Self {
        self.tag = tag;
        self
    }

    /// Fan triangulation. Valid for the convex polygons the engine produces.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        let first = self.vertices[0];
        self.vertices
            .windows(2)
            .skip(1)
            .map(move |pair| [first, pair[0], pair[1]])
    }

    /// Value equality of vertices and tag; planes follow from the vertices.
    pub fn same_as(&self, other: &Polygon) -> bool {
        self.vertices == other.vertices && self.tag == other.tag
    }
}
