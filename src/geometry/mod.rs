// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - polygons, BSP trees and boolean operations

mod bbox;
mod csg;
mod node;
pub mod output;
pub(crate) mod parallel;
mod plane;
mod polygon;
pub mod primitives;

pub use bbox::BoundingBox;
pub use csg::Csg;
pub use node::Node;
pub use output::{CompiledCsg, RecordBuilder, Renderer};
pub use parallel::ParallelCsgExecutor;
pub use plane::{Classification, Plane, PlaneKey, Side, PLANE_COMPARE_EPSILON};
pub use polygon::{Colour, Polygon, PolygonTag};
pub use primitives::Primitive;
