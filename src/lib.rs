// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! BSP-tree constructive solid geometry
//!
//! Union, difference and intersection of polygonal solids, computed with
//! binary space partitioning trees in the style of csg.js. Trees are built,
//! inverted and clipped iteratively, independent work fans out to rayon, and
//! compiled results are cleaned up by a background mesh optimizer.
//!
//! ```
//! use bsp_csg::{primitives, Csg};
//! use nalgebra::Point3;
//!
//! let a = Csg::from_polygons(primitives::cube(Point3::origin(), Point3::new(1.0, 1.0, 1.0)));
//! let b = Csg::from_polygons(primitives::cube(Point3::new(0.5, 0.5, 0.5), Point3::new(1.5, 1.5, 1.5)));
//!
//! let both = a.intersect(&b).unwrap();
//! assert!(both.contains(&Point3::new(0.75, 0.75, 0.75)));
//! assert!(!both.contains(&Point3::new(0.25, 0.25, 0.25)));
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod optimizer;
pub mod utils;

pub use config::{BuildLimitPolicy, CsgConfig, OptimizerConfig};
pub use error::{CsgError, CsgResult};
pub use geometry::{
    primitives, BoundingBox, CompiledCsg, Colour, Csg, Node, ParallelCsgExecutor, Plane, Polygon,
    PolygonTag, Primitive, RecordBuilder, Renderer, Side,
};
pub use optimizer::{MeshOptimizer, ResultSnapshot, ResultTriangle};
