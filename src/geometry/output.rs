// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Handing results to the caller's document and renderer

use crate::config::OptimizerConfig;
use crate::error::CsgResult;
use crate::optimizer::{MeshOptimizer, Progress, ResultSnapshot, ResultTriangle};
use std::sync::Arc;

/// Turns result triangles into records of the caller's document.
pub trait RecordBuilder {
    type Record;

    fn build_record(&mut self, parent: u64, triangle: &ResultTriangle) -> Self::Record;
}

/// Receives result triangles for display.
pub trait Renderer {
    fn draw_triangle(&mut self, triangle: &ResultTriangle);

    /// Textured variant; plain drawing unless the renderer distinguishes.
    fn draw_triangle_textured(&mut self, triangle: &ResultTriangle) {
        self.draw_triangle(triangle);
    }
}

/// Triangulated result of a boolean operation.
///
/// Keeps the raw triangulation and, when enabled, a background optimizer
/// that publishes cleaner versions of it. Drawing always uses the newest
/// published version and asks for another pass without waiting for it.
#[derive(Debug)]
pub struct CompiledCsg {
    parent: u64,
    raw: Arc<ResultSnapshot>,
    optimizer: Option<MeshOptimizer>,
}

impl CompiledCsg {
    pub fn new(parent: u64, snapshot: ResultSnapshot, config: &OptimizerConfig) -> CsgResult<Self> {
        let raw = Arc::new(snapshot);
        let optimizer = if config.enabled {
            Some(MeshOptimizer::new(Arc::clone(&raw), config)?)
        } else {
            None
        };
        Ok(Self {
            parent,
            raw,
            optimizer,
        })
    }

    pub fn parent(&self) -> u64 {
        self.parent
    }

    /// The triangulation as produced by the boolean operation.
    pub fn raw(&self) -> Arc<ResultSnapshot> {
        Arc::clone(&self.raw)
    }

    /// The best available triangulation.
    pub fn current(&self) -> Arc<ResultSnapshot> {
        match &self.optimizer {
            Some(optimizer) => optimizer.current(),
            None => self.raw(),
        }
    }

    pub fn optimizer(&self) -> Option<&MeshOptimizer> {
        self.optimizer.as_ref()
    }

    pub fn progress(&self) -> Option<Progress> {
        self.optimizer.as_ref().and_then(MeshOptimizer::progress)
    }

    /// One record per current triangle.
    pub fn build_records<B: RecordBuilder>(&self, builder: &mut B) -> Vec<B::Record> {
        self.current()
            .triangles
            .iter()
            .map(|triangle| builder.build_record(self.parent, triangle))
            .collect()
    }

    pub fn draw<R: Renderer>(&self, renderer: &mut R) {
        let snapshot = self.current();
        for triangle in &snapshot.triangles {
            renderer.draw_triangle(triangle);
        }
        self.schedule();
    }

    pub fn draw_textured<R: Renderer>(&self, renderer: &mut R) {
        let snapshot = self.current();
        for triangle in &snapshot.triangles {
            renderer.draw_triangle_textured(triangle);
        }
        self.schedule();
    }

    fn schedule(&self) {
        if let Some(optimizer) = &self.optimizer {
            optimizer.request_pass();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{primitives, Csg};
    use crate::CsgConfig;
    use nalgebra::Point3;

    #[derive(Default)]
    struct Counter {
        plain: usize,
        textured: usize,
    }

    impl Renderer for Counter {
        fn draw_triangle(&mut self, _triangle: &ResultTriangle) {
            self.plain += 1;
        }

        fn draw_triangle_textured(&mut self, _triangle: &ResultTriangle) {
            self.textured += 1;
        }
    }

    struct Lines;

    impl RecordBuilder for Lines {
        type Record = String;

        fn build_record(&mut self, parent: u64, triangle: &ResultTriangle) -> String {
            let [a, _, _] = triangle.vertices;
            format!("{parent} {} {} {} {}", triangle.tag.colour.code, a.x, a.y, a.z)
        }
    }

    fn unit_cube() -> Csg {
        Csg::from_polygons(primitives::cube(Point3::origin(), Point3::new(1.0, 1.0, 1.0)))
    }

    #[test]
    fn test_build_records_carry_parent() {
        let compiled = unit_cube().compile(42).unwrap();
        let records = compiled.build_records(&mut Lines);
        assert_eq!(records.len(), 12);
        assert!(records.iter().all(|r| r.starts_with("42 16 ")));
    }

    #[test]
    fn test_draw_without_optimizer() {
        let mut config = CsgConfig::default();
        config.optimizer.enabled = false;
        let compiled = unit_cube().with_config(config).compile(1).unwrap();
        assert!(compiled.optimizer().is_none());

        let mut counter = Counter::default();
        compiled.draw(&mut counter);
        compiled.draw_textured(&mut counter);
        assert_eq!((counter.plain, counter.textured), (12, 12));
        assert!(Arc::ptr_eq(&compiled.current(), &compiled.raw()));
    }

    #[test]
    fn test_draw_schedules_optimizer() {
        let compiled = unit_cube().compile(1).unwrap();
        let mut counter = Counter::default();
        compiled.draw(&mut counter);
        assert_eq!(counter.plain, 12);
        assert!(compiled.optimizer().is_some());
    }
}
