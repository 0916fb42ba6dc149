// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Parallel execution helpers using rayon

use super::{Classification, Csg, Plane, Polygon};
use crate::config::CsgConfig;
use crate::error::{CsgError, CsgResult};
use nalgebra::Matrix4;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Below this many polygons classification stays on the calling thread.
const PARALLEL_CLASSIFY_THRESHOLD: usize = 64;

/// Classify every polygon against `plane`, preserving order.
pub(crate) fn classify_all(
    plane: &Plane,
    polygons: &[Polygon],
    epsilon: f64,
    parallel: bool,
) -> Vec<Classification> {
    if parallel && polygons.len() >= PARALLEL_CLASSIFY_THRESHOLD {
        polygons
            .par_iter()
            .map(|polygon| plane.classify(polygon, epsilon))
            .collect()
    } else {
        polygons
            .iter()
            .map(|polygon| plane.classify(polygon, epsilon))
            .collect()
    }
}

/// Run two closures, concurrently when the config allows it.
pub(crate) fn join<A, B, RA, RB>(config: &CsgConfig, a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    if config.parallel {
        rayon::join(a, b)
    } else {
        (a(), b())
    }
}

/// Run one boolean operation, turning a panic in any of its subtasks into
/// [`CsgError::TaskFailed`].
pub(crate) fn guarded<T>(operation: &'static str, f: impl FnOnce() -> CsgResult<T>) -> CsgResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(operation, %message, "boolean operation task panicked");
            Err(CsgError::TaskFailed { operation, message })
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Boolean operations over many solids
pub struct ParallelCsgExecutor;

impl ParallelCsgExecutor {
    /// Union of all solids, combined pairwise in parallel.
    pub fn union_all(solids: Vec<Csg>) -> CsgResult<Csg> {
        Self::reduce(solids, |a, b| a.union(&b))
    }

    /// Intersection of all solids, combined pairwise in parallel.
    pub fn intersect_all(solids: Vec<Csg>) -> CsgResult<Csg> {
        Self::reduce(solids, |a, b| a.intersect(&b))
    }

    /// First solid minus all others.
    ///
    /// Subtraction is not associative, so this runs in order; each step is
    /// still parallel internally.
    pub fn difference_all(solids: Vec<Csg>) -> CsgResult<Csg> {
        let mut iter = solids.into_iter();
        let Some(mut result) = iter.next() else {
            return Ok(Csg::empty());
        };
        for solid in iter {
            result = result.difference(&solid)?;
        }
        Ok(result)
    }

    /// Transform multiple solids in parallel
    pub fn transform_all(solids: Vec<Csg>, matrix: &Matrix4<f64>) -> Vec<Csg> {
        solids
            .into_par_iter()
            .map(|solid| solid.transformed(matrix))
            .collect()
    }

    fn reduce<F>(solids: Vec<Csg>, op: F) -> CsgResult<Csg>
    where
        F: Fn(Csg, Csg) -> CsgResult<Csg> + Sync + Send,
    {
        solids
            .into_par_iter()
            .map(Ok::<Csg, CsgError>)
            .reduce_with(|a, b| op(a?, b?))
            .unwrap_or_else(|| Ok(Csg::empty()))
    }
}
