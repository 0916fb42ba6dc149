// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Background mesh optimizer
//!
//! Compiled results are cleaned up after the fact, one small change per pass:
//! T-junction repair, collapse of interior vertices of flat regions, and
//! diagonal flips towards better shaped triangles. Passes run on a single
//! dedicated worker thread shared by all results. Readers always see either
//! the previous or the next complete snapshot.
//!
//! Every heuristic keeps the covered surface unchanged, so a pass that is
//! never scheduled only costs triangle quality.

mod collapse;
mod flip;
pub(crate) mod snapshot;
mod tjunction;
mod unify;

pub use snapshot::{ResultSnapshot, ResultTriangle, TriangleKey};

use crate::config::OptimizerConfig;
use crate::error::{CsgError, CsgResult};
use crate::geometry::parallel::panic_message;
use flip::FlipCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snapshot::WorkingMesh;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, error, info};

static WORKER: OnceLock<rayon::ThreadPool> = OnceLock::new();

/// The process-wide optimizer thread.
fn worker() -> CsgResult<&'static rayon::ThreadPool> {
    if let Some(pool) = WORKER.get() {
        return Ok(pool);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .thread_name(|_| "csg-optimizer".to_string())
        .build()
        .map_err(|e| CsgError::WorkerPool(e.to_string()))?;
    // Another thread may have won the race; its pool is used and ours dropped.
    let _ = WORKER.set(pool);
    WORKER
        .get()
        .ok_or_else(|| CsgError::WorkerPool("optimizer worker unavailable".into()))
}

/// Which heuristic a pass ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    TJunction,
    Flip,
    Collapse,
    /// Everything was cooling down.
    Idle,
}

/// What one pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub heuristic: Heuristic,
    /// Whether the published snapshot changed.
    pub changed: bool,
}

/// Advisory progress reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Percentage below 99; lower means passes still find work often.
    pub rate: f64,
    pub updated: Instant,
}

struct OptimizerState {
    rng: StdRng,
    tjunction_pause: u32,
    flip_pause: u32,
    successes: f64,
    tries: f64,
    failure_strike: f64,
    flip_cache: FlipCache,
    unified: bool,
    generation: u64,
}

impl OptimizerState {
    fn new(config: &OptimizerConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            tjunction_pause: 0,
            flip_pause: 0,
            successes: 1.0,
            tries: 1.0,
            failure_strike: 0.0,
            flip_cache: FlipCache::default(),
            unified: false,
            generation: 0,
        }
    }

    /// Update the counters; returns a reading when there is one to publish.
    fn record(&mut self, found: bool) -> Option<Progress> {
        if found {
            self.successes += 1.0;
            self.failure_strike = 0.0;
        } else if self.successes > 0.0 {
            self.successes -= 1.0;
            if self.failure_strike < 100.0 {
                self.failure_strike += 1.0;
            }
        }
        self.tries += 1.0;

        let rate = (1.0 - self.successes / self.tries).max(self.failure_strike / 100.0) * 100.0;
        (rate < 99.0 && self.failure_strike < 100.0).then(|| Progress {
            rate,
            updated: Instant::now(),
        })
    }
}

/// Shared between the owner and jobs on the worker thread.
struct Shared {
    published: RwLock<Arc<ResultSnapshot>>,
    state: Mutex<OptimizerState>,
    /// Kept apart from `state` so readers never wait for a running pass.
    progress: Mutex<Option<Progress>>,
    in_flight: AtomicBool,
    config: OptimizerConfig,
}

impl Shared {
    fn current(&self) -> Arc<ResultSnapshot> {
        Arc::clone(&self.published.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run one pass and publish its result. Serialized by the state lock.
    fn run_pass(&self) -> PassOutcome {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.current();
        let (outcome, mesh, progress) = pass(&mut state, &current, &self.config);
        if progress.is_some() {
            *self.progress.lock().unwrap_or_else(PoisonError::into_inner) = progress;
        }

        if outcome.changed {
            state.generation += 1;
            let next = Arc::new(mesh.into_snapshot(state.generation));
            info!(
                generation = state.generation,
                triangles = next.len(),
                heuristic = ?outcome.heuristic,
                "published optimized snapshot"
            );
            *self.published.write().unwrap_or_else(PoisonError::into_inner) = next;
        }
        outcome
    }
}

/// One optimizer pass over `current`.
fn pass(
    state: &mut OptimizerState,
    current: &ResultSnapshot,
    config: &OptimizerConfig,
) -> (PassOutcome, WorkingMesh, Option<Progress>) {
    let mut mesh = WorkingMesh::from_snapshot(current);
    let mut changed = false;

    if !state.unified {
        let (merged, removed) = unify::weld(&mut mesh, config.weld_tolerance);
        state.unified = true;
        changed = merged > 0 || removed > 0;
        debug!(merged, removed, "welded vertices");
    }

    let buckets = mesh.plane_buckets();
    let mut action = state.rng.gen_range(0..3u8);
    let mut heuristic = Heuristic::Idle;
    let mut found = false;

    if action == 0 || action == 2 {
        if state.tjunction_pause > 0 {
            state.tjunction_pause -= 1;
            action = 2;
        } else {
            heuristic = Heuristic::TJunction;
            found = tjunction::repair(&mut mesh, &buckets, config.edge_epsilon);
            if !found {
                state.tjunction_pause = config.cooldown;
            }
        }
    }

    if action == 1 {
        if state.flip_pause > 0 {
            state.flip_pause -= 1;
            action = 2;
        } else {
            heuristic = Heuristic::Flip;
            found = flip::flip(&mut mesh, &buckets, &mut state.rng, &mut state.flip_cache);
            if !found {
                state.flip_pause = config.cooldown;
            }
        }
    }

    if action == 2 && state.tjunction_pause > 0 {
        heuristic = Heuristic::Collapse;
        found = collapse::collapse(&mut mesh, &buckets);
        if !found {
            state.flip_pause = 0;
        }
    }

    debug!(?heuristic, found, "optimizer pass");
    let progress = state.record(found);

    let changed = changed || found;
    if changed {
        flip::prune(&mut state.flip_cache, &mesh);
    }

    (
        PassOutcome { heuristic, changed },
        mesh,
        progress,
    )
}

/// Resets the in-flight flag when a job ends, even by panic.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Background optimizer for one compiled result.
pub struct MeshOptimizer {
    shared: Arc<Shared>,
    pool: &'static rayon::ThreadPool,
}

impl MeshOptimizer {
    pub fn new(snapshot: Arc<ResultSnapshot>, config: &OptimizerConfig) -> CsgResult<Self> {
        Ok(Self {
            shared: Arc::new(Shared {
                published: RwLock::new(snapshot),
                state: Mutex::new(OptimizerState::new(config)),
                progress: Mutex::new(None),
                in_flight: AtomicBool::new(false),
                config: config.clone(),
            }),
            pool: worker()?,
        })
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<ResultSnapshot> {
        self.shared.current()
    }

    /// Run one pass on the calling thread.
    pub fn step(&self) -> PassOutcome {
        self.shared.run_pass()
    }

    /// Schedule one pass on the worker unless one is already pending.
    ///
    /// Returns whether a pass was scheduled. Never blocks.
    pub fn request_pass(&self) -> bool {
        if self
            .shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            let _guard = InFlight(&shared.in_flight);
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| shared.run_pass())) {
                error!(message = %panic_message(payload.as_ref()), "optimizer pass panicked");
            }
        });
        true
    }

    /// Whether a scheduled pass has not finished yet.
    pub fn is_busy(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// The most recent progress reading, once a pass has produced one.
    pub fn progress(&self) -> Option<Progress> {
        *self
            .shared
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MeshOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshOptimizer")
            .field("generation", &self.current().generation)
            .field("busy", &self.is_busy())
            .finish()
    }
}
