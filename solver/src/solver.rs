//! Parallel orchestration of the search: two deadlines, one candidate
//! list initialization, W racing workers, and the selection of the best
//! solution at the join.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::collections::tensor::Tensor4;
use crate::orderings::Orderings;
use crate::problem::Problem;
use crate::slots::SlotTable;
use crate::timer::StoppableTimer;
use crate::worker::Worker;

pub const DEFAULT_BUDGET: Duration = Duration::from_millis(5000);
pub const DEFAULT_WORKERS: usize = 8;

/// Share of the budget granted to searches that never leave the
/// standard constructor.
const PERC_NORMAL: f64 = 0.50;
/// Share granted once a worker has fallen back to scarce-user mode.
const PERC_SCARCE: f64 = 0.95;

#[derive(Clone, Debug)]
pub struct SolveParams {
    /// Total wall-clock budget.
    pub budget: Duration,
    /// Number of worker threads.
    pub workers: usize,
    /// Seed of the master random generator. Runs with the same seed,
    /// instance and budget explore the same restart orders.
    pub seed: u64,
}

impl Default for SolveParams {
    fn default() -> SolveParams {
        SolveParams {
            budget: DEFAULT_BUDGET,
            workers: DEFAULT_WORKERS,
            seed: 0,
        }
    }
}

/// Result of a solve: the best assignment found and its KPIs.
pub struct Outcome {
    /// Users moved per `[src, dst, type, time]`; all zero when no
    /// feasible assignment was found.
    pub solution: Tensor4<i32>,
    /// Total movement cost, or `None` when no assignment was found.
    pub objective: Option<f64>,
    pub elapsed: Duration,
    /// Greedy constructions performed across all workers.
    pub restarts: u64,
    /// Improvement rounds with a positive gain, across all workers.
    pub improvements: u64,
    /// Users moved per type in the returned assignment.
    pub moved_per_type: Vec<i64>,
}

/// Read-only state shared by all workers during one solve.
pub(crate) struct SearchContext<'a> {
    pub pb: &'a Problem,
    pub ord: &'a Orderings,
    pub time_normal: &'a AtomicBool,
    pub time_scarce: &'a AtomicBool,
    slots: &'a OnceCell<SlotTable>,
}

impl<'a> SearchContext<'a> {
    /// The activity-slot table, built by whichever worker first needs it
    /// and published exactly once.
    pub fn slot_table(&self) -> &'a SlotTable {
        self.slots
            .get_or_init(|| SlotTable::build(self.pb, self.ord.max_activities))
    }
}

pub fn solve(pb: &Problem, params: &SolveParams) -> Outcome {
    let start = Instant::now();

    if pb.demanding_cells().next().is_none() {
        // nothing to cover: the empty assignment is optimal
        return materialize(pb, Tensor4::zeroed(pb.costs.shape()), Some(0.0), start, 0, 0);
    }

    let time_normal = Arc::new(AtomicBool::new(false));
    let time_scarce = Arc::new(AtomicBool::new(false));
    let timer_normal =
        StoppableTimer::start(params.budget.mul_f64(PERC_NORMAL), time_normal.clone());
    let timer_scarce =
        StoppableTimer::start(params.budget.mul_f64(PERC_SCARCE), time_scarce.clone());

    let ord = Orderings::build(pb);
    let slots = OnceCell::new();
    let ctx = SearchContext {
        pb,
        ord: &ord,
        time_normal: &time_normal,
        time_scarce: &time_scarce,
        slots: &slots,
    };

    let mut master = SmallRng::seed_from_u64(params.seed);
    let mut workers: Vec<Worker> = (0..params.workers.max(1))
        .map(|id| Worker::new(pb, id, master.random()))
        .collect();

    thread::scope(|s| {
        for worker in workers.iter_mut() {
            let ctx = &ctx;
            s.spawn(move || worker.run(ctx));
        }
    });

    timer_normal.cancel();
    timer_scarce.cancel();

    let restarts = workers.iter().map(|w| w.restarts).sum();
    let improvements = workers.iter().map(|w| w.improvements).sum();
    let winner = workers
        .into_iter()
        .min_by(|a, b| a.best_obj.total_cmp(&b.best_obj))
        .unwrap();

    let (solution, objective) = if winner.best_obj.is_finite() {
        (winner.best, Some(winner.best_obj))
    } else {
        (Tensor4::zeroed(pb.costs.shape()), None)
    };
    let outcome = materialize(pb, solution, objective, start, restarts, improvements);
    match outcome.objective {
        Some(obj) => tracing::info!(
            objective = obj,
            restarts,
            improvements,
            elapsed = ?outcome.elapsed,
            "search finished"
        ),
        None => tracing::info!(restarts, elapsed = ?outcome.elapsed, "no feasible assignment"),
    }
    outcome
}

fn materialize(
    pb: &Problem,
    solution: Tensor4<i32>,
    objective: Option<f64>,
    start: Instant,
    restarts: u64,
    improvements: u64,
) -> Outcome {
    let mut moved_per_type = vec![0i64; pb.n_types];
    for i in pb.cells() {
        for j in pb.cells() {
            for m in pb.types() {
                for t in pb.times() {
                    moved_per_type[m] += solution[[i, j, m, t]] as i64;
                }
            }
        }
    }
    Outcome {
        solution,
        objective,
        elapsed: start.elapsed(),
        restarts,
        improvements,
        moved_per_type,
    }
}
