use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::collections::tensor::{Tensor3, Tensor4};
use crate::greedy;
use crate::improve;
use crate::problem::Problem;
use crate::solver::SearchContext;
use crate::usage::UsageTracker;

/// Greedy restarts per improvement round.
const RESTARTS_PER_ROUND: usize = 10;

/// One independent search thread: owns its RNG, scratch tables and best
/// solution; shares only the immutable problem data and the deadline
/// flags with the rest of the solver.
pub(crate) struct Worker {
    pub id: usize,
    rng: SmallRng,
    /// Permutation of the destinations with positive demand.
    visit_order: Vec<u32>,
    supply: Tensor3<i32>,
    current: Tensor4<i32>,
    round_best: Tensor4<i32>,
    usage: UsageTracker,
    pub best: Tensor4<i32>,
    pub best_obj: f64,
    pub restarts: u64,
    /// Improvement rounds that returned a positive gain.
    pub improvements: u64,
}

impl Worker {
    pub fn new(pb: &Problem, id: usize, seed: u64) -> Worker {
        Worker {
            id,
            rng: SmallRng::seed_from_u64(seed),
            visit_order: pb.demanding_cells().map(|j| j as u32).collect(),
            supply: pb.users_available.clone(),
            current: Tensor4::zeroed(pb.costs.shape()),
            round_best: Tensor4::zeroed(pb.costs.shape()),
            usage: UsageTracker::new(pb.users_available.shape()),
            best: Tensor4::zeroed(pb.costs.shape()),
            best_obj: f64::INFINITY,
            restarts: 0,
            improvements: 0,
        }
    }

    /// Alternates batches of randomized greedy restarts with improvement
    /// rounds until the deadline flag is raised. Starts against the
    /// normal deadline; the first infeasible construction switches this
    /// worker to the scarce constructor and the longer deadline.
    pub fn run(&mut self, ctx: &SearchContext) {
        let pb = ctx.pb;
        let ord = ctx.ord;
        let mut stop: &AtomicBool = ctx.time_normal;
        let mut scarce = false;

        while !stop.load(Ordering::Acquire) {
            let mut round_obj = f64::INFINITY;
            for _ in 0..RESTARTS_PER_ROUND {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                self.visit_order.shuffle(&mut self.rng);
                let obj = if scarce {
                    greedy::construct_scarce(
                        pb,
                        ord,
                        ctx.slot_table(),
                        &self.visit_order,
                        &mut self.supply,
                        &mut self.usage,
                        &mut self.current,
                    )
                } else {
                    greedy::construct(
                        pb,
                        ord,
                        &self.visit_order,
                        &mut self.supply,
                        &mut self.usage,
                        &mut self.current,
                    )
                };
                self.restarts += 1;
                if obj < round_obj {
                    round_obj = obj;
                    self.round_best.copy_from(&self.current);
                }
                if obj.is_infinite() && !scarce {
                    tracing::debug!(worker = self.id, "switching to scarce-user construction");
                    scarce = true;
                    stop = ctx.time_scarce;
                    ctx.slot_table();
                }
            }

            if round_obj.is_finite() {
                while !stop.load(Ordering::Acquire) {
                    let gain = improve::improve(pb, ord, stop, &mut self.round_best);
                    if gain <= 0.0 {
                        break;
                    }
                    round_obj -= gain;
                    self.improvements += 1;
                }
                if round_obj < self.best_obj {
                    tracing::debug!(worker = self.id, objective = round_obj, "new worker best");
                    self.best_obj = round_obj;
                    self.best.copy_from(&self.round_best);
                }
            }
        }
    }
}
