//! Chained-improvement local search: tries to evict users from their
//! assignment and re-cover the freed activities more cheaply, cascading
//! through over-committed supply buckets with a bounded recursive search
//! and undoing every dead end from an append-only delta log.

use std::sync::atomic::{AtomicBool, Ordering};

use smallvec::SmallVec;

use crate::collections::tensor::{Tensor3, Tensor4};
use crate::orderings::Orderings;
use crate::problem::{MoveId, Problem};

/// A branch is abandoned when its running gain drops below this.
const MIN_GAIN: f64 = -4.0;
/// Maximum recursion depth of a move chain.
const MAX_LEVEL: u32 = 5;
/// Maximum candidates tried at one recursion level.
const MAX_COUNT: u32 = 20;

type Tabu = SmallVec<[MoveId; 8]>;

/// One applied delta: `users > 0` removed that many users from `mv`,
/// `users < 0` added them. Reverting is applying the negation.
#[derive(Copy, Clone)]
struct Delta {
    mv: MoveId,
    users: i32,
}

/// Runs improvement rounds over `solution` until no root move yields a
/// positive gain or the stop flag is raised. Returns the total objective
/// reduction (0 when nothing improved).
pub fn improve(
    pb: &Problem,
    ord: &Orderings,
    stop: &AtomicBool,
    solution: &mut Tensor4<i32>,
) -> f64 {
    let mut search = Search::setup(pb, ord, stop, solution);
    let mut total = 0.0;
    let roots = search.moves_all.clone();
    for &root in &roots {
        for users in (1..=search.ord.max_act_per_user).rev() {
            loop {
                if stop.load(Ordering::Acquire) {
                    return total;
                }
                let mut tabu = Tabu::new();
                match search.try_improve(root, users, 0, 0.0, &mut tabu) {
                    Some(gain) => total += gain,
                    None => break,
                }
            }
        }
    }
    total
}

struct Search<'a> {
    pb: &'a Problem,
    ord: &'a Orderings,
    stop: &'a AtomicBool,
    solution: &'a mut Tensor4<i32>,
    /// Residual supply per bucket under the current solution; negative
    /// while a chain has borrowed more users than the bucket holds.
    used_supply: Tensor3<i32>,
    /// Activities actually performed at each destination (>= demand).
    done_in: Vec<i32>,
    /// Positive entries of the solution at setup time.
    moves_all: Vec<MoveId>,
    moves_from: Vec<Vec<MoveId>>,
    moves_to: Vec<Vec<MoveId>>,
    /// Applied deltas, reverted in strict LIFO order on dead ends.
    log: Vec<Delta>,
}

impl<'a> Search<'a> {
    fn setup(
        pb: &'a Problem,
        ord: &'a Orderings,
        stop: &'a AtomicBool,
        solution: &'a mut Tensor4<i32>,
    ) -> Search<'a> {
        let mut used_supply = pb.users_available.clone();
        let mut done_in = vec![0; pb.n_cells];
        let mut moves_all = Vec::new();
        let mut moves_from = vec![Vec::new(); pb.n_cells];
        let mut moves_to = vec![Vec::new(); pb.n_cells];
        for i in pb.cells() {
            for j in pb.cells() {
                for m in pb.types() {
                    for t in pb.times() {
                        let count = solution[[i, j, m, t]];
                        if count > 0 {
                            let mv = MoveId::new(i, j, m, t);
                            used_supply[mv.bucket()] -= count;
                            done_in[j] += count * pb.act_per_user[m];
                            moves_all.push(mv);
                            moves_from[i].push(mv);
                            moves_to[j].push(mv);
                        }
                    }
                }
            }
        }
        Search {
            pb,
            ord,
            stop,
            solution,
            used_supply,
            done_in,
            moves_all,
            moves_from,
            moves_to,
            log: Vec::new(),
        }
    }

    /// Applies a delta removing `users` users from `mv` (negative to
    /// add), records it, and returns its objective gain contribution.
    fn apply(&mut self, mv: MoveId, users: i32) -> f64 {
        self.solution[mv.idx()] -= users;
        self.used_supply[mv.bucket()] += users;
        self.done_in[mv.j as usize] -= users * self.pb.act_per_user[mv.m as usize];
        self.log.push(Delta { mv, users });
        users as f64 * self.pb.costs[mv.idx()]
    }

    /// Reverts every delta past `mark`, newest first.
    fn undo_to(&mut self, mark: usize) {
        while self.log.len() > mark {
            let Delta { mv, users } = self.log.pop().unwrap();
            self.solution[mv.idx()] += users;
            self.used_supply[mv.bucket()] -= users;
            self.done_in[mv.j as usize] += users * self.pb.act_per_user[mv.m as usize];
        }
    }

    /// While `j` performs more activities than demanded, removes single
    /// users (costliest first) whose whole contribution fits in the
    /// excess. Returns the gain recovered.
    fn prune_overshoot(&mut self, j: usize) -> f64 {
        let pb = self.pb;
        let mut gain = 0.0;
        while self.done_in[j] > pb.activities[j] {
            let before = self.done_in[j];
            self.moves_to[j]
                .sort_by(|a, b| pb.costs[b.idx()].partial_cmp(&pb.costs[a.idx()]).unwrap());
            for idx in 0..self.moves_to[j].len() {
                let mv = self.moves_to[j][idx];
                let excess = self.done_in[j] - pb.activities[j];
                if excess <= 0 {
                    break;
                }
                if pb.act_per_user[mv.m as usize] <= excess && self.solution[mv.idx()] > 0 {
                    gain += self.apply(mv, 1);
                }
            }
            if self.done_in[j] == before {
                break;
            }
        }
        gain
    }

    /// Evicts `users_to_remove` users from `curr` and searches the
    /// destination's candidate list for a cheaper way to cover the freed
    /// activities. A replacement that over-commits its supply bucket
    /// triggers a recursive eviction from that bucket's other
    /// assignments. Returns the committed running gain on success; on
    /// failure every delta of this level has been reverted.
    fn try_improve(
        &mut self,
        curr: MoveId,
        users_to_remove: i32,
        level: u32,
        gain_in: f64,
        tabu: &mut Tabu,
    ) -> Option<f64> {
        if self.solution[curr.idx()] < users_to_remove
            || level > MAX_LEVEL
            || tabu.contains(&curr)
        {
            return None;
        }
        tabu.push(curr);
        let entry_mark = self.log.len();
        let mut gain = gain_in + self.apply(curr, users_to_remove);

        let j = curr.j as usize;
        let act_to_replace = users_to_remove * self.pb.act_per_user[curr.m as usize];
        let k = self.ord.cap_index(act_to_replace);
        // the list belongs to the shared orderings, not to this search
        let ord: &'a Orderings = self.ord;
        let candidates = ord.list(k, j);
        let mut tried = 0u32;

        for &cand in candidates {
            if tabu.contains(&cand) {
                continue;
            }
            let cand_apu = self.pb.act_per_user[cand.m as usize];
            let need = (act_to_replace + cand_apu - 1) / cand_apu;
            // the instance-wide supply cap is absolute, even when the
            // chain could transiently lend users from this bucket
            if self.pb.users_available[cand.bucket()] < need {
                continue;
            }
            tried += 1;
            let cand_mark = self.log.len();
            let gain_before = gain;
            gain += self.apply(cand, -need);
            gain += self.prune_overshoot(j);

            if gain < MIN_GAIN || tried > MAX_COUNT || self.stop.load(Ordering::Acquire) {
                break;
            }

            let borrowed = self.used_supply[cand.bucket()];
            if borrowed >= 0 {
                if gain > 0.0 {
                    return Some(gain);
                }
            } else {
                // over-committed bucket: evict the deficit from one of
                // its other assignments
                for idx in 0..self.moves_from[cand.i as usize].len() {
                    let sibling = self.moves_from[cand.i as usize][idx];
                    if sibling.m != cand.m || sibling.t != cand.t {
                        continue;
                    }
                    if let Some(gain) =
                        self.try_improve(sibling, -borrowed, level + 1, gain, tabu)
                    {
                        return Some(gain);
                    }
                }
            }
            self.undo_to(cand_mark);
            gain = gain_before;
        }

        self.undo_to(entry_mark);
        tabu.pop();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::tensor::{Tensor3, Tensor4};

    /// 4 cells; destinations 1 (demand 2) and 3 (demand 1); sources 0
    /// (two users) and 2 (one user), unit-capacity type.
    fn chain_instance() -> Problem {
        let mut avail = Tensor3::zeroed([4, 1, 1]);
        avail[[0, 0, 0]] = 2;
        avail[[2, 0, 0]] = 1;
        let mut costs = Tensor4::filled([4, 4, 1, 1], 50.0);
        costs[[0, 1, 0, 0]] = 10.0;
        costs[[2, 1, 0, 0]] = 1.0;
        costs[[0, 3, 0, 0]] = 3.0;
        costs[[2, 3, 0, 0]] = 2.0;
        Problem::new(vec![1], vec![0, 2, 0, 1], avail, costs)
    }

    /// The expensive double assignment (0 -> 1) is broken up by lending
    /// the cell-2 user to destination 1, which cascades into re-covering
    /// destination 3 from cell 0: one recursion step, total gain 8.
    #[test]
    fn test_chained_improvement() {
        let pb = chain_instance();
        let ord = Orderings::build(&pb);
        let stop = AtomicBool::new(false);
        let mut sol = Tensor4::zeroed(pb.costs.shape());
        sol[[0, 1, 0, 0]] = 2;
        sol[[2, 3, 0, 0]] = 1;
        // objective of the starting point: 2 * 10 + 2 = 22

        let gain = improve(&pb, &ord, &stop, &mut sol);
        assert_eq!(gain, 8.0);
        assert_eq!(sol[[0, 1, 0, 0]], 1);
        assert_eq!(sol[[2, 1, 0, 0]], 1);
        assert_eq!(sol[[0, 3, 0, 0]], 1);
        assert_eq!(sol[[2, 3, 0, 0]], 0);
        // final objective 10 + 1 + 3 = 14 = 22 - 8

        // demand still covered, supply still respected
        assert_eq!(sol[[0, 1, 0, 0]] + sol[[2, 1, 0, 0]], 2);
        assert_eq!(sol[[0, 1, 0, 0]] + sol[[0, 3, 0, 0]], 2);
    }

    /// When every alternative is costlier, a failed search must leave
    /// the solution untouched (all deltas undone).
    #[test]
    fn test_failed_search_leaves_no_residue() {
        let mut avail = Tensor3::zeroed([3, 1, 1]);
        avail[[0, 0, 0]] = 1;
        avail[[1, 0, 0]] = 1;
        let mut costs = Tensor4::filled([3, 3, 1, 1], 9.0);
        costs[[0, 2, 0, 0]] = 2.0;
        let pb = Problem::new(vec![1], vec![0, 0, 1], avail, costs);
        let ord = Orderings::build(&pb);
        let stop = AtomicBool::new(false);
        let mut sol = Tensor4::zeroed(pb.costs.shape());
        sol[[0, 2, 0, 0]] = 1;
        let reference = sol.clone();

        let gain = improve(&pb, &ord, &stop, &mut sol);
        assert_eq!(gain, 0.0);
        assert_eq!(sol, reference);
    }

    /// A raised stop flag prevents any work.
    #[test]
    fn test_stop_flag_short_circuits() {
        let pb = chain_instance();
        let ord = Orderings::build(&pb);
        let stop = AtomicBool::new(true);
        let mut sol = Tensor4::zeroed(pb.costs.shape());
        sol[[0, 1, 0, 0]] = 2;
        sol[[2, 3, 0, 0]] = 1;
        let reference = sol.clone();
        assert_eq!(improve(&pb, &ord, &stop, &mut sol), 0.0);
        assert_eq!(sol, reference);
    }
}
