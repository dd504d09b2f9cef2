//! Greedy construction of an assignment covering every demand, in two
//! flavors: the standard constructor that batches users from the
//! cheapest bucket and rebalances overshoot, and the scarce-user
//! fallback that engages one user at a time and first refuses to waste
//! activities.

use crate::collections::tensor::{Tensor3, Tensor4};
use crate::orderings::Orderings;
use crate::problem::{MoveId, Problem};
use crate::slots::SlotTable;
use crate::usage::UsageTracker;

/// Objective reported when a construction cannot cover some demand.
pub const INFEASIBLE: f64 = f64::INFINITY;

/// Builds a full assignment for the given destination visit order.
///
/// `solution` is zeroed and `supply` re-copied from the instance on
/// entry; `usage` is deliberately left untouched so that the tie-break
/// information survives across restarts. Returns the objective, or
/// [`INFEASIBLE`] when some demand cannot be covered.
pub fn construct(
    pb: &Problem,
    ord: &Orderings,
    visit_order: &[u32],
    supply: &mut Tensor3<i32>,
    usage: &mut UsageTracker,
    solution: &mut Tensor4<i32>,
) -> f64 {
    solution.fill(0);
    supply.copy_from(&pb.users_available);
    let mut obj = 0.0;
    let mut resume = vec![0usize; ord.caps.len()];
    let mut inserted: Vec<MoveId> = Vec::new();

    for &j in visit_order {
        let j = j as usize;
        let mut demand = pb.activities[j];
        resume.fill(0);
        inserted.clear();

        while demand > 0 {
            let k = ord.cap_index(demand);
            let Some(chosen) = select(pb, ord, k, j, demand, supply, usage, &mut resume[k])
            else {
                return INFEASIBLE;
            };
            let apu = pb.act_per_user[chosen.m as usize];
            let avail = supply[chosen.bucket()];
            let mut n = (demand / apu).min(avail);
            if n == 0 {
                // the candidate scan only yields non-empty buckets
                debug_assert!(avail >= 1);
                n = 1;
            }
            solution[chosen.idx()] += n;
            obj += n as f64 * pb.costs[chosen.idx()];
            demand -= n * apu;
            supply[chosen.bucket()] -= n;
            usage.add(chosen.bucket(), n, pb.users_available[chosen.bucket()]);
            inserted.push(chosen);
        }

        if demand < 0 {
            obj -= rebalance(pb, &mut inserted, supply, solution, &mut demand);
        }
    }
    obj
}

/// Picks the candidate with the lowest effective per-activity cost for
/// the current residual demand, breaking exact ties by the usage
/// tracker. The scan starts at the per-list resume point, which is
/// pushed past the exhausted prefix (supply only shrinks during one
/// construction, so skipped buckets stay exhausted).
#[allow(clippy::too_many_arguments)]
fn select(
    pb: &Problem,
    ord: &Orderings,
    k: usize,
    j: usize,
    demand: i32,
    supply: &Tensor3<i32>,
    usage: &UsageTracker,
    resume: &mut usize,
) -> Option<MoveId> {
    let (start, first) = ord.next_available(k, j, *resume, supply)?;
    *resume = start;
    let eff =
        |mv: MoveId| pb.costs[mv.idx()] / demand.min(pb.act_per_user[mv.m as usize]) as f64;
    let mut best = first;
    let mut best_eff = eff(first);
    for &mv in &ord.list(k, j)[start + 1..] {
        if supply[mv.bucket()] == 0 {
            continue;
        }
        let e = eff(mv);
        if e > best_eff {
            // the list is sorted: nothing further can beat the incumbent
            break;
        }
        if e < best_eff || usage.of(mv.bucket()) < usage.of(best.bucket()) {
            best = mv;
            best_eff = e;
        }
    }
    Some(best)
}

/// Gives back users after an overshoot: walks the cell's insertions from
/// the costliest down and returns one user each time its whole activity
/// contribution fits in the excess. Returns the objective reduction.
fn rebalance(
    pb: &Problem,
    inserted: &mut [MoveId],
    supply: &mut Tensor3<i32>,
    solution: &mut Tensor4<i32>,
    demand: &mut i32,
) -> f64 {
    inserted.sort_by(|a, b| pb.costs[b.idx()].partial_cmp(&pb.costs[a.idx()]).unwrap());
    let mut reduction = 0.0;
    for &mv in inserted.iter() {
        if *demand >= 0 {
            break;
        }
        let apu = pb.act_per_user[mv.m as usize];
        if apu <= -*demand && solution[mv.idx()] > 0 {
            solution[mv.idx()] -= 1;
            supply[mv.bucket()] += 1;
            reduction += pb.costs[mv.idx()];
            *demand += apu;
        }
    }
    reduction
}

/// Fallback used once the standard constructor has failed: users are
/// scarce enough that overshooting a cell can starve another one.
///
/// Runs two passes over the residual demands. The first engages one
/// user at a time and only when the slot table proves the remainder is
/// still exactly coverable; cells whose demand is not coverable at all
/// are left to the second pass, where eligibility is dropped and
/// overshoot tolerated. Ties on cost prefer the higher-capacity type.
#[allow(clippy::too_many_arguments)]
pub fn construct_scarce(
    pb: &Problem,
    ord: &Orderings,
    slots: &SlotTable,
    visit_order: &[u32],
    supply: &mut Tensor3<i32>,
    usage: &mut UsageTracker,
    solution: &mut Tensor4<i32>,
) -> f64 {
    solution.fill(0);
    supply.copy_from(&pb.users_available);
    let mut obj = 0.0;
    let mut residual: Vec<(usize, i32)> = visit_order
        .iter()
        .map(|&j| (j as usize, pb.activities[j as usize]))
        .collect();

    // pass 1: no waste
    for (j, demand) in residual.iter_mut() {
        while *demand > 0 && !slots.should_skip(*demand) {
            match select_scarce(pb, ord, *j, *demand, supply, Some(slots)) {
                Some(chosen) => commit_one(pb, chosen, supply, usage, solution, &mut obj, demand),
                None => break,
            }
        }
    }

    // pass 2: wasting allowed
    for (j, demand) in residual.iter_mut() {
        while *demand > 0 {
            match select_scarce(pb, ord, *j, *demand, supply, None) {
                Some(chosen) => commit_one(pb, chosen, supply, usage, solution, &mut obj, demand),
                None => return INFEASIBLE,
            }
        }
    }
    obj
}

fn commit_one(
    pb: &Problem,
    mv: MoveId,
    supply: &mut Tensor3<i32>,
    usage: &mut UsageTracker,
    solution: &mut Tensor4<i32>,
    obj: &mut f64,
    demand: &mut i32,
) {
    solution[mv.idx()] += 1;
    *obj += pb.costs[mv.idx()];
    *demand -= pb.act_per_user[mv.m as usize];
    supply[mv.bucket()] -= 1;
    usage.add(mv.bucket(), 1, pb.users_available[mv.bucket()]);
}

/// Candidate scan of the scarce constructor. With a slot table, only
/// types that keep the remainder exactly coverable are eligible; without
/// one, any type with remaining supply is.
fn select_scarce(
    pb: &Problem,
    ord: &Orderings,
    j: usize,
    demand: i32,
    supply: &Tensor3<i32>,
    slots: Option<&SlotTable>,
) -> Option<MoveId> {
    let k = ord.cap_index(demand);
    let mut best: Option<(f64, MoveId)> = None;
    for &mv in ord.list(k, j) {
        if supply[mv.bucket()] == 0 {
            continue;
        }
        let e = pb.costs[mv.idx()] / demand.min(pb.act_per_user[mv.m as usize]) as f64;
        if let Some((best_eff, _)) = best {
            if e > best_eff {
                break;
            }
        }
        if let Some(slots) = slots {
            if !slots.can_be_selected(demand, mv.m as usize) {
                continue;
            }
        }
        match best {
            None => best = Some((e, mv)),
            Some((best_eff, incumbent)) => {
                let bigger = pb.act_per_user[mv.m as usize]
                    > pb.act_per_user[incumbent.m as usize];
                if e < best_eff || bigger {
                    best = Some((e, mv));
                }
            }
        }
    }
    best.map(|(_, mv)| mv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::tensor::{Tensor3, Tensor4};

    fn scratch(pb: &Problem) -> (Tensor3<i32>, UsageTracker, Tensor4<i32>) {
        let shape = pb.users_available.shape();
        (
            pb.users_available.clone(),
            UsageTracker::new(shape),
            Tensor4::zeroed(pb.costs.shape()),
        )
    }

    /// 2 cells, one user in cell 0, one activity demanded in cell 1.
    fn single_user_instance() -> Problem {
        let mut avail = Tensor3::zeroed([2, 1, 1]);
        avail[[0, 0, 0]] = 1;
        let mut costs = Tensor4::zeroed([2, 2, 1, 1]);
        costs[[0, 1, 0, 0]] = 7.0;
        costs[[1, 0, 0, 0]] = 7.0;
        Problem::new(vec![1], vec![0, 1], avail, costs)
    }

    #[test]
    fn test_single_user() {
        let pb = single_user_instance();
        let ord = Orderings::build(&pb);
        let (mut supply, mut usage, mut sol) = scratch(&pb);
        let obj = construct(&pb, &ord, &[1], &mut supply, &mut usage, &mut sol);
        assert_eq!(obj, 7.0);
        assert_eq!(sol[[0, 1, 0, 0]], 1);
        assert_eq!(supply[[0, 0, 0]], 0);
    }

    #[test]
    fn test_unmet_demand_is_infeasible() {
        let mut pb = single_user_instance();
        pb.activities[1] = 3;
        let ord = Orderings::build(&pb);
        let (mut supply, mut usage, mut sol) = scratch(&pb);
        let obj = construct(&pb, &ord, &[1], &mut supply, &mut usage, &mut sol);
        assert!(obj.is_infinite());
    }

    /// The cheap unit-capacity user is taken first, then a capacity-3
    /// user overshoots by one; rebalance must give the unit user back.
    #[test]
    fn test_overshoot_rebalance() {
        let mut avail = Tensor3::zeroed([2, 2, 1]);
        avail[[0, 0, 0]] = 1;
        avail[[0, 1, 0]] = 1;
        let mut costs = Tensor4::zeroed([2, 2, 2, 1]);
        costs[[0, 1, 0, 0]] = 4.0;
        costs[[0, 1, 1, 0]] = 15.0;
        let pb = Problem::new(vec![1, 3], vec![0, 3], avail, costs);
        let ord = Orderings::build(&pb);
        let (mut supply, mut usage, mut sol) = scratch(&pb);
        let obj = construct(&pb, &ord, &[1], &mut supply, &mut usage, &mut sol);
        assert_eq!(obj, 15.0);
        assert_eq!(sol[[0, 1, 0, 0]], 0, "the unit user must be returned");
        assert_eq!(sol[[0, 1, 1, 0]], 1);
        assert_eq!(supply[[0, 0, 0]], 1);
    }

    /// Two sources tie on cost; the usage tracker must steer the second
    /// restart to the source the first one did not touch.
    #[test]
    fn test_usage_breaks_ties_across_restarts() {
        let mut avail = Tensor3::zeroed([3, 1, 1]);
        avail[[0, 0, 0]] = 1;
        avail[[1, 0, 0]] = 1;
        let mut costs = Tensor4::zeroed([3, 3, 1, 1]);
        costs[[0, 2, 0, 0]] = 5.0;
        costs[[1, 2, 0, 0]] = 5.0;
        let pb = Problem::new(vec![1], vec![0, 0, 1], avail, costs);
        let ord = Orderings::build(&pb);
        let (mut supply, mut usage, mut sol) = scratch(&pb);

        let obj = construct(&pb, &ord, &[2], &mut supply, &mut usage, &mut sol);
        assert_eq!(obj, 5.0);
        assert_eq!(sol[[0, 2, 0, 0]], 1, "first tie resolves by list order");

        let obj = construct(&pb, &ord, &[2], &mut supply, &mut usage, &mut sol);
        assert_eq!(obj, 5.0);
        assert_eq!(sol[[1, 2, 0, 0]], 1, "second restart prefers the unused source");
    }

    /// Two destinations of demand 5 over types of capacity 2 and 3 with
    /// two users each: batching wastes a capacity-3 user and starves the
    /// second cell on every visit order, while the no-waste pass covers
    /// both exactly.
    fn scarce_instance() -> Problem {
        let mut avail = Tensor3::zeroed([3, 2, 1]);
        avail[[0, 0, 0]] = 2;
        avail[[0, 1, 0]] = 2;
        let mut costs = Tensor4::zeroed([3, 3, 2, 1]);
        for j in 1..3 {
            costs[[0, j, 0, 0]] = 4.0;
            costs[[0, j, 1, 0]] = 3.0;
        }
        Problem::new(vec![2, 3], vec![0, 5, 5], avail, costs)
    }

    #[test]
    fn test_scarce_mode_succeeds_where_standard_fails() {
        let pb = scarce_instance();
        let ord = Orderings::build(&pb);
        let (mut supply, mut usage, mut sol) = scratch(&pb);

        for order in [[1u32, 2], [2u32, 1]] {
            let obj = construct(&pb, &ord, &order, &mut supply, &mut usage, &mut sol);
            assert!(obj.is_infinite(), "standard greedy must fail on {order:?}");
        }

        let slots = SlotTable::build(&pb, 5);
        let obj =
            construct_scarce(&pb, &ord, &slots, &[1, 2], &mut supply, &mut usage, &mut sol);
        assert_eq!(obj, 14.0);
        for j in 1..3 {
            assert_eq!(sol[[0, j, 0, 0]], 1);
            assert_eq!(sol[[0, j, 1, 0]], 1);
            let done = 2 * sol[[0, j, 0, 0]] + 3 * sol[[0, j, 1, 0]];
            assert_eq!(done, 5, "no waste in pass 1");
        }
    }
}
