//! Derived statistics of a [`Problem`]: the per-capacity-cap candidate
//! lists that both construction and improvement walk, pre-sorted by
//! reduced cost.

use std::cmp::Ordering;
use std::thread;

use crate::collections::tensor::Tensor3;
use crate::problem::{MoveId, Problem};

/// Pre-sorted candidate lists and a few scalar statistics, computed once
/// after the problem is loaded and never mutated afterwards.
///
/// For each cap index `k` and destination `j` with positive demand,
/// `list(k, j)` holds every tuple `(i, j, m, t)` with `i != j` and a
/// non-empty supply bucket, ordered by non-decreasing reduced cost
/// `costs[i,j,m,t] / min(act_per_user[m], caps[k])`. The cap bounds the
/// number of activities a user can usefully perform when the residual
/// demand is small: a type doing more than `caps[k]` activities is
/// effectively paying its cost for only `caps[k]` of them.
pub struct Orderings {
    /// `act_per_user` sorted non-increasing; `caps[k]` is the cap of list `k`.
    pub caps: Vec<i32>,
    pub max_act_per_user: i32,
    pub max_activities: i32,
    /// `orders[k][j]`, empty for cells without demand.
    orders: Vec<Vec<Vec<MoveId>>>,
}

impl Orderings {
    /// Builds all candidate lists, one helper thread per cap index.
    pub fn build(pb: &Problem) -> Orderings {
        let mut caps = pb.act_per_user.clone();
        caps.sort_unstable_by(|a, b| b.cmp(a));
        caps.dedup();

        let orders = thread::scope(|s| {
            let handles: Vec<_> = caps
                .iter()
                .map(|&cap| s.spawn(move || build_for_cap(pb, cap)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        Orderings {
            max_act_per_user: caps[0],
            max_activities: pb.activities.iter().copied().max().unwrap_or(0),
            caps,
            orders,
        }
    }

    /// The list index to use for a residual demand: the first (largest)
    /// cap not exceeding it, or the last list when every type
    /// over-covers the demand.
    #[inline]
    pub fn cap_index(&self, demand: i32) -> usize {
        self.caps
            .iter()
            .position(|&c| c <= demand)
            .unwrap_or(self.caps.len() - 1)
    }

    #[inline]
    pub fn list(&self, k: usize, j: usize) -> &[MoveId] {
        &self.orders[k][j]
    }

    /// Advances `from` past candidates whose supply bucket is exhausted
    /// in `supply`. Returns the position and tuple of the first available
    /// candidate, if any remains.
    #[inline]
    pub fn next_available(
        &self,
        k: usize,
        j: usize,
        from: usize,
        supply: &Tensor3<i32>,
    ) -> Option<(usize, MoveId)> {
        let list = &self.orders[k][j];
        list[from..]
            .iter()
            .position(|mv| supply[mv.bucket()] > 0)
            .map(|off| (from + off, list[from + off]))
    }

    /// The sort key of list `k`.
    #[inline]
    pub fn reduced_cost(&self, pb: &Problem, k: usize, mv: MoveId) -> f64 {
        pb.costs[mv.idx()] / self.caps[k].min(pb.act_per_user[mv.m as usize]) as f64
    }
}

fn build_for_cap(pb: &Problem, cap: i32) -> Vec<Vec<MoveId>> {
    let key = |mv: &MoveId| pb.costs[mv.idx()] / cap.min(pb.act_per_user[mv.m as usize]) as f64;
    let mut per_dest = vec![Vec::new(); pb.n_cells];
    for j in pb.demanding_cells() {
        let mut list = Vec::new();
        for i in pb.cells() {
            if i == j {
                continue;
            }
            for m in pb.types() {
                for t in pb.times() {
                    if pb.users_available[[i, m, t]] > 0 {
                        list.push(MoveId::new(i, j, m, t));
                    }
                }
            }
        }
        // ties resolve by the (i, m, t) enumeration order, deterministically
        list.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
        per_dest[j] = list;
    }
    per_dest
}
