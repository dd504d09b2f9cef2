//! Reachability of a zero residual demand by whole users, used by the
//! scarce-user construction to avoid wasting activities.

use crate::collections::tensor::Tensor2;
use crate::problem::Problem;

/// A `(max_activities + 1) x (n_types + 1)` boolean table.
///
/// `reach[a][m]` answers: starting from a residual demand of `a`
/// activities, can one user of type `m` be engaged such that the
/// remaining demand is still exactly coverable by some sequence of
/// users? The extra column (`m == n_types`) aggregates the row: some
/// type works at `a`.
pub struct SlotTable {
    n_types: usize,
    reach: Tensor2<bool>,
}

impl SlotTable {
    pub fn build(pb: &Problem, max_activities: i32) -> SlotTable {
        let n_types = pb.n_types;
        let rows = max_activities as usize + 1;
        let mut reach = Tensor2::filled([rows, n_types + 1], false);
        // zero demand is coverable by doing nothing
        for m in 0..=n_types {
            reach[[0, m]] = true;
        }
        for a in 1..rows {
            let mut any = false;
            for m in 0..n_types {
                let apu = pb.act_per_user[m] as usize;
                let ok = a >= apu && reach[[a - apu, n_types]];
                reach[[a, m]] = ok;
                any |= ok;
            }
            reach[[a, n_types]] = any;
        }
        SlotTable { n_types, reach }
    }

    /// True when no sequence of whole users covers `a` exactly: the
    /// no-waste pass must leave this demand to the wasting pass.
    #[inline]
    pub fn should_skip(&self, a: i32) -> bool {
        !self.reach[[a as usize, self.n_types]]
    }

    /// True when engaging one user of type `m` at residual demand `a`
    /// keeps the remainder exactly coverable.
    #[inline]
    pub fn can_be_selected(&self, a: i32, m: usize) -> bool {
        a >= 0 && self.reach[[a as usize, m]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::tensor::{Tensor3, Tensor4};

    fn problem(act_per_user: Vec<i32>, max_demand: i32) -> Problem {
        let m = act_per_user.len();
        Problem::new(
            act_per_user,
            vec![0, max_demand],
            Tensor3::filled([2, m, 1], 1),
            Tensor4::filled([2, 2, m, 1], 1.0),
        )
    }

    #[test]
    fn test_base_case_and_consistency() {
        let pb = problem(vec![2, 3], 7);
        let table = SlotTable::build(&pb, 7);
        assert!(!table.should_skip(0));
        assert!(table.can_be_selected(0, 0) && table.can_be_selected(0, 1));
        for a in 0..=7 {
            for m in 0..2 {
                // a type can only be selected when it fits within the demand
                if table.can_be_selected(a, m) {
                    assert!(a >= pb.act_per_user[m]);
                }
            }
            // the sentinel column is the disjunction of the row
            let any = (0..2).any(|m| table.can_be_selected(a, m));
            assert_eq!(table.should_skip(a), !any, "demand {a}");
        }
    }

    #[test]
    fn test_reachability_with_caps_2_and_3() {
        let pb = problem(vec![2, 3], 7);
        let table = SlotTable::build(&pb, 7);
        // 1 is not a sum of 2s and 3s; everything from 2 up is
        assert!(table.should_skip(1));
        for a in 2..=7 {
            assert!(!table.should_skip(a), "demand {a}");
        }
        // at 4, taking a 3 leaves 1 which is dead; taking a 2 leaves 2
        assert!(table.can_be_selected(4, 0));
        assert!(!table.can_be_selected(4, 1));
        // negative residuals are never selectable
        assert!(!table.can_be_selected(-1, 0));
    }
}
