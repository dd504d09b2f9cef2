//! Feasibility verification of a returned solution, independent from
//! the search: re-checks every invariant against the instance data.

use std::fmt::{Display, Formatter};

use crate::problem::Problem;
use crate::solver::Outcome;

const OBJECTIVE_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Feasible,
    NoSolution,
    Violation(Violation),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    DemandUnmet { cell: usize, done: i64, required: i64 },
    SupplyExceeded { cell: usize, utype: usize, period: usize, used: i64, available: i64 },
    SelfAssignment { cell: usize, utype: usize, period: usize },
    ObjectiveMismatch { reported: f64, actual: f64 },
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Feasible => write!(f, "FEASIBLE"),
            Verdict::NoSolution => write!(f, "NO_SOLUTION"),
            Verdict::Violation(v) => write!(f, "INFEASIBLE: {v}"),
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::DemandUnmet { cell, done, required } => {
                write!(f, "cell {cell} performs {done} of {required} demanded activities")
            }
            Violation::SupplyExceeded { cell, utype, period, used, available } => write!(
                f,
                "bucket ({cell}, {utype}, {period}) moves {used} of {available} available users"
            ),
            Violation::SelfAssignment { cell, utype, period } => {
                write!(f, "cell {cell} serves itself with type {utype} at time {period}")
            }
            Violation::ObjectiveMismatch { reported, actual } => {
                write!(f, "reported objective {reported} but assignments cost {actual}")
            }
        }
    }
}

/// Checks a solve outcome against its instance. Returns the first
/// violated invariant, if any.
pub fn check(pb: &Problem, outcome: &Outcome) -> Verdict {
    let Some(reported) = outcome.objective else {
        return Verdict::NoSolution;
    };
    let sol = &outcome.solution;

    for i in pb.cells() {
        for m in pb.types() {
            for t in pb.times() {
                if sol[[i, i, m, t]] != 0 {
                    return Verdict::Violation(Violation::SelfAssignment {
                        cell: i,
                        utype: m,
                        period: t,
                    });
                }
                let used: i64 = pb.cells().map(|j| sol[[i, j, m, t]] as i64).sum();
                let available = pb.users_available[[i, m, t]] as i64;
                if used > available {
                    return Verdict::Violation(Violation::SupplyExceeded {
                        cell: i,
                        utype: m,
                        period: t,
                        used,
                        available,
                    });
                }
            }
        }
    }

    for j in pb.cells() {
        let mut done = 0i64;
        for i in pb.cells() {
            for m in pb.types() {
                for t in pb.times() {
                    done += pb.act_per_user[m] as i64 * sol[[i, j, m, t]] as i64;
                }
            }
        }
        if done < pb.activities[j] as i64 {
            return Verdict::Violation(Violation::DemandUnmet {
                cell: j,
                done,
                required: pb.activities[j] as i64,
            });
        }
    }

    let mut actual = 0.0;
    for i in pb.cells() {
        for j in pb.cells() {
            for m in pb.types() {
                for t in pb.times() {
                    actual += pb.costs[[i, j, m, t]] * sol[[i, j, m, t]] as f64;
                }
            }
        }
    }
    if (actual - reported).abs() > OBJECTIVE_TOLERANCE {
        return Verdict::Violation(Violation::ObjectiveMismatch { reported, actual });
    }

    Verdict::Feasible
}
