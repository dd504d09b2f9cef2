use crate::collections::tensor::{Tensor3, Tensor4};

/// A problem instance. Read-only once constructed.
///
/// Destination cells demand a number of activities; users sitting in
/// (cell, type, time) buckets can be moved to perform them, each user of
/// type `m` covering `act_per_user[m]` activities. Moving one user of
/// type `m` at time `t` from cell `i` to cell `j` costs `costs[[i,j,m,t]]`.
/// A user never serves its own cell, so the `i == j` entries of the cost
/// table are unused.
#[derive(Clone, Debug)]
pub struct Problem {
    pub n_cells: usize,
    pub n_types: usize,
    pub n_times: usize,
    /// Activities one user of each type performs per engagement. All positive.
    pub act_per_user: Vec<i32>,
    /// Activity demand per destination cell.
    pub activities: Vec<i32>,
    /// Available users per `[cell, type, time]` bucket.
    pub users_available: Tensor3<i32>,
    /// Movement costs per `[src, dst, type, time]`. Integer-valued, stored
    /// as floats for the reduced-cost divisions.
    pub costs: Tensor4<f64>,
}

impl Problem {
    pub fn new(
        act_per_user: Vec<i32>,
        activities: Vec<i32>,
        users_available: Tensor3<i32>,
        costs: Tensor4<f64>,
    ) -> Problem {
        let n_cells = activities.len();
        let n_types = act_per_user.len();
        let [c, m, t] = users_available.shape();
        assert!(c == n_cells && m == n_types);
        assert_eq!(costs.shape(), [n_cells, n_cells, n_types, t]);
        assert!(act_per_user.iter().all(|&a| a > 0));
        Problem {
            n_cells,
            n_types,
            n_times: t,
            act_per_user,
            activities,
            users_available,
            costs,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = usize> {
        0..self.n_cells
    }

    pub fn types(&self) -> impl Iterator<Item = usize> {
        0..self.n_types
    }

    pub fn times(&self) -> impl Iterator<Item = usize> {
        0..self.n_times
    }

    /// Cells with a positive activity demand, i.e. the destinations a
    /// solution must cover.
    pub fn demanding_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells().filter(|&j| self.activities[j] > 0)
    }
}

/// Coordinates of one assignment bucket: users of type `m` at time `t`
/// moved from cell `i` to destination cell `j`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MoveId {
    pub i: u32,
    pub j: u32,
    pub m: u32,
    pub t: u32,
}

impl MoveId {
    pub fn new(i: usize, j: usize, m: usize, t: usize) -> MoveId {
        MoveId {
            i: i as u32,
            j: j as u32,
            m: m as u32,
            t: t as u32,
        }
    }

    /// Index into the 4-D solution and cost tables.
    #[inline]
    pub fn idx(self) -> [usize; 4] {
        [self.i as usize, self.j as usize, self.m as usize, self.t as usize]
    }

    /// Index of the supplying `(cell, type, time)` bucket.
    #[inline]
    pub fn bucket(self) -> [usize; 3] {
        [self.i as usize, self.m as usize, self.t as usize]
    }
}
