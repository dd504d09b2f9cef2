//! KPI summary and solution file writers.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{self, Write as _};
use std::path::Path;

use itertools::Itertools;
use offload::solver::Outcome;
use offload::Problem;

/// One `name;obj;elapsed_seconds;n_moved_type_0;...` line, newline
/// terminated. The objective field is `inf` when no assignment exists.
pub fn format_kpi(name: &str, outcome: &Outcome) -> String {
    let mut line = String::new();
    match outcome.objective {
        Some(obj) => write!(line, "{name};{obj}").unwrap(),
        None => write!(line, "{name};inf").unwrap(),
    }
    write!(line, ";{:.3}", outcome.elapsed.as_secs_f64()).unwrap();
    writeln!(line, ";{}", outcome.moved_per_type.iter().join(";")).unwrap();
    line
}

/// Appends the KPI line to `path`, creating the file if needed.
pub fn append_kpi(path: &Path, name: &str, outcome: &Outcome) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format_kpi(name, outcome).as_bytes())
}

/// The solution dump: a `C;T;M` header, then one `i;j;m;t;count` line
/// per positive entry, iterated type-first.
pub fn format_solution(pb: &Problem, outcome: &Outcome) -> String {
    let mut out = String::new();
    writeln!(out, "{};{};{}", pb.n_cells, pb.n_times, pb.n_types).unwrap();
    for m in pb.types() {
        for t in pb.times() {
            for i in pb.cells() {
                for j in pb.cells() {
                    let count = outcome.solution[[i, j, m, t]];
                    if count > 0 {
                        writeln!(out, "{i};{j};{m};{t};{count}").unwrap();
                    }
                }
            }
        }
    }
    out
}

pub fn write_solution(path: &Path, pb: &Problem, outcome: &Outcome) -> io::Result<()> {
    std::fs::write(path, format_solution(pb, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload::collections::tensor::{Tensor3, Tensor4};
    use std::time::Duration;

    fn fixture() -> (Problem, Outcome) {
        let mut avail = Tensor3::zeroed([2, 2, 1]);
        avail[[0, 0, 0]] = 2;
        avail[[0, 1, 0]] = 1;
        let costs = Tensor4::filled([2, 2, 2, 1], 1.0);
        let pb = Problem::new(vec![1, 2], vec![0, 4], avail, costs);

        let mut solution = Tensor4::zeroed(pb.costs.shape());
        solution[[0, 1, 0, 0]] = 2;
        solution[[0, 1, 1, 0]] = 1;
        let outcome = Outcome {
            solution,
            objective: Some(3.0),
            elapsed: Duration::from_millis(1500),
            restarts: 42,
            improvements: 3,
            moved_per_type: vec![2, 1],
        };
        (pb, outcome)
    }

    #[test]
    fn test_kpi_line() {
        let (_, outcome) = fixture();
        assert_eq!(format_kpi("inst01", &outcome), "inst01;3;1.500;2;1\n");
    }

    #[test]
    fn test_kpi_line_without_solution() {
        let (_, mut outcome) = fixture();
        outcome.objective = None;
        outcome.moved_per_type = vec![0, 0];
        assert_eq!(format_kpi("inst01", &outcome), "inst01;inf;1.500;0;0\n");
    }

    #[test]
    fn test_solution_dump() {
        let (pb, outcome) = fixture();
        assert_eq!(format_solution(&pb, &outcome), "2;1;2\n0;1;0;0;2\n0;1;1;0;1\n");
    }
}
