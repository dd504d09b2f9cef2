//! Reader for the whitespace-delimited instance format.
//!
//! Layout: `C T M` on the first line; M activity capacities; for each
//! (type, period) a two-integer header followed by the C x C cost block
//! in row-major order; C activity demands; for each (type, period) a
//! two-integer header followed by the C availability counts.

use offload::collections::tensor::{Tensor3, Tensor4};
use offload::Problem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),
    #[error("invalid integer '{token}' while reading {what}")]
    BadToken { token: String, what: &'static str },
    #[error("activities per user must be positive, got {0}")]
    NonPositiveCapacity(i64),
}

struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Tokens<'a> {
        Tokens {
            inner: input.split_whitespace(),
        }
    }

    fn int(&mut self, what: &'static str) -> Result<i64, ParseError> {
        let token = self.inner.next().ok_or(ParseError::UnexpectedEof(what))?;
        token.parse().map_err(|_| ParseError::BadToken {
            token: token.to_string(),
            what,
        })
    }

    fn count(&mut self, what: &'static str) -> Result<usize, ParseError> {
        let n = self.int(what)?;
        usize::try_from(n).map_err(|_| ParseError::BadToken {
            token: n.to_string(),
            what,
        })
    }

    /// Discards the (type, period) header integers of a block.
    fn skip_header(&mut self, what: &'static str) -> Result<(), ParseError> {
        self.int(what)?;
        self.int(what)?;
        Ok(())
    }
}

pub fn parse_instance(input: &str) -> Result<Problem, ParseError> {
    let mut tok = Tokens::new(input);
    let n_cells = tok.count("cell count")?;
    let n_times = tok.count("time period count")?;
    let n_types = tok.count("user type count")?;

    let mut act_per_user = Vec::with_capacity(n_types);
    for _ in 0..n_types {
        let a = tok.int("activities per user")?;
        if a <= 0 {
            return Err(ParseError::NonPositiveCapacity(a));
        }
        act_per_user.push(a as i32);
    }

    let mut costs = Tensor4::zeroed([n_cells, n_cells, n_types, n_times]);
    for m in 0..n_types {
        for t in 0..n_times {
            tok.skip_header("cost block header")?;
            for i in 0..n_cells {
                for j in 0..n_cells {
                    costs[[i, j, m, t]] = tok.int("cost")? as f64;
                }
            }
        }
    }

    let mut activities = Vec::with_capacity(n_cells);
    for _ in 0..n_cells {
        activities.push(tok.int("activity demand")? as i32);
    }

    let mut users_available = Tensor3::zeroed([n_cells, n_types, n_times]);
    for m in 0..n_types {
        for t in 0..n_times {
            tok.skip_header("availability block header")?;
            for i in 0..n_cells {
                users_available[[i, m, t]] = tok.int("availability")? as i32;
            }
        }
    }

    Ok(Problem::new(act_per_user, activities, users_available, costs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIVIAL: &str = "\
2 1 1
1
0 0
0 7
7 0
0 1
0 0
1 0
";

    #[test]
    fn test_parses_trivial_instance() {
        let pb = parse_instance(TRIVIAL).unwrap();
        assert_eq!((pb.n_cells, pb.n_times, pb.n_types), (2, 1, 1));
        assert_eq!(pb.act_per_user, vec![1]);
        assert_eq!(pb.activities, vec![0, 1]);
        assert_eq!(pb.costs[[0, 1, 0, 0]], 7.0);
        assert_eq!(pb.costs[[1, 0, 0, 0]], 7.0);
        assert_eq!(pb.users_available[[0, 0, 0]], 1);
        assert_eq!(pb.users_available[[1, 0, 0]], 0);
    }

    #[test]
    fn test_multi_block_layout() {
        // 2 cells, 2 periods, 2 types: 4 cost blocks then 4 availability blocks
        let input = "\
2 2 2
1 3
0 0  1 2 3 4
0 1  5 6 7 8
1 0  9 10 11 12
1 1  13 14 15 16
2 0
0 0  1 0
0 1  0 2
1 0  3 0
1 1  0 4
";
        let pb = parse_instance(input).unwrap();
        assert_eq!(pb.costs[[0, 1, 0, 0]], 2.0);
        assert_eq!(pb.costs[[1, 0, 0, 1]], 7.0);
        assert_eq!(pb.costs[[1, 1, 1, 1]], 16.0);
        assert_eq!(pb.users_available[[0, 0, 0]], 1);
        assert_eq!(pb.users_available[[1, 0, 1]], 2);
        assert_eq!(pb.users_available[[0, 1, 0]], 3);
        assert_eq!(pb.users_available[[1, 1, 1]], 4);
    }

    #[test]
    fn test_truncated_input() {
        let err = parse_instance("2 1").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof("user type count")));
        let err = parse_instance("2 1 1\n1\n0 0\n0 7 7").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof("cost")));
    }

    #[test]
    fn test_bad_token() {
        let err = parse_instance("2 x 1").unwrap_err();
        assert!(matches!(err, ParseError::BadToken { .. }));
    }

    #[test]
    fn test_rejects_non_positive_capacity() {
        let err = parse_instance("2 1 1\n0\n").unwrap_err();
        assert!(matches!(err, ParseError::NonPositiveCapacity(0)));
    }
}
