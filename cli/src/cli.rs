//! Command line interface.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use offload::verify;
use offload::SolveParams;

use crate::output;
use crate::parser::{self, ParseError};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "offload",
    version,
    about = "Heuristic solver assigning mobile users to cell activity demands.",
    long_about = None
)]
pub struct Args {
    /// Instance to solve.
    #[arg(value_name = "InputFile")]
    pub input: PathBuf,

    /// File the KPI summary line is appended to.
    #[arg(value_name = "OutputFile")]
    pub output: PathBuf,

    /// Where to dump the assignment, one line per positive entry.
    #[arg(value_name = "SolutionFile")]
    pub solution: Option<PathBuf>,

    /// Check the produced solution against the instance and print the verdict.
    #[arg(long)]
    pub test: bool,

    /// Wall-clock budget in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    pub time: u64,

    /// Seed of the master random generator. Runs are reproducible for a
    /// fixed seed; vary it to diversify the search.
    #[arg(long, value_name = "SEED", default_value_t = 0)]
    pub seed: u64,

    /// Number of search workers.
    #[arg(long, value_name = "N", default_value_t = offload::DEFAULT_WORKERS)]
    pub threads: usize,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    InputIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    InputFormat {
        path: String,
        #[source]
        source: ParseError,
    },
    #[error("cannot write {path}: {source}")]
    OutputIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// The process exit code the failure maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InputIo { .. } | CliError::InputFormat { .. } => -2,
            CliError::OutputIo { .. } => -3,
        }
    }
}

/// Solves the instance and writes the requested outputs.
pub fn run(args: &Args) -> Result<(), CliError> {
    let content = fs::read_to_string(&args.input).map_err(|source| CliError::InputIo {
        path: args.input.display().to_string(),
        source,
    })?;
    let pb = parser::parse_instance(&content).map_err(|source| CliError::InputFormat {
        path: args.input.display().to_string(),
        source,
    })?;

    let params = SolveParams {
        budget: Duration::from_millis(args.time),
        workers: args.threads,
        seed: args.seed,
    };
    let outcome = offload::solve(&pb, &params);

    let name = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.display().to_string());
    output::append_kpi(&args.output, &name, &outcome).map_err(|source| CliError::OutputIo {
        path: args.output.display().to_string(),
        source,
    })?;
    if let Some(path) = &args.solution {
        output::write_solution(path, &pb, &outcome).map_err(|source| CliError::OutputIo {
            path: path.display().to_string(),
            source,
        })?;
    }

    if args.test {
        println!("{}", verify::check(&pb, &outcome));
    }
    Ok(())
}
