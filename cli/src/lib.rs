//! Command line front end of the `offload` solver: instance parsing,
//! KPI/solution writers and the argument surface.

pub mod cli;
pub mod output;
pub mod parser;
