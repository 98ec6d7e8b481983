//! nilguard — a heuristic static analyzer that flags uses of nilable
//! function parameters not preceded by a guard in the same function.
//!
//! Parameters of nilable kind (pointers, slices, maps, interfaces, callables,
//! and records) are tracked per function, along with every nilable field
//! transitively reachable through record parameters. A *use* is any
//! operation that would dereference a tracked value; a *guard* is a nil
//! comparison, a slice-length comparison, or a type switch. Pairing is
//! lexical: a use is reported unless a guard of the same object appears at
//! an earlier source position in the same body. The trade-off is
//! intentional — the analyzer accepts false positives where control flow
//! would prove safety, and never attempts path-sensitive reasoning.
//!
//! Optionally, a whole-program call graph attaches feasible caller chains to
//! each finding so reports can be triaged by reachability.

pub mod analyze;
pub mod callgraph;
pub mod config;
pub mod driver;
pub mod params;
pub mod report;
pub mod shapes;
pub mod usage;

#[cfg(test)]
mod testutil;

pub use crate::{
    config::{Config, ConfigError, DEFAULT_MAX_PATH},
    driver::{AnalysisOptions, AnalysisOutcome, DriverError, SourceUnit, run_root, run_units},
    report::Marker,
    usage::ParamUsage,
};
