//! Whole-program dead function elimination.
//!
//! A policy module embeds a large runtime library next to a handful of
//! freshly compiled entry points, and most of the runtime is never called.
//! This crate finds the functions reachable from the module's roots and
//! replaces the bodies of all other functions with a single `unreachable`.
//!
//! The pass runs in four phases:
//!
//! 1. [`CallGraph::from_builtin_csv`] and [`CallGraph::add_compiled`] build
//!    the call graph,
//! 2. [`collect_roots`] gathers the functions that are always kept,
//! 3. [`compute_reachable`] computes their closure over the call graph, and
//! 4. [`prune`] rewrites the module.
//!
//! [`eliminate_dead_code`] runs all of them.

#![deny(missing_docs)]

use wasmprune_module::{Function, Module};

mod call_graph;
mod error;
mod prune;
mod reach;
mod roots;
mod symbols;

pub use crate::call_graph::{CallGraph, find_callees, unescape_name};
pub use crate::error::{DceError, Role, UnescapeError};
pub use crate::prune::{PruneSummary, prune};
pub use crate::reach::{ReachableSet, compute_reachable};
pub use crate::roots::collect_roots;
pub use crate::symbols::SymbolTable;

/// A function compiled for the current unit, before it is placed in the
/// module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunc {
    /// The function's symbolic name, as known to the [`SymbolTable`].
    pub name: String,
    /// Its body.
    pub function: Function,
}

impl CompiledFunc {
    /// Create a compiled function.
    pub fn new(name: impl Into<String>, function: Function) -> CompiledFunc {
        CompiledFunc {
            name: name.into(),
            function,
        }
    }
}

/// Configuration for dead code elimination.
#[derive(Debug, Clone, Default)]
pub struct DceConfig {
    /// Names of additional functions to keep, along with everything they
    /// call.
    pub extra_roots: Vec<String>,
}

/// Eliminate every function of `module` that cannot be reached from its
/// roots.
///
/// `builtin_csv` is the runtime library's call graph. Every name it mentions,
/// and the name of every function in `compiled`, must resolve through
/// `symbols`. Unreachable entries are removed from `compiled`.
///
/// On error, `module` and `compiled` are left unchanged.
pub fn eliminate_dead_code(
    module: &mut Module,
    compiled: &mut Vec<CompiledFunc>,
    symbols: &SymbolTable,
    builtin_csv: &[u8],
    config: &DceConfig,
) -> Result<PruneSummary, DceError> {
    log::debug!("Building the call graph");
    let mut graph = CallGraph::from_builtin_csv(builtin_csv, symbols)?;
    graph.add_compiled(compiled, symbols)?;

    log::debug!("Collecting roots");
    let roots = collect_roots(module, compiled, symbols, &config.extra_roots)?;

    log::debug!("Computing reachable functions");
    let reachable = compute_reachable(&graph, roots);

    log::debug!("Pruning unreachable functions");
    let summary = prune(module, compiled, symbols, &reachable)?;

    log::info!(
        "{} of {} functions are reachable, stubbed {} bodies",
        summary.reachable,
        summary.functions,
        summary.stubbed.len()
    );
    Ok(summary)
}
