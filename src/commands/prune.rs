//! The module that implements the `wasmprune prune` command.

use crate::common::{read_module, write_module};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use wasmprune_dce::{CompiledFunc, DceConfig, SymbolTable, eliminate_dead_code};
use wasmprune_module::Module;
use wasmprune_wasm_opt::{Outcome, WasmOpt, WasmOptConfig};

/// Removes the functions of a module that its roots cannot reach.
///
/// Unreachable functions keep their slot in the module but their bodies are
/// replaced with `unreachable`, so every function index stays valid.
#[derive(Parser)]
pub struct PruneCommand {
    /// The path of the WebAssembly module to prune.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// CSV file with the call graph of the runtime library, one
    /// `caller,callee` record per line.
    #[arg(long, value_name = "CSV")]
    call_graph: PathBuf,

    /// A function compiled for this module; its calls are read from its body
    /// instead of the call graph, and it is always kept.
    #[arg(long = "compiled", value_name = "NAME")]
    compiled: Vec<String>,

    /// Keep the named function and everything it calls.
    #[arg(long = "keep", value_name = "NAME")]
    keep: Vec<String>,

    /// The path of the output module; stdout if absent or `-`.
    #[arg(short = 'o', long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Run `wasm-opt` over the pruned module, as if
    /// `EXPERIMENTAL_WASM_OPT` were set.
    #[arg(long)]
    wasm_opt: bool,
}

impl PruneCommand {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        let mut module = read_module(&self.input)?;
        let call_graph = std::fs::read(&self.call_graph).with_context(|| {
            format!(
                "failed to read call graph file: {}",
                self.call_graph.display()
            )
        })?;

        let symbols = SymbolTable::from_module(&module);
        let mut compiled = self
            .compiled
            .iter()
            .map(|name| {
                let index = symbols.resolve(name)?;
                let function = module
                    .defined_function(index)
                    .with_context(|| format!("failed to decode compiled function `{name}`"))?;
                Ok::<_, anyhow::Error>(CompiledFunc::new(name.as_str(), function))
            })
            .collect::<Result<Vec<_>>>()?;

        let config = DceConfig {
            extra_roots: self.keep,
        };
        let summary = eliminate_dead_code(
            &mut module,
            &mut compiled,
            &symbols,
            &call_graph,
            &config,
        )
        .context("failed to eliminate dead code")?;
        log::info!(
            "removed {} unreachable function bodies and {} names",
            summary.stubbed.len(),
            summary.names_removed
        );
        module
            .validate()
            .context("pruned module failed to validate")?;

        let mut opt_config = WasmOptConfig::from_env();
        opt_config.enabled |= self.wasm_opt;
        optimize_pruned(&mut module, opt_config);

        write_module(&module, self.output.as_deref())
    }
}

/// Run the optional `wasm-opt` pass over a pruned module. A failure leaves
/// `module` pruned but unoptimized and is only logged.
fn optimize_pruned(module: &mut Module, config: WasmOptConfig) {
    match WasmOpt::new(config).run(module) {
        Ok(Outcome::Optimized) => log::info!("optimized with wasm-opt"),
        Ok(_) => {}
        Err(e) => log::warn!(
            "wasm-opt pass failed, keeping the pruned module: {:#}",
            anyhow::Error::from(e)
        ),
    }
}
