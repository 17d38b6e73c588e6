//! The module that implements the `wasmprune optimize` command.

use crate::common::{read_module, write_module};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use wasmprune_wasm_opt::{Outcome, WasmOpt, WasmOptConfig};

/// Pipes a module through Binaryen's `wasm-opt`.
///
/// The arguments default to `-O2 --debuginfo` and are taken from
/// `EXPERIMENTAL_WASM_OPT_ARGS` when it is set. If `wasm-opt` cannot be
/// found the module is written out unchanged.
#[derive(Parser)]
pub struct OptimizeCommand {
    /// The path of the WebAssembly module to optimize.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// The path of the output module; stdout if absent or `-`.
    #[arg(short = 'o', long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// The `wasm-opt` program to run.
    #[arg(long, value_name = "PROGRAM", default_value = "wasm-opt")]
    program: PathBuf,

    /// Seconds `wasm-opt` may run before it is killed.
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    timeout: u64,
}

impl OptimizeCommand {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        let mut module = read_module(&self.input)?;

        let config = WasmOptConfig {
            enabled: true,
            program: self.program,
            timeout: Duration::from_secs(self.timeout),
            ..WasmOptConfig::from_env()
        };
        match WasmOpt::new(config)
            .run(&mut module)
            .context("failed to run wasm-opt")?
        {
            Outcome::ToolNotFound => {
                log::warn!("wasm-opt not found, module left unchanged");
            }
            Outcome::Disabled | Outcome::Optimized => {}
        }

        write_module(&module, self.output.as_deref())
    }
}
