//! The `wasmprune` command line tool.
//!
//! Removes dead functions from compiled policy modules.
//! See `wasmprune --help` for usage.

use anyhow::Result;
use clap::Parser;

/// Dead function elimination for WebAssembly modules
#[derive(Parser)]
#[command(
    name = "wasmprune",
    version = version(),
    after_help = "Usage examples:\n\
                  \n\
                  Pruning a module whose runtime library calls are listed in a CSV file:\n\
                  \n  \
                  wasmprune prune policy.wasm --call-graph callgraph.csv --compiled eval -o out.wasm\n\
                  \n\
                  Logging what the pass does:\n\
                  \n  \
                  WASMPRUNE_LOG=debug wasmprune prune policy.wasm --call-graph callgraph.csv\n"
)]
struct Wasmprune {
    #[command(subcommand)]
    subcommand: Subcommand,
}

/// If WASMPRUNE_VERSION_INFO is set, use it, otherwise use CARGO_PKG_VERSION.
fn version() -> &'static str {
    option_env!("WASMPRUNE_VERSION_INFO").unwrap_or(env!("CARGO_PKG_VERSION"))
}

#[derive(Parser)]
enum Subcommand {
    /// Removes unreachable functions from a module
    Prune(wasmprune_cli::commands::PruneCommand),

    /// Runs wasm-opt over a module
    Optimize(wasmprune_cli::commands::OptimizeCommand),
}

impl Wasmprune {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        wasmprune_cli::init_logging()?;
        match self.subcommand {
            Subcommand::Prune(c) => c.execute(),
            Subcommand::Optimize(c) => c.execute(),
        }
    }
}

fn main() -> Result<()> {
    return Wasmprune::parse().execute();
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Wasmprune::command().debug_assert()
}
