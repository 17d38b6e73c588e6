//! The wasmprune command line interface (CLI) crate.
//!
//! This crate implements the `wasmprune` command line tool, which removes
//! unreachable functions from compiled policy modules and optionally hands
//! the result to Binaryen's `wasm-opt`.

#![deny(missing_docs)]

use anyhow::{Result, anyhow};

pub mod commands;

pub(crate) mod common;

/// Install the process-wide logger.
///
/// Log output goes to stderr and is filtered with the directives in the
/// `WASMPRUNE_LOG` environment variable, e.g. `WASMPRUNE_LOG=debug`.
/// Records emitted through the `log` crate are forwarded as well.
pub fn init_logging() -> Result<()> {
    use std::io::IsTerminal;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_env("WASMPRUNE_LOG"))
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
        .map_err(|e| anyhow!(e))
}
