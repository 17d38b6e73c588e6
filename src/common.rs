//! Input and output shared by the commands.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use wasmprune_module::Module;

/// Read and decode the module at `path`.
pub(crate) fn read_module(path: &Path) -> Result<Module> {
    let wasm = std::fs::read(path)
        .with_context(|| format!("failed to read input file: {}", path.display()))?;
    Module::parse(&wasm).with_context(|| format!("failed to decode module: {}", path.display()))
}

/// Encode `module` and write it to `output`, or to stdout when `output` is
/// absent or `-`.
pub(crate) fn write_module(module: &Module, output: Option<&Path>) -> Result<()> {
    let wasm = module.encode();
    match output {
        Some(path) if path != Path::new("-") => std::fs::write(path, &wasm)
            .with_context(|| format!("failed to write output file: {}", path.display())),
        _ => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&wasm)
                .and_then(|()| stdout.flush())
                .context("failed to write module to stdout")
        }
    }
}
