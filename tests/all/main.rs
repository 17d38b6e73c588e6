mod optimize;
mod prune;

use std::path::{Path, PathBuf};

/// Assemble `wat` and write the module into `dir` as `name`.
pub(crate) fn write_wasm(dir: &Path, name: &str, wat: &str) -> anyhow::Result<PathBuf> {
    let _ = env_logger::try_init();
    let path = dir.join(name);
    std::fs::write(&path, wat::parse_str(wat)?)?;
    Ok(path)
}

/// Render a path as a command line argument.
pub(crate) fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}
