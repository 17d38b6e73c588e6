#![cfg(unix)]

use crate::{arg, write_wasm};
use anyhow::Result;
use clap::Parser;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use wasmprune_cli::commands::OptimizeCommand;

const MODULE: &str = r#"(module (func (export "f") (result i32) i32.const 1))"#;

fn fake_tool(dir: &Path, script: &str) -> Result<PathBuf> {
    let path = dir.join("wasm-opt");
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

#[test]
fn writes_the_tool_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_wasm(dir.path(), "in.wasm", MODULE)?;
    let optimized = write_wasm(dir.path(), "optimized.wasm", "(module)")?;
    let tool = fake_tool(
        dir.path(),
        &format!("cat > /dev/null\ncat {}", optimized.display()),
    )?;
    let output = dir.path().join("out.wasm");

    OptimizeCommand::try_parse_from([
        "optimize",
        arg(&input),
        "--program",
        arg(&tool),
        "-o",
        arg(&output),
    ])?
    .execute()?;

    assert_eq!(std::fs::read(&output)?, std::fs::read(&optimized)?);
    Ok(())
}

#[test]
fn missing_tool_copies_the_module() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_wasm(dir.path(), "in.wasm", MODULE)?;
    let output = dir.path().join("out.wasm");

    OptimizeCommand::try_parse_from([
        "optimize",
        arg(&input),
        "--program",
        arg(&dir.path().join("not-installed")),
        "-o",
        arg(&output),
    ])?
    .execute()?;

    assert_eq!(std::fs::read(&output)?, std::fs::read(&input)?);
    Ok(())
}

#[test]
fn failing_tool_is_an_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_wasm(dir.path(), "in.wasm", MODULE)?;
    let tool = fake_tool(dir.path(), "echo 'bad flag' >&2\nexit 1")?;
    let output = dir.path().join("out.wasm");

    let err = OptimizeCommand::try_parse_from([
        "optimize",
        arg(&input),
        "--program",
        arg(&tool),
        "-o",
        arg(&output),
    ])?
    .execute()
    .unwrap_err();
    assert!(format!("{err:#}").contains("bad flag"), "{err:#}");
    assert!(!output.exists());
    Ok(())
}
