use crate::{arg, write_wasm};
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use wasmprune_cli::commands::PruneCommand;
use wasmprune_module::{FuncIndex, Module};

const POLICY: &str = r#"
(module
  (import "env" "opa_abort" (func $opa_abort (param i32)))
  (import "env" "memory" (memory 1))
  (func $opa_malloc (param i32) (result i32)
    local.get 0)
  (func $opa_strlen (param i32) (result i32)
    local.get 0
    call $opa_malloc)
  (func $opa_json_dump (param i32) (result i32)
    local.get 0
    call $opa_strlen)
  (func $eval (param i32) (result i32)
    local.get 0
    call $opa_strlen)
  (func $entrypoint (export "opa_eval") (param i32) (result i32)
    local.get 0
    call $eval)
)
"#;

const CALL_GRAPH: &str = "\
opa_strlen,opa_malloc
opa_json_dump,opa_strlen
eval,opa_json_dump
entrypoint,eval
";

/// Whether the function called `name` in the input lost its body. Stubbed
/// functions also lose their name.
fn is_stub(module: &Module, name: &str) -> Result<bool> {
    let index = (0..module.num_funcs() as u32)
        .map(FuncIndex::from_u32)
        .find(|f| module.names().function_name(*f) == Some(name));
    match index {
        Some(index) => Ok(module.defined_function(index)?.is_trap_stub()),
        None => Ok(true),
    }
}

fn setup(dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let input = write_wasm(dir, "policy.wasm", POLICY)?;
    let csv = dir.join("callgraph.csv");
    std::fs::write(&csv, CALL_GRAPH)?;
    Ok((input, csv))
}

#[test]
fn prunes_with_compiled_bodies() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (input, csv) = setup(dir.path())?;
    let output = dir.path().join("out.wasm");

    PruneCommand::try_parse_from([
        "prune",
        arg(&input),
        "--call-graph",
        arg(&csv),
        "--compiled",
        "eval",
        "-o",
        arg(&output),
    ])?
    .execute()?;

    let wasm = std::fs::read(&output)?;
    wasmparser::Validator::new().validate_all(&wasm)?;
    let module = Module::parse(&wasm)?;
    assert_eq!(module.num_funcs(), 6);

    // The body of `eval` only calls `opa_strlen`, its CSV edge is superseded.
    assert!(is_stub(&module, "opa_json_dump")?);
    for live in ["entrypoint", "eval", "opa_strlen", "opa_malloc"] {
        assert!(!is_stub(&module, live)?, "{live} was stubbed");
    }
    Ok(())
}

#[test]
fn call_graph_edges_apply_without_compiled_functions() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (input, csv) = setup(dir.path())?;
    let output = dir.path().join("out.wasm");

    PruneCommand::try_parse_from([
        "prune",
        arg(&input),
        "--call-graph",
        arg(&csv),
        "--output",
        arg(&output),
    ])?
    .execute()?;

    let module = Module::parse(&std::fs::read(&output)?)?;
    assert!(!is_stub(&module, "opa_json_dump")?);
    Ok(())
}

#[test]
fn kept_functions_survive() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_wasm(
        dir.path(),
        "lib.wasm",
        r#"(module (func $a) (func $b) (func $c (export "c")))"#,
    )?;
    let csv = dir.path().join("callgraph.csv");
    std::fs::write(&csv, "")?;
    let output = dir.path().join("out.wasm");

    PruneCommand::try_parse_from([
        "prune",
        arg(&input),
        "--call-graph",
        arg(&csv),
        "--keep",
        "b",
        "-o",
        arg(&output),
    ])?
    .execute()?;

    let module = Module::parse(&std::fs::read(&output)?)?;
    assert!(is_stub(&module, "a")?);
    assert!(!is_stub(&module, "b")?);
    assert!(!is_stub(&module, "c")?);
    Ok(())
}

#[test]
fn unknown_compiled_function_fails_without_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (input, csv) = setup(dir.path())?;
    let output = dir.path().join("out.wasm");

    let err = PruneCommand::try_parse_from([
        "prune",
        arg(&input),
        "--call-graph",
        arg(&csv),
        "--compiled",
        "no_such_function",
        "-o",
        arg(&output),
    ])?
    .execute()
    .unwrap_err();
    assert!(format!("{err:#}").contains("no_such_function"), "{err:#}");
    assert!(!output.exists());
    Ok(())
}

#[test]
fn missing_call_graph_names_the_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (input, _) = setup(dir.path())?;
    let csv = dir.path().join("missing.csv");

    let err = PruneCommand::try_parse_from(["prune", arg(&input), "--call-graph", arg(&csv)])?
        .execute()
        .unwrap_err();
    assert!(err.to_string().contains("missing.csv"), "{err:#}");
    Ok(())
}

#[test]
fn call_graph_is_required() {
    assert!(PruneCommand::try_parse_from(["prune", "policy.wasm"]).is_err());
}

#[test]
fn compiled_bodies_may_use_any_operator() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = write_wasm(
        dir.path(),
        "policy.wasm",
        r#"
(module
  (func $helper (param i64) (result i32)
    local.get 0
    i64.eqz)
  (func $tail (param i64) (result i32)
    i32.const 1)
  (func $dead (result i32)
    i32.const 0)
  (func $eval (export "eval") (param i64) (result i32)
    local.get 0
    call $helper
    drop
    local.get 0
    i64.const 3
    i64.le_s
    drop
    local.get 0
    return_call $tail))
"#,
    )?;
    let csv = dir.path().join("callgraph.csv");
    std::fs::write(&csv, "")?;
    let output = dir.path().join("out.wasm");

    PruneCommand::try_parse_from([
        "prune",
        arg(&input),
        "--call-graph",
        arg(&csv),
        "--compiled",
        "eval",
        "-o",
        arg(&output),
    ])?
    .execute()?;

    let wasm = std::fs::read(&output)?;
    wasmparser::Validator::new().validate_all(&wasm)?;
    let module = Module::parse(&wasm)?;
    assert!(!is_stub(&module, "helper")?);
    assert!(!is_stub(&module, "tail")?);
    assert!(is_stub(&module, "dead")?);
    Ok(())
}
