//! Runs the pass against small shell scripts standing in for `wasm-opt`.

#![cfg(unix)]

use anyhow::Result;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use wasmprune_module::Module;
use wasmprune_wasm_opt::{OptimizeError, Outcome, WasmOpt, WasmOptConfig};

const MODULE: &str = r#"
(module
  (func $add (export "add") (param i32 i32) (result i32)
    local.get 0
    local.get 1
    i32.add))
"#;

fn fake_tool(dir: &Path, name: &str, script: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn config(program: PathBuf) -> WasmOptConfig {
    WasmOptConfig {
        enabled: true,
        program,
        ..WasmOptConfig::default()
    }
}

fn module() -> Result<(Module, Vec<u8>)> {
    let _ = env_logger::try_init();
    let wasm = wat::parse_str(MODULE)?;
    Ok((Module::parse(&wasm)?, wasm))
}

#[test]
fn output_replaces_the_module() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (mut module, _) = module()?;

    let optimized = wat::parse_str(
        r#"(module (func (export "add") (param i32 i32) (result i32) i32.const 0))"#,
    )?;
    let output = dir.path().join("optimized.wasm");
    std::fs::write(&output, &optimized)?;
    let tool = fake_tool(
        dir.path(),
        "wasm-opt",
        &format!("cat > /dev/null\ncat {}", output.display()),
    )?;

    let outcome = WasmOpt::new(config(tool)).run(&mut module)?;
    assert_eq!(outcome, Outcome::Optimized);
    assert_eq!(module.encode(), optimized);
    module.validate()?;
    Ok(())
}

#[test]
fn arguments_end_with_stdout_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("args");
    let tool = fake_tool(
        dir.path(),
        "wasm-opt",
        &format!("printf '%s\\n' \"$*\" > {}\ncat", log.display()),
    )?;
    let (mut module, _) = module()?;

    WasmOpt::new(config(tool.clone())).run(&mut module)?;
    assert_eq!(std::fs::read_to_string(&log)?, "-O2 --debuginfo -o -\n");

    let custom = WasmOptConfig {
        args: Some(vec!["-Oz".to_string()]),
        ..config(tool)
    };
    WasmOpt::new(custom).run(&mut module)?;
    assert_eq!(std::fs::read_to_string(&log)?, "-Oz -o -\n");
    Ok(())
}

#[test]
fn slow_tool_times_out_and_keeps_the_module() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let tool = fake_tool(dir.path(), "wasm-opt", "exec sleep 30")?;
    let (mut module, wasm) = module()?;

    let pass = WasmOpt::new(WasmOptConfig {
        timeout: Duration::from_millis(200),
        ..config(tool)
    });
    let start = Instant::now();
    let err = pass.run(&mut module).unwrap_err();
    assert!(matches!(err, OptimizeError::Timeout(_)), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(module.encode(), wasm);
    Ok(())
}

#[test]
fn failing_tool_reports_its_stderr() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let tool = fake_tool(dir.path(), "wasm-opt", "echo 'unknown option' >&2\nexit 3")?;
    let (mut module, wasm) = module()?;

    let err = WasmOpt::new(config(tool)).run(&mut module).unwrap_err();
    match err {
        OptimizeError::Exit { status, stderr } => {
            assert_eq!(status.code(), Some(3));
            assert_eq!(stderr, "unknown option\n");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(module.encode(), wasm);
    Ok(())
}

#[test]
fn garbage_output_fails_to_decode() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let tool = fake_tool(dir.path(), "wasm-opt", "cat > /dev/null\necho 'not wasm'")?;
    let (mut module, wasm) = module()?;

    let err = WasmOpt::new(config(tool)).run(&mut module).unwrap_err();
    assert!(matches!(err, OptimizeError::Decode(_)), "{err:?}");
    assert_eq!(module.encode(), wasm);
    Ok(())
}

#[test]
fn disabled_pass_never_spawns() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("spawned");
    let tool = fake_tool(
        dir.path(),
        "wasm-opt",
        &format!("touch {}\ncat", marker.display()),
    )?;
    let (mut module, wasm) = module()?;

    let config = WasmOptConfig {
        program: tool,
        ..WasmOptConfig::from_vars(|_| None)
    };
    assert_eq!(WasmOpt::new(config).run(&mut module)?, Outcome::Disabled);
    assert!(!marker.exists());
    assert_eq!(module.encode(), wasm);
    Ok(())
}
