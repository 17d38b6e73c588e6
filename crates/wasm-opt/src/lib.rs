//! Optional post-processing of a module with Binaryen's `wasm-opt`.
//!
//! The pass is experimental and off by default. It is enabled through
//! [`WasmOptConfig`], usually read from the environment with
//! [`WasmOptConfig::from_env`]. When it is disabled or `wasm-opt` is not
//! installed, [`WasmOpt::run`] does nothing and says so in its [`Outcome`].

#![deny(missing_docs)]

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Once;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use wasmprune_module::Module;

mod config;
mod error;

pub use crate::config::{ARGS_VAR, DEFAULT_ARGS, DEFAULT_TIMEOUT, ENABLE_VAR, WasmOptConfig};
pub use crate::error::OptimizeError;

const WARNING: &str = "\
---------------------------------------------------------------
WARNING: running the EXPERIMENTAL wasm-opt pass. It is not
         supported and may be removed without notice.
---------------------------------------------------------------";

static PRINT_WARNING: Once = Once::new();

/// What [`WasmOpt::run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The pass is not enabled; nothing ran.
    Disabled,
    /// The program was not found; nothing ran.
    ToolNotFound,
    /// The module was replaced with `wasm-opt`'s output.
    Optimized,
}

/// Runs `wasm-opt` over modules.
#[derive(Debug, Clone, Default)]
pub struct WasmOpt {
    config: WasmOptConfig,
}

impl WasmOpt {
    /// Create a pass with the given configuration.
    pub fn new(config: WasmOptConfig) -> WasmOpt {
        WasmOpt { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &WasmOptConfig {
        &self.config
    }

    /// Pipe `module` through `wasm-opt` and replace it with the result.
    ///
    /// On error `module` is unchanged.
    pub fn run(&self, module: &mut Module) -> Result<Outcome, OptimizeError> {
        if !self.config.enabled {
            log::debug!("not opted in, skipping wasm-opt optimization");
            return Ok(Outcome::Disabled);
        }
        let path = std::env::var_os("PATH");
        let Some(program) = find_program(&self.config.program, path.as_deref()) else {
            log::debug!(
                "{} binary not found, skipping optimization",
                self.config.program.display()
            );
            return Ok(Outcome::ToolNotFound);
        };
        PRINT_WARNING.call_once(|| eprintln!("{WARNING}"));

        let input = module.encode();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(OptimizeError::Runtime)?;
        let output = runtime.block_on(self.pipe(&program, &input))?;

        let optimized = Module::parse(&output).map_err(OptimizeError::Decode)?;
        log::debug!(
            "wasm-opt turned {} bytes into {} bytes",
            input.len(),
            output.len()
        );
        *module = optimized;
        Ok(Outcome::Optimized)
    }

    /// Run `program` with `input` on stdin and return its stdout.
    ///
    /// Stdin is fed while stdout and stderr are drained, so a child that
    /// starts writing before it has read all of its input cannot deadlock
    /// against us. The deadline covers the child's entire lifetime.
    async fn pipe(&self, program: &Path, input: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        let args = self.config.command_args();
        log::debug!("running {} {}", program.display(), args.join(" "));

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(OptimizeError::Spawn)?;

        let (Some(mut stdin), Some(mut stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(OptimizeError::Spawn(io::Error::other(
                "child process is missing a pipe",
            )));
        };

        let write = async move {
            match stdin.write_all(input).await {
                // The exit status tells why the child stopped reading.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    log::debug!("wasm-opt closed its input early");
                    Ok(())
                }
                result => result.map_err(OptimizeError::Write),
            }
        };
        let read_stdout = async move {
            let mut buf = Vec::new();
            stdout
                .read_to_end(&mut buf)
                .await
                .map_err(OptimizeError::Read)?;
            Ok::<_, OptimizeError>(buf)
        };
        let read_stderr = async move {
            let mut buf = Vec::new();
            stderr
                .read_to_end(&mut buf)
                .await
                .map_err(OptimizeError::Read)?;
            Ok::<_, OptimizeError>(buf)
        };
        let run = async {
            let ((), stdout, stderr) = tokio::try_join!(write, read_stdout, read_stderr)?;
            let status = child.wait().await.map_err(OptimizeError::Wait)?;
            Ok::<_, OptimizeError>((status, stdout, stderr))
        };

        let result = tokio::time::timeout(self.config.timeout, run).await;
        let (status, stdout, stderr) = match result {
            Ok(result) => result?,
            Err(_) => {
                log::debug!("wasm-opt timed out, killing it");
                if let Err(e) = child.kill().await {
                    log::debug!("failed to kill wasm-opt: {e}");
                }
                return Err(OptimizeError::Timeout(self.config.timeout));
            }
        };

        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        if !stderr.is_empty() {
            log::debug!("wasm-opt debug output: {stderr}");
        }
        if !status.success() {
            return Err(OptimizeError::Exit { status, stderr });
        }
        Ok(stdout)
    }
}

/// Locate `program`: paths are used as they are, bare names are searched
/// for in the directories of `path`, the value of `PATH`.
fn find_program(program: &Path, path: Option<&OsStr>) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    std::env::split_paths(path?).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        let with_suffix = candidate.with_extension(std::env::consts::EXE_EXTENSION);
        (!std::env::consts::EXE_EXTENSION.is_empty() && with_suffix.is_file())
            .then_some(with_suffix)
    })
}
