use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Failure of an active `wasm-opt` run. The module passed to
/// [`WasmOpt::run`](crate::WasmOpt::run) is left as it was.
#[derive(Error, Debug)]
pub enum OptimizeError {
    /// The runtime driving the subprocess could not be created.
    #[error("failed to create the async runtime")]
    Runtime(#[source] io::Error),

    /// The subprocess could not be started.
    #[error("start wasm-opt")]
    Spawn(#[source] io::Error),

    /// The module could not be written to the subprocess.
    #[error("write to wasm-opt")]
    Write(#[source] io::Error),

    /// The subprocess's output could not be read.
    #[error("read from wasm-opt")]
    Read(#[source] io::Error),

    /// Waiting for the subprocess to exit failed.
    #[error("wait for wasm-opt")]
    Wait(#[source] io::Error),

    /// The subprocess exited unsuccessfully.
    #[error("wasm-opt failed with {status}: {stderr}")]
    Exit {
        /// The exit status.
        status: ExitStatus,
        /// Everything the subprocess wrote to stderr.
        stderr: String,
    },

    /// The subprocess did not finish before the deadline and was killed.
    #[error("wasm-opt did not finish within {0:?}")]
    Timeout(Duration),

    /// The subprocess's output is not a valid module.
    #[error("decode module")]
    Decode(#[source] anyhow::Error),
}
