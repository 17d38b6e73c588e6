use std::path::PathBuf;
use std::time::Duration;

/// Opts in to running `wasm-opt` with the default arguments.
pub const ENABLE_VAR: &str = "EXPERIMENTAL_WASM_OPT";

/// Opts in to running `wasm-opt` with the given space-separated arguments.
pub const ARGS_VAR: &str = "EXPERIMENTAL_WASM_OPT_ARGS";

/// Arguments used unless overridden: optimize, and keep the `name` section.
pub const DEFAULT_ARGS: &[&str] = &["-O2", "--debuginfo"];

/// How long `wasm-opt` may run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration of the `wasm-opt` pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmOptConfig {
    /// Whether the pass runs at all.
    pub enabled: bool,
    /// Replacement for [`DEFAULT_ARGS`].
    pub args: Option<Vec<String>>,
    /// The program to run, looked up in `PATH` unless it is a path itself.
    pub program: PathBuf,
    /// Deadline for the whole subprocess run.
    pub timeout: Duration,
}

impl Default for WasmOptConfig {
    fn default() -> WasmOptConfig {
        WasmOptConfig {
            enabled: false,
            args: None,
            program: PathBuf::from("wasm-opt"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl WasmOptConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> WasmOptConfig {
        WasmOptConfig::from_vars(|name| std::env::var(name).ok())
    }

    /// Read the configuration from `lookup`, which maps variable names to
    /// their values.
    ///
    /// A non-empty [`ENABLE_VAR`] enables the pass. A non-empty [`ARGS_VAR`]
    /// enables it too and replaces the argument list; it is split on single
    /// spaces.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> WasmOptConfig {
        let opted_in = lookup(ENABLE_VAR).is_some_and(|v| !v.is_empty());
        let args = lookup(ARGS_VAR)
            .filter(|v| !v.is_empty())
            .map(|v| v.split(' ').map(str::to_string).collect::<Vec<_>>());
        WasmOptConfig {
            enabled: opted_in || args.is_some(),
            args,
            ..WasmOptConfig::default()
        }
    }

    /// The full argument list: the configured or default arguments, followed
    /// by `-o -` so the result is written to stdout.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = match &self.args {
            Some(args) => args.clone(),
            None => DEFAULT_ARGS.iter().map(|s| s.to_string()).collect(),
        };
        args.push("-o".to_string());
        args.push("-".to_string());
        args
    }
}
