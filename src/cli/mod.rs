//! Command-line interface for the CasperJS adapter
//!
//! ## Commands
//!
//! - `discover <path>...` - List test declarations found in script files
//! - `run <path>... [-- <engine args>...]` - Run the discovered tests through the engine
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `reporter` - Console output for test runs
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod reporter;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self::new(message, ExitCode(code))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Discover and run CasperJS test suites
#[derive(Parser, Debug)]
#[command(name = "casper-adapter")]
#[command(version = VERSION)]
#[command(about = "Discover and run CasperJS test suites", long_about = None)]
pub struct Cli {
    /// Configuration file (default: casper-adapter.toml in the working directory or a parent)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List test declarations
    Discover {
        /// Script files or directories
        #[arg(value_name = "PATH", default_value = ".")]
        paths: Vec<PathBuf>,
        /// Print a JSON array instead of one line per test
        #[arg(long)]
        json: bool,
    },

    /// Run tests through the engine
    Run {
        /// Script files or directories
        #[arg(value_name = "PATH", default_value = ".")]
        paths: Vec<PathBuf>,
        /// Verbose output (echo engine output)
        #[arg(short, long)]
        verbose: bool,
        /// Only run tests whose name contains this keyword
        #[arg(short = 'k', value_name = "EXPR")]
        filter: Option<String>,
        /// Flags for the engine and harness, after `--`
        #[arg(last = true, value_name = "ENGINE_ARGS")]
        engine_args: Vec<String>,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Discover { paths, json } => commands::discover_tests(config, &paths, json),
        Command::Run {
            paths,
            verbose,
            filter,
            engine_args,
        } => commands::run_tests(config, &paths, verbose, filter.as_deref(), engine_args),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_discover() {
        let cli = Cli::try_parse_from(["casper-adapter", "discover", "tests/", "--json"]).unwrap();
        if let Command::Discover { paths, json } = cli.command {
            assert_eq!(paths, vec![PathBuf::from("tests/")]);
            assert!(json);
        } else {
            panic!("Expected Discover command");
        }
    }

    #[test]
    fn test_cli_parse_defaults_to_current_dir() {
        let cli = Cli::try_parse_from(["casper-adapter", "run"]).unwrap();
        if let Command::Run {
            paths, engine_args, ..
        } = cli.command
        {
            assert_eq!(paths, vec![PathBuf::from(".")]);
            assert!(engine_args.is_empty());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_with_engine_args() {
        let cli = Cli::try_parse_from([
            "casper-adapter",
            "run",
            "a.js",
            "b.js",
            "-v",
            "-k",
            "login",
            "--",
            "--proxy=127.0.0.1:8080",
            "--verbose",
        ])
        .unwrap();
        if let Command::Run {
            paths,
            verbose,
            filter,
            engine_args,
        } = cli.command
        {
            assert_eq!(paths.len(), 2);
            assert!(verbose);
            assert_eq!(filter.as_deref(), Some("login"));
            assert_eq!(engine_args, vec!["--proxy=127.0.0.1:8080", "--verbose"]);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_global_config() {
        let cli = Cli::try_parse_from(["casper-adapter", "discover", "--config", "ci.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["casper-adapter"]).is_err());
    }
}
