#![forbid(unsafe_code)]
//! CasperJS test adapter
//!
//! Finds `casper.test.begin('<name>', ...)` declarations in script files and runs them through
//! the PhantomJS/CasperJS engine, turning its text output back into per-test results.
//!
//! - [`discovery`] - parse scripts (via `casper_syntax`) and match the declaration call pattern
//! - [`execution`] - resolve `require`s, stage a workspace, run the engine, parse its output
//! - [`config`] - `casper-adapter.toml`
//! - [`cli`] - the `casper-adapter` binary
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod execution;

pub use config::{AdapterConfig, ConfigError};
pub use discovery::{CallPattern, DiscoveryReport, TestCase, discover};
pub use execution::{CancellationToken, ExecutionOrchestrator, ExecutionSummary, TestResult, TestSink};
