//! Command implementations
//!
//! Every command returns `CliResult<ExitCode>`; printing and exiting is left to `cli::run()`.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use super::reporter::ConsoleReporter;
use super::{CliError, CliResult, ExitCode};
use crate::config::{AdapterConfig, resolve_config};
use crate::discovery::{DiscoveryError, DiscoveryReport, TestCase, collect_source_files, discover};
use crate::execution::{CancellationToken, ExecutionOrchestrator};

/// Exit status after Ctrl-C, as shells report SIGINT
const INTERRUPTED: i32 = 130;

/// `discover`: list the tests found in `paths`.
pub fn discover_tests(config_path: Option<&Path>, paths: &[PathBuf], json: bool) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let pattern = config
        .discovery
        .call_pattern()
        .map_err(|e| CliError::failure(format!("Error: {}", e)))?;
    let sources = collect_sources(paths, &config.discovery.extensions)?;

    let report = discover(&sources, &pattern);
    print_discovery_errors(&report.errors);

    if json {
        let rendered = serde_json::to_string_pretty(&report.cases)
            .map_err(|e| CliError::failure(format!("Error serializing test cases: {}", e)))?;
        println!("{}", rendered);
    } else {
        for case in &report.cases {
            println!(
                "{}:{}:{} {}",
                case.source_file.display(),
                case.line,
                case.column,
                case.display_name
            );
        }
    }

    if report.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

/// `run`: discover, filter by keyword and execute through the engine.
pub fn run_tests(
    config_path: Option<&Path>,
    paths: &[PathBuf],
    verbose: bool,
    filter: Option<&str>,
    engine_args: Vec<String>,
) -> CliResult<ExitCode> {
    let start_time = Instant::now();

    let config = load_config(config_path)?;
    let orchestrator = ExecutionOrchestrator::new(config)
        .map_err(|e| CliError::failure(format!("Error: {}", e)))?
        .with_engine_args(engine_args);
    let sources = collect_sources(paths, &orchestrator.config().discovery.extensions)?;

    let DiscoveryReport { cases, errors } = orchestrator.discover(&sources);
    print_discovery_errors(&errors);

    let cases: Vec<TestCase> = cases
        .into_iter()
        .filter(|case| filter.is_none_or(|keyword| case.display_name.contains(keyword)))
        .collect();

    if cases.is_empty() {
        eprintln!("No tests collected");
        return if errors.is_empty() {
            Ok(ExitCode::SUCCESS)
        } else {
            Err(CliError::new("", ExitCode::FAILURE))
        };
    }

    let mut reporter = ConsoleReporter::new(verbose);
    reporter.on_collection_complete(cases.len());

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::failure(format!("Error starting async runtime: {}", e)))?;
    let cancel = CancellationToken::new();
    let summary = runtime.block_on(async {
        let token = cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
        let summary = orchestrator.execute(&cases, &cancel, &mut reporter).await;
        interrupt.abort();
        summary
    });

    reporter.on_run_complete(&summary, start_time.elapsed());

    if summary.was_cancelled() {
        Err(CliError::with_code("Interrupted", INTERRUPTED))
    } else if summary.has_failures() || !errors.is_empty() {
        // Summary already printed
        Err(CliError::new("", ExitCode::FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn load_config(explicit: Option<&Path>) -> CliResult<AdapterConfig> {
    let cwd = env::current_dir().map_err(|e| CliError::failure(format!("Error reading working directory: {}", e)))?;
    let (config, path) = resolve_config(explicit, &cwd).map_err(|e| CliError::failure(format!("Error: {}", e)))?;
    match path {
        Some(path) => debug!("using config {}", path.display()),
        None => debug!("no config file, using defaults"),
    }
    Ok(config)
}

fn collect_sources(paths: &[PathBuf], extensions: &[String]) -> CliResult<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(CliError::failure(format!("Error: path not found: {}", path.display())));
        }
        sources.extend(collect_source_files(path, extensions));
    }
    if sources.is_empty() {
        return Err(CliError::failure(format!(
            "No script files found (extensions: {})",
            extensions.join(", ")
        )));
    }
    Ok(sources)
}

fn print_discovery_errors(errors: &[DiscoveryError]) {
    for error in errors {
        match error.report() {
            Some(report) => eprintln!("{:?}", miette::Report::new(report)),
            None => eprintln!("Error: {}", error),
        }
    }
}
