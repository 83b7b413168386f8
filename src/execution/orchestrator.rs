//! Per-file execution
//!
//! Test cases are grouped by source file. Each group is resolved, staged, run through the
//! engine and parsed on its own; a failing group is reported and the next one still runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::cancel::CancellationToken;
use super::process::{EngineCommand, ProcessError, ProcessRunner, StopReason};
use super::resolver::{DependencyResolver, ResolveError};
use super::result_stream::{ResultStreamParser, StreamEvent, TestResult};
use super::sink::{MessageLevel, TestSink};
use super::staging::{StagingError, StagingManager, StagingWorkspace};
use crate::config::{AdapterConfig, ConfigError};
use crate::discovery::{CallPattern, DiscoveryReport, TestCase, discover};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Completed { passed: usize, failed: usize },
    /// The file could not be parsed; nothing was run
    Skipped(String),
    /// Staging or the engine failed, or the engine reported a fatal error
    Failed(String),
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub source: PathBuf,
    pub outcome: GroupOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub groups: Vec<GroupReport>,
}

impl ExecutionSummary {
    pub fn passed(&self) -> usize {
        self.groups
            .iter()
            .map(|g| match g.outcome {
                GroupOutcome::Completed { passed, .. } => passed,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.groups
            .iter()
            .map(|g| match g.outcome {
                GroupOutcome::Completed { failed, .. } => failed,
                _ => 0,
            })
            .sum()
    }

    /// Any failed test, or any group that did not complete for a reason other than cancellation.
    pub fn has_failures(&self) -> bool {
        self.groups.iter().any(|g| match g.outcome {
            GroupOutcome::Completed { failed, .. } => failed > 0,
            GroupOutcome::Cancelled => false,
            _ => true,
        })
    }

    pub fn was_cancelled(&self) -> bool {
        self.groups.iter().any(|g| g.outcome == GroupOutcome::Cancelled)
    }
}

pub struct ExecutionOrchestrator {
    config: AdapterConfig,
    pattern: CallPattern,
    resolver: DependencyResolver,
    staging: StagingManager,
    runner: ProcessRunner,
    install_dir: PathBuf,
    engine_args: Vec<String>,
}

#[derive(Default)]
struct Tally {
    passed: usize,
    failed: usize,
}

impl ExecutionOrchestrator {
    pub fn new(config: AdapterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pattern = config.discovery.call_pattern()?;
        Ok(Self {
            pattern,
            resolver: DependencyResolver::new(&config.resolver),
            staging: StagingManager::new(config.staging_root()),
            runner: ProcessRunner::new(&config.engine),
            install_dir: config.engine.install_dir(),
            engine_args: Vec::new(),
            config,
        })
    }

    /// Extra caller flags passed to every engine invocation.
    pub fn with_engine_args(mut self, engine_args: Vec<String>) -> Self {
        self.engine_args = engine_args;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn discover(&self, sources: &[PathBuf]) -> DiscoveryReport {
        discover(sources, &self.pattern)
    }

    /// Discover tests in `sources` and run all of them. Files that fail discovery are
    /// reported to the sink and appear in the summary as skipped, in source order.
    pub async fn run_sources(
        &self,
        sources: &[PathBuf],
        cancel: &CancellationToken,
        sink: &mut dyn TestSink,
    ) -> ExecutionSummary {
        let report = self.discover(sources);
        let mut skipped = Vec::new();
        for error in &report.errors {
            sink.on_message(MessageLevel::Error, &error.to_string());
            skipped.push(GroupReport {
                source: error.path().to_path_buf(),
                outcome: GroupOutcome::Skipped(error.to_string()),
            });
        }
        let mut summary = self.execute(&report.cases, cancel, sink).await;
        summary.groups.extend(skipped);

        let mut position: HashMap<&Path, usize> = HashMap::new();
        for (index, source) in sources.iter().enumerate() {
            position.entry(source.as_path()).or_insert(index);
        }
        summary
            .groups
            .sort_by_key(|group| position.get(group.source.as_path()).copied().unwrap_or(usize::MAX));
        summary
    }

    /// Run `cases` one source file at a time, in order of first appearance.
    ///
    /// Cancellation is checked before each group and also stops the engine of the running one.
    pub async fn execute(
        &self,
        cases: &[TestCase],
        cancel: &CancellationToken,
        sink: &mut dyn TestSink,
    ) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();
        for (source, group) in group_by_source(cases) {
            if cancel.is_cancelled() {
                summary.groups.push(GroupReport {
                    source,
                    outcome: GroupOutcome::Cancelled,
                });
                continue;
            }

            let outcome = match self.run_group(&source, group, cancel, sink).await {
                Ok(outcome) => outcome,
                Err(ExecutionError::Resolve(error @ ResolveError::Parse { .. })) => {
                    sink.on_message(MessageLevel::Error, &error.to_string());
                    GroupOutcome::Skipped(error.to_string())
                }
                Err(error) => {
                    sink.on_message(MessageLevel::Error, &error.to_string());
                    GroupOutcome::Failed(error.to_string())
                }
            };
            info!(source = %source.display(), outcome = ?outcome, "group finished");
            summary.groups.push(GroupReport { source, outcome });
        }
        summary
    }

    #[tracing::instrument(skip_all, fields(source = %source.display(), tests = cases.len()))]
    async fn run_group(
        &self,
        source: &Path,
        cases: Vec<TestCase>,
        cancel: &CancellationToken,
        sink: &mut dyn TestSink,
    ) -> Result<GroupOutcome, ExecutionError> {
        let dependencies = self.resolver.resolve(source)?;
        let workspace = self.staging.stage(source, &dependencies)?;

        let outcome = self.run_staged(&workspace, cases, cancel, sink).await;

        let root = workspace.root().to_path_buf();
        if let Err(error) = workspace.dispose() {
            warn!("failed to remove staging directory {}: {}", root.display(), error);
        }
        outcome
    }

    async fn run_staged(
        &self,
        workspace: &StagingWorkspace,
        cases: Vec<TestCase>,
        cancel: &CancellationToken,
        sink: &mut dyn TestSink,
    ) -> Result<GroupOutcome, ExecutionError> {
        let command = EngineCommand::build(
            &self.config.engine,
            &self.install_dir,
            workspace.entry_file(),
            &self.engine_args,
        );
        let mut parser = ResultStreamParser::new(cases, self.config.protocol.clone());
        let mut tally = Tally::default();

        let exit = self
            .runner
            .run(&command, cancel, |line| {
                if !line.is_empty() {
                    sink.on_message(MessageLevel::Informational, line);
                }
                for event in parser.feed(line) {
                    deliver(event, &mut tally, sink);
                }
            })
            .await?;

        let tail = parser.finish();
        if let Some(result) = tail.last_result {
            let result = match exit.stopped {
                Some(StopReason::Cancelled) => result.interrupted("run cancelled"),
                Some(StopReason::TimedOut) => result.interrupted("engine timed out"),
                None => result,
            };
            deliver(StreamEvent::Finished(result), &mut tally, sink);
        }
        if !exit.stderr.trim().is_empty() {
            sink.on_message(MessageLevel::Warning, exit.stderr.trim_end());
        }
        if let Some(error) = &tail.execution_error {
            sink.on_message(MessageLevel::Error, error);
        }

        Ok(match (exit.stopped, tail.execution_error) {
            (Some(StopReason::Cancelled), _) => GroupOutcome::Cancelled,
            (Some(StopReason::TimedOut), _) => GroupOutcome::TimedOut,
            (None, Some(error)) => GroupOutcome::Failed(first_line(&error).to_string()),
            (None, None) => GroupOutcome::Completed {
                passed: tally.passed,
                failed: tally.failed,
            },
        })
    }
}

fn deliver(event: StreamEvent, tally: &mut Tally, sink: &mut dyn TestSink) {
    match event {
        StreamEvent::Started(case) => sink.on_test_start(&case),
        StreamEvent::Finished(result) => {
            count(&result, tally);
            sink.on_test_result(&result);
        }
    }
}

fn count(result: &TestResult, tally: &mut Tally) {
    if result.passed() {
        tally.passed += 1;
    } else {
        tally.failed += 1;
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

/// Cases grouped by source file, groups ordered by first appearance.
fn group_by_source(cases: &[TestCase]) -> Vec<(PathBuf, Vec<TestCase>)> {
    let mut groups: Vec<(PathBuf, Vec<TestCase>)> = Vec::new();
    let mut index: HashMap<&Path, usize> = HashMap::new();
    for case in cases {
        let slot = *index.entry(case.source_file.as_path()).or_insert_with(|| {
            groups.push((case.source_file.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(case.clone());
    }
    groups
}
