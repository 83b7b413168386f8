//! End-to-end execution against a stand-in engine
//!
//! The engine binary is `/bin/sh` and the "bootstrap script" is a shell script, so the full
//! argument vector (`<bootstrap> --casper-path=... --cli ... test <staged file> ...`) reaches a
//! script that prints the result protocol.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use casper_adapter::config::AdapterConfig;
use casper_adapter::discovery::TestCase;
use casper_adapter::execution::{
    CancellationToken, EngineCommand, ExecutionOrchestrator, GroupOutcome, MessageLevel, Outcome, ProcessError,
    ProcessRunner, RecordingSink, StopReason, TestResult, TestSink,
};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    install: PathBuf,
    staging: PathBuf,
    suite: PathBuf,
}

fn write(path: &Path, text: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
    path.to_path_buf()
}

/// Install dir with a shell "bootstrap" and a suite directory.
fn fixture(engine_script: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let install = dir.path().join("install");
    let staging = dir.path().join("staging");
    let suite = dir.path().join("suite");
    write(&install.join("CasperJs/bin/bootstrap.js"), engine_script);
    Fixture {
        _dir: dir,
        install,
        staging,
        suite,
    }
}

fn config(fx: &Fixture) -> AdapterConfig {
    let mut config = AdapterConfig::default();
    config.engine.binary = PathBuf::from("/bin/sh");
    config.engine.install_dir = Some(fx.install.clone());
    config.engine.kill_grace_ms = 200;
    config.staging.root = Some(fx.staging.clone());
    config
}

fn cases(file: &Path, names: &[&str]) -> Vec<TestCase> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| TestCase::new(file, *name, i + 1, 0))
        .collect()
}

fn staging_is_empty(fx: &Fixture) -> bool {
    fs::read_dir(&fx.staging).map(|mut d| d.next().is_none()).unwrap_or(true)
}

const REPORTING_ENGINE: &str = r##"
for arg in "$@"; do
  if [ "$prev" = "test" ]; then entry="$arg"; fi
  prev="$arg"
done
echo "# logs in"
echo "PASS logged in"
echo "# shows the dashboard"
if [ -f "$(dirname "$entry")/lib/helpers.js" ]; then
  echo "FAIL dashboard missing"
else
  echo "FAIL helpers were not staged"
fi
echo ""
echo "   "
echo "# not a discovered test"
echo "PASS stray"
echo "engine noise" >&2
"##;

#[tokio::test]
async fn results_are_attributed_and_workspace_is_removed() {
    let fx = fixture(REPORTING_ENGINE);
    let entry = write(
        &fx.suite.join("login.js"),
        "var helpers = require('./lib/helpers');\ncasper.test.begin('logs in');\ncasper.test.begin('shows the dashboard');\n",
    );
    write(&fx.suite.join("lib/helpers.js"), "module.exports = {};\n");

    let orchestrator = ExecutionOrchestrator::new(config(&fx)).unwrap();
    let mut sink = RecordingSink::new();
    let summary = orchestrator
        .execute(&cases(&entry, &["logs in", "shows the dashboard"]), &CancellationToken::new(), &mut sink)
        .await;

    assert_eq!(
        summary.groups[0].outcome,
        GroupOutcome::Completed { passed: 1, failed: 1 }
    );
    assert_eq!(sink.started.len(), 2);
    let outcomes: Vec<(&str, Outcome)> = sink
        .results
        .iter()
        .map(|r| (r.test_case.display_name.as_str(), r.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![("logs in", Outcome::Passed), ("shows the dashboard", Outcome::Failed)]
    );
    assert_eq!(sink.results[1].error_message.as_deref(), Some("FAIL dashboard missing"));

    let info: Vec<&str> = sink.messages_at(MessageLevel::Informational).collect();
    assert!(info.contains(&"PASS logged in"));
    assert!(!info.contains(&""));
    assert!(info.contains(&"   "));
    let warnings: Vec<&str> = sink.messages_at(MessageLevel::Warning).collect();
    assert_eq!(warnings, vec!["engine noise"]);

    assert!(staging_is_empty(&fx));
}

#[tokio::test]
async fn fatal_engine_error_is_one_execution_error() {
    let fx = fixture("echo '# a'\necho 'CasperError: cannot open page'\necho '    at login.js:3'\necho 'FAIL ignored'\n");
    let entry = write(&fx.suite.join("a.js"), "casper.test.begin('a');\n");

    let orchestrator = ExecutionOrchestrator::new(config(&fx)).unwrap();
    let mut sink = RecordingSink::new();
    let summary = orchestrator
        .execute(&cases(&entry, &["a"]), &CancellationToken::new(), &mut sink)
        .await;

    assert_eq!(
        summary.groups[0].outcome,
        GroupOutcome::Failed("CasperError: cannot open page".to_string())
    );
    assert_eq!(sink.results.len(), 1);
    assert!(sink.results[0].passed());
    let errors: Vec<&str> = sink.messages_at(MessageLevel::Error).collect();
    assert_eq!(
        errors,
        vec!["CasperError: cannot open page\n    at login.js:3\nFAIL ignored"]
    );
}

#[tokio::test]
async fn unparsable_group_is_skipped_and_next_group_runs() {
    let fx = fixture("echo '# ok'\n");
    let broken = write(&fx.suite.join("broken.js"), "casper.test.begin('x');\nvar = ;\n");
    let ok = write(&fx.suite.join("ok.js"), "casper.test.begin('ok');\n");

    let mut all = cases(&broken, &["x"]);
    all.extend(cases(&ok, &["ok"]));

    let orchestrator = ExecutionOrchestrator::new(config(&fx)).unwrap();
    let mut sink = RecordingSink::new();
    let summary = orchestrator.execute(&all, &CancellationToken::new(), &mut sink).await;

    assert_eq!(summary.groups.len(), 2);
    assert!(matches!(summary.groups[0].outcome, GroupOutcome::Skipped(ref reason) if reason.contains("line 2")));
    assert_eq!(
        summary.groups[1].outcome,
        GroupOutcome::Completed { passed: 1, failed: 0 }
    );
    assert!(sink.messages_at(MessageLevel::Error).any(|m| m.contains("broken.js")));
}

#[tokio::test]
async fn missing_engine_fails_the_group_with_a_diagnostic() {
    let fx = fixture("");
    let entry = write(&fx.suite.join("a.js"), "casper.test.begin('a');\n");
    let mut config = config(&fx);
    config.engine.binary = fx.install.join("PhantomJs/phantomjs");

    let orchestrator = ExecutionOrchestrator::new(config).unwrap();
    let mut sink = RecordingSink::new();
    let summary = orchestrator
        .execute(&cases(&entry, &["a"]), &CancellationToken::new(), &mut sink)
        .await;

    assert!(matches!(summary.groups[0].outcome, GroupOutcome::Failed(ref m) if m.contains("not found")));
    assert_eq!(sink.messages_at(MessageLevel::Error).count(), 1);
    assert!(staging_is_empty(&fx));
}

/// Cancels the run as soon as a given line shows up.
struct CancelOn {
    token: CancellationToken,
    trigger: &'static str,
    inner: RecordingSink,
}

impl TestSink for CancelOn {
    fn on_test_result(&mut self, result: &TestResult) {
        self.inner.on_test_result(result);
    }

    fn on_message(&mut self, level: MessageLevel, text: &str) {
        if text == self.trigger {
            self.token.cancel();
        }
        self.inner.on_message(level, text);
    }
}

#[tokio::test]
async fn cancellation_stops_the_engine_and_skips_later_groups() {
    let fx = fixture("echo '# slow'\nsleep 30\necho '# never'\n");
    let first = write(&fx.suite.join("a.js"), "casper.test.begin('slow');\n");
    let second = write(&fx.suite.join("b.js"), "casper.test.begin('never');\n");
    let mut all = cases(&first, &["slow"]);
    all.extend(cases(&second, &["never"]));

    let token = CancellationToken::new();
    let mut sink = CancelOn {
        token: token.clone(),
        trigger: "# slow",
        inner: RecordingSink::new(),
    };
    let orchestrator = ExecutionOrchestrator::new(config(&fx)).unwrap();

    let started = Instant::now();
    let summary = orchestrator.execute(&all, &token, &mut sink).await;

    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(summary.groups[0].outcome, GroupOutcome::Cancelled);
    assert_eq!(summary.groups[1].outcome, GroupOutcome::Cancelled);
    // The open result is still reported, as a failure
    assert_eq!(sink.inner.results.len(), 1);
    assert_eq!(sink.inner.results[0].outcome, Outcome::Failed);
    assert_eq!(sink.inner.results[0].error_message.as_deref(), Some("run cancelled"));
    assert!(staging_is_empty(&fx));
}

#[tokio::test]
async fn timeout_stops_the_engine() {
    let fx = fixture("echo '# slow'\nsleep 30\n");
    let entry = write(&fx.suite.join("a.js"), "casper.test.begin('slow');\n");
    let mut config = config(&fx);
    config.engine.timeout_secs = Some(1);

    let orchestrator = ExecutionOrchestrator::new(config).unwrap();
    let mut sink = RecordingSink::new();
    let started = Instant::now();
    let summary = orchestrator
        .execute(&cases(&entry, &["slow"]), &CancellationToken::new(), &mut sink)
        .await;

    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(summary.groups[0].outcome, GroupOutcome::TimedOut);
    assert!(summary.has_failures());
    assert_eq!(sink.results.len(), 1);
    assert_eq!(sink.results[0].test_case.display_name, "slow");
    assert_eq!(sink.results[0].outcome, Outcome::Failed);
    assert_eq!(sink.results[0].error_message.as_deref(), Some("engine timed out"));
}

#[tokio::test]
async fn run_sources_reports_discovery_errors() {
    let fx = fixture("echo '# one'\n");
    let first = write(&fx.suite.join("first.js"), "casper.test.begin('one');\n");
    let bad = write(&fx.suite.join("bad.js"), "casper.test.begin(;\n");
    let last = write(&fx.suite.join("last.js"), "casper.test.begin('one');\n");

    let orchestrator = ExecutionOrchestrator::new(config(&fx)).unwrap();
    let mut sink = RecordingSink::new();
    let summary = orchestrator
        .run_sources(&[first.clone(), bad.clone(), last.clone()], &CancellationToken::new(), &mut sink)
        .await;

    assert_eq!(summary.passed(), 2);
    let order: Vec<&Path> = summary.groups.iter().map(|g| g.source.as_path()).collect();
    assert_eq!(order, vec![first.as_path(), bad.as_path(), last.as_path()]);
    assert!(matches!(summary.groups[1].outcome, GroupOutcome::Skipped(_)));
    assert!(summary.has_failures());
    assert_eq!(sink.messages_at(MessageLevel::Error).count(), 1);
}

#[tokio::test]
async fn runner_streams_lines_and_collects_stderr() {
    let dir = TempDir::new().unwrap();
    let command = EngineCommand {
        program: PathBuf::from("/bin/sh"),
        args: vec![
            "-c".into(),
            "printf 'first\\r\\nsecond\\n'; printf 'oops' >&2; printf 'tail'; exit 3".into(),
        ],
        working_dir: dir.path().to_path_buf(),
    };
    let runner = ProcessRunner::new(&AdapterConfig::default().engine);
    let mut lines = Vec::new();
    let exit = runner
        .run(&command, &CancellationToken::new(), |line| lines.push(line.to_string()))
        .await
        .unwrap();

    assert_eq!(lines, vec!["first", "second", "tail"]);
    assert_eq!(exit.code, Some(3));
    assert_eq!(exit.stderr, "oops");
    assert_eq!(exit.stopped, None);
    assert!(!exit.success());
}

#[tokio::test]
async fn runner_reports_missing_binary() {
    let dir = TempDir::new().unwrap();
    let command = EngineCommand {
        program: dir.path().join("no-such-engine"),
        args: vec![],
        working_dir: dir.path().to_path_buf(),
    };
    let runner = ProcessRunner::new(&AdapterConfig::default().engine);
    let err = runner
        .run(&command, &CancellationToken::new(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::NotFound { .. }));
}

#[tokio::test]
async fn runner_already_cancelled_stops_promptly() {
    let dir = TempDir::new().unwrap();
    let command = EngineCommand {
        program: PathBuf::from("/bin/sh"),
        args: vec!["-c".into(), "sleep 30".into()],
        working_dir: dir.path().to_path_buf(),
    };
    let mut engine = AdapterConfig::default().engine;
    engine.kill_grace_ms = 100;
    let token = CancellationToken::new();
    token.cancel();

    let started = Instant::now();
    let exit = ProcessRunner::new(&engine)
        .run(&command, &token, |_| {})
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(exit.stopped, Some(StopReason::Cancelled));
    assert_eq!(exit.code, None);
}

#[tokio::test]
async fn runner_times_out_after_engine_closes_stdout() {
    let dir = TempDir::new().unwrap();
    let command = EngineCommand {
        program: PathBuf::from("/bin/sh"),
        args: vec!["-c".into(), "echo '# a'; exec 1>&-; sleep 6".into()],
        working_dir: dir.path().to_path_buf(),
    };
    let mut engine = AdapterConfig::default().engine;
    engine.timeout_secs = Some(1);
    engine.kill_grace_ms = 100;

    let started = Instant::now();
    let mut lines = Vec::new();
    let exit = ProcessRunner::new(&engine)
        .run(&command, &CancellationToken::new(), |line| lines.push(line.to_string()))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(lines, vec!["# a"]);
    assert_eq!(exit.stopped, Some(StopReason::TimedOut));
}
