//! Console reporter (pytest-style)

use std::time::Duration;

use crate::discovery::TestCase;
use crate::execution::{ExecutionSummary, GroupOutcome, MessageLevel, Outcome, TestResult, TestSink};

/// Prints one line per test as results arrive, then a failure section and a summary line.
///
/// Engine output is only echoed in verbose mode; warnings and errors always go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
    failures: Vec<TestResult>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            failures: Vec::new(),
        }
    }

    pub fn on_collection_complete(&self, test_count: usize) {
        println!("\x1b[1m=================== test session starts ===================\x1b[0m");
        println!("collected {} item(s)", test_count);
        println!();
    }

    /// Print failure details and the summary line.
    pub fn on_run_complete(&self, summary: &ExecutionSummary, duration: Duration) {
        if !self.failures.is_empty() {
            println!();
            println!("\x1b[1;31m=================== FAILURES ===================\x1b[0m");
            for result in &self.failures {
                println!();
                println!("\x1b[1m___________ {} ___________\x1b[0m", result.test_case.display_name);
                if let Some(message) = &result.error_message {
                    println!();
                    println!("    {}", message);
                }
                println!();
                println!(
                    "    {}:{}",
                    result.test_case.source_file.display(),
                    result.test_case.line
                );
            }
        }

        let mut parts = Vec::new();
        if summary.passed() > 0 {
            parts.push(format!("{} passed", summary.passed()));
        }
        if summary.failed() > 0 {
            parts.push(format!("{} failed", summary.failed()));
        }
        let count = |f: fn(&GroupOutcome) -> bool| summary.groups.iter().filter(|g| f(&g.outcome)).count();
        let errors = count(|o| matches!(o, GroupOutcome::Failed(_) | GroupOutcome::Skipped(_)));
        if errors > 0 {
            parts.push(format!("{} error(s)", errors));
        }
        let timed_out = count(|o| matches!(o, GroupOutcome::TimedOut));
        if timed_out > 0 {
            parts.push(format!("{} timed out", timed_out));
        }
        if summary.was_cancelled() {
            parts.push("interrupted".to_string());
        }
        if parts.is_empty() {
            parts.push("no tests ran".to_string());
        }

        let color = if summary.has_failures() { "\x1b[1;31m" } else { "\x1b[1;32m" };
        println!();
        println!(
            "{}=================== {} in {:.2}s ===================\x1b[0m",
            color,
            parts.join(", "),
            duration.as_secs_f64()
        );
    }
}

impl TestSink for ConsoleReporter {
    fn on_test_start(&mut self, case: &TestCase) {
        if self.verbose {
            println!("{}::{} ...", file_name(case), case.display_name);
        }
    }

    fn on_test_result(&mut self, result: &TestResult) {
        let status = match result.outcome {
            Outcome::Passed => "\x1b[32mPASSED\x1b[0m",
            Outcome::Failed => "\x1b[31mFAILED\x1b[0m",
        };
        println!("{}::{} {}", file_name(&result.test_case), result.test_case.display_name, status);
        if result.outcome == Outcome::Failed {
            self.failures.push(result.clone());
        }
    }

    fn on_message(&mut self, level: MessageLevel, text: &str) {
        match level {
            MessageLevel::Informational => {
                if self.verbose {
                    println!("    | {}", text);
                }
            }
            MessageLevel::Warning => eprintln!("\x1b[33mwarning\x1b[0m: {}", text),
            MessageLevel::Error => eprintln!("\x1b[31merror\x1b[0m: {}", text),
        }
    }
}

fn file_name(case: &TestCase) -> String {
    case.source_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_are_collected() {
        let mut reporter = ConsoleReporter::new(false);
        let case = TestCase::new("suite/login.js", "logs in", 3, 0);
        reporter.on_test_result(&TestResult {
            test_case: case.clone(),
            outcome: Outcome::Passed,
            error_message: None,
            raw_lines: vec![],
        });
        reporter.on_test_result(&TestResult {
            test_case: case,
            outcome: Outcome::Failed,
            error_message: Some("FAIL expected 1".into()),
            raw_lines: vec![],
        });
        assert_eq!(reporter.failures.len(), 1);
        assert_eq!(reporter.failures[0].error_message.as_deref(), Some("FAIL expected 1"));
    }
}
