//! Engine output protocol
//!
//! The engine reports progress as plain text lines on stdout:
//!
//! - `# <name>` starts the test named `<name>`
//! - `FAIL...` marks the current test as failed, the whole line being the message
//! - any line containing the fatal marker (`CasperError`) switches to error capture: this
//!   line and every later one are collected into a single execution-level error and are no
//!   longer interpreted per test
//! - everything else is informational
//!
//! [`ResultStreamParser`] is a pure line-at-a-time state machine over that protocol. It only
//! ever reports results for the test cases it was constructed with.

use serde::Serialize;

use crate::config::ProtocolConfig;
use crate::discovery::TestCase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Passed,
    Failed,
}

/// Result of one test as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub test_case: TestCase,
    pub outcome: Outcome,
    pub error_message: Option<String>,
    /// Output lines attributed to this test, starting with its marker line
    pub raw_lines: Vec<String>,
}

impl TestResult {
    fn started(test_case: TestCase, marker_line: &str) -> Self {
        Self {
            test_case,
            outcome: Outcome::Passed,
            error_message: None,
            raw_lines: vec![marker_line.to_string()],
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    /// Fail a result whose test never finished because the engine was stopped.
    pub fn interrupted(mut self, message: impl Into<String>) -> Self {
        self.outcome = Outcome::Failed;
        self.error_message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Started(TestCase),
    Finished(TestResult),
}

/// What is left once the stream has ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamOutcome {
    /// The result that was still open at end of stream
    pub last_result: Option<TestResult>,
    /// Captured fatal-error text, one output line per text line
    pub execution_error: Option<String>,
}

#[derive(Debug)]
pub struct ResultStreamParser {
    cases: Vec<TestCase>,
    protocol: ProtocolConfig,
    current: Option<TestResult>,
    error_lines: Vec<String>,
}

impl ResultStreamParser {
    /// `cases` are the discovered tests of one source file.
    pub fn new(cases: Vec<TestCase>, protocol: ProtocolConfig) -> Self {
        Self {
            cases,
            protocol,
            current: None,
            error_lines: Vec::new(),
        }
    }

    /// Whether a fatal engine error has been seen.
    pub fn in_error(&self) -> bool {
        !self.error_lines.is_empty()
    }

    pub fn feed(&mut self, line: &str) -> Vec<StreamEvent> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut events = Vec::new();

        if self.in_error() || line.contains(&self.protocol.fatal_marker) {
            self.error_lines.push(line.to_string());
            return events;
        }

        if let Some(name) = self.marker_name(line) {
            if let Some(done) = self.current.take() {
                events.push(StreamEvent::Finished(done));
            }
            // Duplicate names resolve to the last declaration.
            if let Some(case) = self.cases.iter().rev().find(|c| c.display_name == name) {
                events.push(StreamEvent::Started(case.clone()));
                self.current = Some(TestResult::started(case.clone(), line));
            }
            return events;
        }

        if let Some(current) = self.current.as_mut() {
            if line.starts_with(&self.protocol.failure_prefix) {
                current.outcome = Outcome::Failed;
                current.error_message = Some(line.to_string());
            }
            current.raw_lines.push(line.to_string());
        }
        events
    }

    pub fn finish(self) -> StreamOutcome {
        StreamOutcome {
            last_result: self.current,
            execution_error: (!self.error_lines.is_empty()).then(|| self.error_lines.join("\n")),
        }
    }

    fn marker_name<'l>(&self, line: &'l str) -> Option<&'l str> {
        line.strip_prefix(&self.protocol.test_marker)
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cases(names: &[&str]) -> Vec<TestCase> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| TestCase::new("suite.js", *name, i + 1, 0))
            .collect()
    }

    fn run(names: &[&str], lines: &[&str]) -> (Vec<TestResult>, StreamOutcome, usize) {
        let mut parser = ResultStreamParser::new(cases(names), ProtocolConfig::default());
        let mut results = Vec::new();
        let mut started = 0;
        for line in lines {
            for event in parser.feed(line) {
                match event {
                    StreamEvent::Started(_) => started += 1,
                    StreamEvent::Finished(result) => results.push(result),
                }
            }
        }
        let outcome = parser.finish();
        results.extend(outcome.last_result.clone());
        (results, outcome, started)
    }

    #[test]
    fn test_pass_then_fail() {
        let (results, outcome, started) = run(
            &["test one", "test two"],
            &["# test one", "PASS", "# test two", "FAIL something broke"],
        );
        assert_eq!(started, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].test_case.display_name, "test one");
        assert_eq!(results[0].outcome, Outcome::Passed);
        assert_eq!(results[0].raw_lines, vec!["# test one", "PASS"]);
        assert_eq!(results[1].test_case.display_name, "test two");
        assert_eq!(results[1].outcome, Outcome::Failed);
        assert_eq!(results[1].error_message.as_deref(), Some("FAIL something broke"));
        assert_eq!(outcome.execution_error, None);
    }

    #[test]
    fn test_unknown_marker_closes_current_and_opens_nothing() {
        let (results, _, started) = run(&["known"], &["# known", "# stranger", "FAIL late"]);
        assert_eq!(started, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].outcome, Outcome::Passed);
    }

    #[test]
    fn test_fail_without_open_result_is_ignored() {
        let (results, _, _) = run(&["a"], &["FAIL before anything", "# a"]);
        assert_eq!(results.len(), 1);
        assert!(results[0].passed());
    }

    #[test]
    fn test_interrupted_result_is_failed() {
        let (mut results, _, _) = run(&["slow"], &["# slow", "waiting"]);
        let result = results.remove(0).interrupted("engine timed out");
        assert_eq!(result.outcome, Outcome::Failed);
        assert_eq!(result.error_message.as_deref(), Some("engine timed out"));
        assert_eq!(result.raw_lines, vec!["# slow", "waiting"]);
    }

    #[test]
    fn test_last_fail_line_wins() {
        let (results, _, _) = run(&["a"], &["# a", "FAIL first", "FAIL second"]);
        assert_eq!(results[0].error_message.as_deref(), Some("FAIL second"));
    }

    #[test]
    fn test_fatal_error_absorbs_remaining_lines() {
        let (results, outcome, started) = run(
            &["a", "b"],
            &["# a", "CasperError: boom", "    at foo.js:1", "# b", "FAIL nope"],
        );
        assert_eq!(started, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].test_case.display_name, "a");
        assert!(results[0].passed());
        assert_eq!(
            outcome.execution_error.as_deref(),
            Some("CasperError: boom\n    at foo.js:1\n# b\nFAIL nope")
        );
    }

    #[test]
    fn test_duplicate_names_resolve_to_last_case() {
        let (results, _, _) = run(&["dup", "dup"], &["# dup"]);
        assert_eq!(results[0].test_case.line, 2);
    }

    #[test]
    fn test_crlf_and_empty_marker() {
        let (results, _, started) = run(&["a"], &["# \r", "# a\r", "FAIL x\r"]);
        assert_eq!(started, 1);
        assert_eq!(results[0].error_message.as_deref(), Some("FAIL x"));
    }

    #[test]
    fn test_custom_protocol() {
        let protocol = ProtocolConfig {
            test_marker: "TEST: ".into(),
            failure_prefix: "not ok".into(),
            fatal_marker: "PANIC".into(),
        };
        let mut parser = ResultStreamParser::new(cases(&["x"]), protocol);
        assert_eq!(parser.feed("TEST: x").len(), 1);
        parser.feed("not ok 1");
        let outcome = parser.finish();
        assert_eq!(outcome.last_result.map(|r| r.outcome), Some(Outcome::Failed));
    }
}
