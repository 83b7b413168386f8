//! Result and diagnostic delivery

use super::result_stream::TestResult;
use crate::discovery::TestCase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Informational,
    Warning,
    Error,
}

/// Receives results and messages in the order they are produced.
///
/// Implement this trait to customize how a run is presented (console, JSON, an IDE bridge).
pub trait TestSink {
    /// Called when the engine reports that a discovered test started
    fn on_test_start(&mut self, _case: &TestCase) {}

    /// Called once per finished test
    fn on_test_result(&mut self, result: &TestResult);

    /// Engine output and diagnostics
    fn on_message(&mut self, level: MessageLevel, text: &str);
}

/// Keeps everything it receives. Handy for tests and for callers that post-process a run.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub started: Vec<TestCase>,
    pub results: Vec<TestResult>,
    pub messages: Vec<(MessageLevel, String)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages_at(&self, level: MessageLevel) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(move |(l, _)| *l == level)
            .map(|(_, text)| text.as_str())
    }
}

impl TestSink for RecordingSink {
    fn on_test_start(&mut self, case: &TestCase) {
        self.started.push(case.clone());
    }

    fn on_test_result(&mut self, result: &TestResult) {
        self.results.push(result.clone());
    }

    fn on_message(&mut self, level: MessageLevel, text: &str) {
        self.messages.push((level, text.to_string()));
    }
}
