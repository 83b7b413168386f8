//! Test execution
//!
//! `TestCase[]` grouped by file → [`DependencyResolver`] + [`StagingManager`] → staged
//! workspace → [`ProcessRunner`] → line stream → [`ResultStreamParser`] → [`TestSink`].
//!
//! [`ExecutionOrchestrator`] drives the pipeline; the pieces are public so hosts can reuse them
//! individually.

mod cancel;
mod orchestrator;
mod process;
mod resolver;
mod result_stream;
mod sink;
mod staging;

pub use cancel::CancellationToken;
pub use orchestrator::{ExecutionError, ExecutionOrchestrator, ExecutionSummary, GroupOutcome, GroupReport};
pub use process::{EngineCommand, EngineExit, ProcessError, ProcessRunner, StopReason};
pub use resolver::{DependencyNode, DependencyResolver, ResolveError};
pub use result_stream::{Outcome, ResultStreamParser, StreamEvent, StreamOutcome, TestResult};
pub use sink::{MessageLevel, RecordingSink, TestSink};
pub use staging::{StagingError, StagingManager, StagingWorkspace};
