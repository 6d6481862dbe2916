//! # Pipeline
//!
//! Every application is an ordered or lightly branching sequence of steps over one record. A run
//! returns either the finished record or a [RunFailure] naming the step that failed. Once a step fails
//! nothing downstream runs, so every output field the failed run did not reach keeps its default value.

use std::fmt;
use log::warn;
use thiserror::Error;
use crate::prompt::errors::PromptError;
use crate::utils::fetch::FetchError;
use crate::utils::llm::{GenerationError, StructuredError};
use crate::utils::postprocess::json::SchemaError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing user input.
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    /// A control field left its allowed range.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl From<StructuredError> for PipelineError {
    fn from(e: StructuredError) -> Self {
        match e {
            StructuredError::Generation(e) => PipelineError::Generation(e),
            StructuredError::Schema(e) => PipelineError::Schema(e),
        }
    }
}

impl PipelineError {
    pub fn input(message: impl Into<String>) -> Self {
        PipelineError::Input(message.into())
    }
}

/// A failed run: where it failed, why, and the record as it was when the step failed.
#[derive(Debug)]
pub struct RunFailure<R> {
    pub pipeline: &'static str,
    pub step: &'static str,
    pub error: PipelineError,
    pub record: R,
}

impl<R> RunFailure<R> {
    pub(crate) fn new(pipeline: &'static str, step: &'static str, error: PipelineError, record: R) -> Self {
        warn!("{} failed at step {}: {}", pipeline, step, error);
        Self { pipeline, step, error, record }
    }
}

impl<R> fmt::Display for RunFailure<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed at step {}: {}", self.pipeline, self.step, self.error)
    }
}

impl<R: fmt::Debug> std::error::Error for RunFailure<R> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of one pipeline run.
pub type RunResult<R> = Result<R, RunFailure<R>>;

/// Ends a step function on a failed step, handing the record back in a [RunFailure].
macro_rules! run_step {
    ($pipeline:expr, $step:expr, $record:ident, $call:expr) => {{
        log::debug!("{}: running {}", $pipeline, $step);
        let result = $call;
        if let Err(error) = result {
            return Err($crate::pipeline::RunFailure::new($pipeline, $step, error.into(), $record));
        }
    }};
}

pub(crate) use run_step;

#[cfg(test)]
mod test_pipeline {
    use super::{PipelineError, RunFailure};
    use crate::utils::llm::{GenerationError, StructuredError};
    use crate::utils::postprocess::json::SchemaError;

    #[test]
    fn test_structured_error_maps_to_taxonomy() {
        let error: PipelineError = StructuredError::Generation(GenerationError::EmptyReply).into();
        assert!(matches!(error, PipelineError::Generation(GenerationError::EmptyReply)));

        let error: PipelineError = StructuredError::Schema(SchemaError::new("Users", "missing field", "{}")).into();
        assert!(matches!(error, PipelineError::Schema(_)));
    }

    #[test]
    fn test_failure_display() {
        let failure = RunFailure::new("video_summary", "get_video_id", PipelineError::input("Invalid YouTube URL"), ());
        assert_eq!("video_summary failed at step get_video_id: Invalid YouTube URL", failure.to_string());
        assert_eq!("Invalid YouTube URL", failure.error.to_string());
    }
}
