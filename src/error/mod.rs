//! Error handling module for gifify

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::domain::model::{Stage, StageExit};

/// Main error type for gifify operations
#[derive(Error, Debug)]
pub enum GififyError {
    /// A stage's program could not be started
    #[error("Failed to start {stage} stage: {source}")]
    SpawnFailure {
        stage: Stage,
        #[source]
        source: io::Error,
    },

    /// A stage wrote to its diagnostic channel
    #[error("{stage} stage failed: {message}")]
    StageDiagnostic { stage: Stage, message: String },

    /// A stage terminated abnormally without writing diagnostics
    #[error("{stage} stage exited abnormally: {exit}")]
    StageExited { stage: Stage, exit: StageExit },

    /// The caller-supplied input stream could not be read
    #[error("Failed to read input stream: {0}")]
    Input(#[source] io::Error),

    /// The pipeline did not settle before its deadline
    #[error("Pipeline did not finish within {0:?}")]
    Timeout(Duration),

    /// Configuration file error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl GififyError {
    /// Recover the pipeline error carried by an error read from a [`crate::GifStream`].
    ///
    /// Errors that did not originate in the pipeline are wrapped as [`GififyError::Io`].
    pub fn from_stream_error(err: io::Error) -> Self {
        match err.get_ref() {
            Some(inner) if inner.is::<GififyError>() => {}
            _ => return GififyError::Io(err),
        }

        match err.into_inner().map(|inner| inner.downcast::<GififyError>()) {
            Some(Ok(pipeline_err)) => *pipeline_err,
            Some(Err(other)) => GififyError::Io(io::Error::other(other)),
            None => GififyError::Io(io::Error::other("output stream failed")),
        }
    }

    /// Stage the error is attributed to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GififyError::SpawnFailure { stage, .. }
            | GififyError::StageDiagnostic { stage, .. }
            | GififyError::StageExited { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type alias for gifify operations
pub type GififyResult<T> = std::result::Result<T, GififyError>;
