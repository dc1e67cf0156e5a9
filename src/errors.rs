use std::fmt;

use thiserror::Error;

use crate::wire::Intent;

/// Failures of the template store. Never retried: a missing template is a
/// deployment problem, not a transient one.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template not found: {path}")]
    NotFound { path: String },
    #[error("invalid template path: {path}")]
    InvalidPath { path: String },
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures talking to the external generation service.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0} env var is not set")]
    MissingApiKey(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("response decode error: {0}")]
    Decode(String),
    #[error("empty completion content")]
    EmptyContent,
}

/// Which step of a single attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Call,
    Timeout,
    Parse,
    Validation,
    ContentShape,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Call => "call",
            Stage::Timeout => "timeout",
            Stage::Parse => "parse",
            Stage::Validation => "validation",
            Stage::ContentShape => "content-shape",
        };
        f.write_str(s)
    }
}

/// A failed attempt. Every variant is retryable.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("generation call failed: {0}")]
    Call(#[from] ProviderError),
    #[error("generation call timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("malformed output: {0}")]
    Parse(String),
    #[error("schema validation failed: {0}")]
    Validation(String),
    #[error("degenerate completion: {0}")]
    ContentShape(String),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Call(_) => Stage::Call,
            StageError::Timeout { .. } => Stage::Timeout,
            StageError::Parse(_) => Stage::Parse,
            StageError::Validation(_) => Stage::Validation,
            StageError::ContentShape(_) => Stage::ContentShape,
        }
    }
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("{intent} failed after {attempts} attempt(s) at stage {}: {last}", .last.stage())]
    Exhausted {
        intent: Intent,
        attempts: usize,
        last: StageError,
    },
}

impl SynthesisError {
    /// Stage of the last failed attempt, if the error came from the retry loop.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SynthesisError::Template(_) => None,
            SynthesisError::Exhausted { last, .. } => Some(last.stage()),
        }
    }
}
