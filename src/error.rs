//! Error types for program construction, emission, and engine execution

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SouffleError>;

/// Top-level error. The three kinds are distinct and never conflated:
/// a [`UsageError`] is the caller's mistake, an [`InternalError`] is ours,
/// an [`ExecutionError`] is a failure at or after the subprocess boundary.
#[derive(Error, Debug)]
pub enum SouffleError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl SouffleError {
    /// Check if this is a usage error
    pub fn is_usage(&self) -> bool {
        matches!(self, SouffleError::Usage(_))
    }

    /// Check if this is an internal error
    pub fn is_internal(&self) -> bool {
        matches!(self, SouffleError::Internal(_))
    }

    /// Check if this is an execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, SouffleError::Execution(_))
    }
}

/// Caller misuse detected before the engine is touched. Recoverable by
/// fixing how the context is built; never triggers a partial engine run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("relation already declared: {0}")]
    DuplicateRelation(String),

    #[error("type already defined: {0}")]
    DuplicateType(String),

    #[error("fact references undeclared relation: {0}")]
    UndeclaredRelation(String),

    #[error("arity mismatch for {relation}: declared {expected} columns, got {actual} values")]
    ArityMismatch {
        relation: String,
        expected: usize,
        actual: usize,
    },

    #[error("type mismatch for {relation} column {column}: declared {expected}, got {actual} value")]
    TypeMismatch {
        relation: String,
        column: usize,
        expected: &'static str,
        actual: &'static str,
    },
}

/// One of this library's own invariants was violated. Signals a defect
/// in this crate, not in caller input or the external engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("internal invariant violated: {0}")]
pub struct InternalError(pub String);

/// Failure at or after the subprocess boundary. Carries the captured
/// diagnostics; never retried automatically.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to spawn engine binary {binary:?}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine exited with status {code:?}: {stderr}")]
    EngineFailed { code: Option<i32>, stderr: String },

    #[error("engine did not finish within {0:?}")]
    Timeout(Duration),

    #[error("working area io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed output for relation {relation}: {detail}")]
    MalformedOutput { relation: String, detail: String },
}
