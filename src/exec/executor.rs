//! Blocking executor owning one engine subprocess per invocation

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::context::Context;
use crate::emit::emit;
use crate::error::{ExecutionError, Result};
use crate::syntax::Value;

use super::output;

/// How often a timed invocation polls the child for exit
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Configuration for engine invocations
#[derive(Clone, Debug)]
pub struct ExecutorOptions {
    /// Engine executable; resolved via PATH when not absolute
    pub binary: PathBuf,
    /// Extra command-line flags passed before the program path
    pub extra_args: Vec<String>,
    /// Coerce numerically-typed output columns into numeric values;
    /// when false every returned cell stays raw text
    pub process_results: bool,
    /// Write input-relation facts as per-relation fact files instead of
    /// embedding them in the source text
    pub facts_dir: bool,
    /// Parent directory for the scoped working area (system temp when unset)
    pub work_dir: Option<PathBuf>,
    /// Kill the engine and fail when it runs longer than this
    pub timeout: Option<Duration>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        ExecutorOptions {
            binary: PathBuf::from("souffle"),
            extra_args: Vec::new(),
            process_results: true,
            facts_dir: false,
            work_dir: None,
            timeout: None,
        }
    }
}

/// Outcome of a successful invocation
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionResult {
    /// Per-relation rows, each relation's rows in engine file order
    Raw {
        results: HashMap<String, Vec<Vec<Value>>>,
    },
}

impl ExecutionResult {
    /// Mapping from output relation name to its rows
    pub fn results(&self) -> &HashMap<String, Vec<Vec<Value>>> {
        match self {
            ExecutionResult::Raw { results } => results,
        }
    }

    /// Rows of one output relation
    pub fn rows(&self, relation: &str) -> Option<&[Vec<Value>]> {
        self.results().get(relation).map(|rows| rows.as_slice())
    }
}

/// Blocking executor. One `execute` call serializes the context's
/// snapshot into a fresh scoped working directory, runs the engine
/// against it, reads back every output relation, and releases the
/// directory on every exit path. Execution never mutates the context,
/// so the same context may be executed from several threads at once;
/// the per-invocation working area keeps them isolated.
#[derive(Clone, Debug, Default)]
pub struct Executor {
    options: ExecutorOptions,
}

impl Executor {
    /// Executor with default options
    pub fn new() -> Self {
        Executor::default()
    }

    pub fn with_options(options: ExecutorOptions) -> Self {
        Executor { options }
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Run the context's current snapshot through the engine
    pub fn execute(&self, ctx: &Context) -> Result<ExecutionResult> {
        let (program, fact_files) =
            output::input_fact_files(ctx.snapshot(), self.options.facts_dir);
        let source = emit(&program)?;

        let work = create_work_dir(&self.options)?;
        let program_path = work.path().join(format!("{}.dl", file_stem(program.name())));
        fs::write(&program_path, &source).map_err(ExecutionError::Io)?;
        for file in &fact_files {
            fs::write(
                work.path().join(format!("{}.facts", file.name)),
                &file.contents,
            )
            .map_err(ExecutionError::Io)?;
        }
        tracing::debug!(
            "serialized {:?}: {} bytes, {} fact files",
            program_path,
            source.len(),
            fact_files.len()
        );

        let engine_output = self.run_engine(&program_path, work.path())?;
        check_status(&engine_output)?;

        let results = output::read_results(work.path(), &program, self.options.process_results)?;
        // Success path surfaces deletion errors explicitly; every other
        // path releases the area through the TempDir drop guard.
        work.close().map_err(ExecutionError::Io)?;
        Ok(ExecutionResult::Raw { results })
    }

    fn run_engine(&self, program_path: &Path, work: &Path) -> Result<Output> {
        let mut cmd = Command::new(&self.options.binary);
        cmd.arg("-F")
            .arg(work)
            .arg("-D")
            .arg(work)
            .args(&self.options.extra_args)
            .arg(program_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ExecutionError::Spawn {
            binary: self.options.binary.clone(),
            source,
        })?;
        tracing::debug!("spawned engine {:?}", self.options.binary);

        if let Some(limit) = self.options.timeout {
            let started = Instant::now();
            loop {
                if child.try_wait().map_err(ExecutionError::Io)?.is_some() {
                    break;
                }
                if started.elapsed() >= limit {
                    // Same handling as a start failure: kill, clean up
                    // (TempDir guard), report
                    child.kill().ok();
                    child.wait().ok();
                    tracing::warn!("engine killed after {:?}", limit);
                    return Err(ExecutionError::Timeout(limit).into());
                }
                thread::sleep(POLL_INTERVAL);
            }
        }

        let output = child.wait_with_output().map_err(ExecutionError::Io)?;
        Ok(output)
    }
}

/// Fresh exclusive working directory for one invocation
pub(super) fn create_work_dir(options: &ExecutorOptions) -> Result<TempDir> {
    let work = match &options.work_dir {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(ExecutionError::Io)?;
            tempfile::Builder::new()
                .prefix("souffle-")
                .tempdir_in(parent)
        }
        None => tempfile::Builder::new().prefix("souffle-").tempdir(),
    }
    .map_err(ExecutionError::Io)?;
    tracing::debug!("working area {:?}", work.path());
    Ok(work)
}

/// Non-zero exit fails with the captured diagnostics
pub(super) fn check_status(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    tracing::warn!(
        "engine exited with {:?}: {}",
        output.status.code(),
        stderr.trim()
    );
    Err(ExecutionError::EngineFailed {
        code: output.status.code(),
        stderr,
    }
    .into())
}

/// Program file name derived from the program name; anything
/// path-hostile becomes an underscore
pub(super) fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "program".to_string()
    } else {
        stem
    }
}
