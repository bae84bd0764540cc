//! Non-blocking executor variant for async callers

use std::process::Stdio;

use tokio::process::Command;

use crate::context::Context;
use crate::emit::emit;
use crate::error::{ExecutionError, Result};

use super::executor::{check_status, create_work_dir, file_stem, ExecutionResult, ExecutorOptions};
use super::output;

/// Async twin of [`super::Executor`]: identical protocol and isolation
/// guarantees, but the engine is awaited instead of blocking the thread.
/// Result files are small, so ingestion stays synchronous.
#[derive(Clone, Debug, Default)]
pub struct AsyncExecutor {
    options: ExecutorOptions,
}

impl AsyncExecutor {
    /// Executor with default options
    pub fn new() -> Self {
        AsyncExecutor::default()
    }

    pub fn with_options(options: ExecutorOptions) -> Self {
        AsyncExecutor { options }
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Run the context's current snapshot through the engine
    pub async fn execute(&self, ctx: &Context) -> Result<ExecutionResult> {
        let (program, fact_files) =
            output::input_fact_files(ctx.snapshot(), self.options.facts_dir);
        let source = emit(&program)?;

        let work = create_work_dir(&self.options)?;
        let program_path = work.path().join(format!("{}.dl", file_stem(program.name())));
        tokio::fs::write(&program_path, &source)
            .await
            .map_err(ExecutionError::Io)?;
        for file in &fact_files {
            tokio::fs::write(
                work.path().join(format!("{}.facts", file.name)),
                &file.contents,
            )
            .await
            .map_err(ExecutionError::Io)?;
        }
        tracing::debug!(
            "serialized {:?}: {} bytes, {} fact files",
            program_path,
            source.len(),
            fact_files.len()
        );

        let mut cmd = Command::new(&self.options.binary);
        cmd.arg("-F")
            .arg(work.path())
            .arg("-D")
            .arg(work.path())
            .args(&self.options.extra_args)
            .arg(&program_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ExecutionError::Spawn {
            binary: self.options.binary.clone(),
            source,
        })?;
        tracing::debug!("spawned engine {:?}", self.options.binary);

        let engine_output = match self.options.timeout {
            None => child
                .wait_with_output()
                .await
                .map_err(ExecutionError::Io)?,
            Some(limit) => {
                match tokio::time::timeout(limit, child.wait_with_output()).await {
                    Ok(finished) => finished.map_err(ExecutionError::Io)?,
                    // Dropping the wait future kills the child
                    // (kill_on_drop); the TempDir guard releases the
                    // working area.
                    Err(_) => {
                        tracing::warn!("engine killed after {:?}", limit);
                        return Err(ExecutionError::Timeout(limit).into());
                    }
                }
            }
        };
        check_status(&engine_output)?;

        let results = output::read_results(work.path(), &program, self.options.process_results)?;
        work.close().map_err(ExecutionError::Io)?;
        Ok(ExecutionResult::Raw { results })
    }
}
