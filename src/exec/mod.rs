//! Execution protocol: run a context's program through the external engine
//!
//! One invocation serializes the context's snapshot, acquires a fresh
//! scoped working directory, spawns the engine subprocess, waits for it,
//! reads back every output relation, and releases the directory on every
//! exit path. State machine per invocation:
//! `Idle -> Serialized -> Running -> {Succeeded, Failed}`, terminal both
//! ways; a caller wanting retries wraps the whole invocation.

mod async_executor;
mod executor;
mod output;

pub use async_executor::AsyncExecutor;
pub use executor::{ExecutionResult, Executor, ExecutorOptions};

#[cfg(test)]
mod tests;
