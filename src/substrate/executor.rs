//! Worker pool running one unit of work per partition.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use super::broadcast::Broadcast;
use crate::error::{ErrorCode, JoinError, Result};

/// Sizing and retry policy of the worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Attempts per unit of work before a transient failure fails the job
    pub max_attempts: u32,
    /// Partition count used when a stage has no partitioning to inherit
    pub default_partitions: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_attempts: 3,
            default_partitions: 8,
        }
    }
}

/// Data-parallel executor backed by a dedicated rayon pool
pub struct Executor {
    pool: ThreadPool,
    max_attempts: u32,
    default_partitions: usize,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("workers", &self.pool.current_num_threads())
            .field("max_attempts", &self.max_attempts)
            .field("default_partitions", &self.default_partitions)
            .finish()
    }
}

impl Executor {
    pub fn new(config: &ExecutorConfig) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("occurrence-join-worker-{}", i))
            .build()
            .map_err(|e| {
                JoinError::Execution {
                    code: ErrorCode::EXEC_WORKER_POOL,
                    stage: "startup".to_string(),
                    partition: None,
                    message: "failed to create worker pool".to_string(),
                    source: None,
                }
                .with_source(e)
            })?;

        debug!(
            workers = pool.current_num_threads(),
            max_attempts = config.max_attempts,
            "Worker pool ready"
        );

        Ok(Self {
            pool,
            max_attempts: config.max_attempts.max(1),
            default_partitions: config.default_partitions.max(1),
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn default_partitions(&self) -> usize {
        self.default_partitions
    }

    /// Share a read-only value with every worker
    pub fn broadcast<T>(&self, name: &str, value: T) -> Broadcast<T> {
        debug!(name, workers = self.workers(), "Broadcasting read-only value");
        Broadcast::new(value)
    }

    /// Run `task` once per input, in parallel, and collect the outputs in input order.
    ///
    /// A unit of work failing with a retryable error is attempted again, up to
    /// the configured budget. Any other error fails the stage at once.
    pub fn run<I, O, F>(&self, stage: &str, inputs: &[I], task: F) -> Result<Vec<O>>
    where
        I: Sync,
        O: Send,
        F: Fn(usize, &I) -> Result<O> + Sync,
    {
        self.pool.install(|| {
            inputs
                .par_iter()
                .enumerate()
                .map(|(index, input)| self.attempt(stage, index, input, &task))
                .collect::<Result<Vec<O>>>()
        })
    }

    fn attempt<I, O, F>(&self, stage: &str, index: usize, input: &I, task: &F) -> Result<O>
    where
        F: Fn(usize, &I) -> Result<O>,
    {
        let mut attempt = 1;
        loop {
            match task(index, input) {
                Ok(output) => return Ok(output),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        stage,
                        partition = index,
                        attempt,
                        error = %err,
                        "Unit of work failed, retrying"
                    );
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    return Err(JoinError::Execution {
                        code: ErrorCode::EXEC_RETRIES_EXHAUSTED,
                        stage: stage.to_string(),
                        partition: Some(index),
                        message: format!("gave up after {} attempts", attempt),
                        source: None,
                    }
                    .with_source(err));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn executor(max_attempts: u32) -> Executor {
        Executor::new(&ExecutorConfig {
            workers: 2,
            max_attempts,
            default_partitions: 4,
        })
        .unwrap()
    }

    #[test]
    fn test_run_preserves_input_order() {
        let exec = executor(1);
        let inputs = vec![1, 2, 3, 4, 5];
        let outputs = exec.run("double", &inputs, |_, x| Ok(x * 2)).unwrap();
        assert_eq!(outputs, vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let exec = executor(3);
        let calls = AtomicU32::new(0);
        let inputs = vec![()];

        let outputs = exec
            .run("flaky", &inputs, |index, _| {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(JoinError::transient("flaky", index, "worker lost"))
                } else {
                    Ok(7)
                }
            })
            .unwrap();

        assert_eq!(outputs, vec![7]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_budget_exhausted() {
        let exec = executor(2);
        let calls = AtomicU32::new(0);
        let inputs = vec![()];

        let err = exec
            .run("flaky", &inputs, |index, _| -> Result<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(JoinError::transient("flaky", index, "worker lost"))
            })
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::EXEC_RETRIES_EXHAUSTED);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_data_errors_are_not_retried() {
        let exec = executor(5);
        let calls = AtomicU32::new(0);
        let inputs = vec![()];

        let err = exec
            .run("resolve", &inputs, |_, _| -> Result<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(JoinError::identity("ssm_p", "S9", "absent"))
            })
            .unwrap_err();

        assert!(err.is_data_integrity());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
