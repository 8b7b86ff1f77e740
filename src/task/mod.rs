//! Join tasks and the job that runs them.

pub mod job;
pub mod observation;
pub mod secondary;

use std::sync::Arc;

use crate::identity::IdentityCache;
use crate::substrate::{Broadcast, Executor};

pub use job::{JobSummary, JoinJob};
pub use observation::{ObservationInputs, ObservationJoinTask, ObservationOutputs};
pub use secondary::{SecondaryInputs, SecondaryJoinTask};

/// Shared, read-only state handed to every task of a job
#[derive(Debug, Clone)]
pub struct TaskContext {
    executor: Arc<Executor>,
    identity: Broadcast<IdentityCache>,
    project: Option<String>,
}

impl TaskContext {
    pub fn new(executor: Arc<Executor>, identity: IdentityCache, project: Option<String>) -> Self {
        let identity = executor.broadcast("identity cache", identity);
        Self {
            executor,
            identity,
            project,
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn identity(&self) -> &Broadcast<IdentityCache> {
        &self.identity
    }

    /// Project scope for records without their own `_project_id`
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }
}
