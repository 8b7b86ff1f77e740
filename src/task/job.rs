//! Job runner: reads inputs, runs the join tasks, writes outputs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::{
    ObservationInputs, ObservationJoinTask, SecondaryInputs, SecondaryJoinTask, TaskContext,
};
use crate::config::JobConfig;
use crate::error::{ErrorCode, JoinError, Result};
use crate::identity::IdentityCache;
use crate::join::Redactor;
use crate::model::{FileType, Record, SampleRecord};
use crate::storage::RecordStore;
use crate::substrate::{Dataset, Executor};

/// Outcome of a successful job
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records written per output type
    pub outputs: BTreeMap<FileType, usize>,
}

/// Input record sets of one primary type, partitioned
struct TaskInputs {
    primary_type: FileType,
    primary: Vec<Record>,
    secondary: Vec<Record>,
    meta: Vec<Record>,
}

impl TaskInputs {
    fn datasets<P, S, M>(self, partitions: usize) -> (Dataset<P>, Dataset<S>, Dataset<M>)
    where
        P: From<Record>,
        S: From<Record>,
        M: From<Record>,
    {
        (
            to_dataset(self.primary, partitions),
            to_dataset(self.secondary, partitions),
            to_dataset(self.meta, partitions),
        )
    }
}

fn to_dataset<T: From<Record>>(records: Vec<Record>, partitions: usize) -> Dataset<T> {
    Dataset::from_vec(records.into_iter().map(T::from).collect(), partitions)
}

/// Where the donor/sample identities come from
enum IdentitySource {
    Prebuilt(IdentityCache),
    SampleRecords(Vec<Record>),
}

pub struct JoinJob {
    config: JobConfig,
    store: Arc<dyn RecordStore>,
    identity: Option<IdentityCache>,
}

impl JoinJob {
    pub fn new(config: JobConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config,
            store,
            identity: None,
        }
    }

    /// Use a precomputed donor/sample mapping instead of deriving one from
    /// the `sample_surrogate_key` record set
    pub fn with_identity(mut self, identity: IdentityCache) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run every configured task and write their outputs.
    ///
    /// All outputs are computed before the first one is written, so a failed
    /// job leaves no new output behind.
    pub async fn run(&self) -> Result<JobSummary> {
        let job_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%job_id, outputs = ?self.config.output_types, "Starting occurrence join");

        match self.execute().await {
            Ok(outputs) => {
                let summary = JobSummary {
                    job_id,
                    started_at,
                    finished_at: Utc::now(),
                    outputs,
                };
                info!(
                    %job_id,
                    outputs = ?summary.outputs,
                    elapsed_ms = (summary.finished_at - started_at).num_milliseconds(),
                    "Occurrence join finished"
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    %job_id,
                    code = err.code(),
                    file_type = ?err.file_type(),
                    error = %err,
                    "Occurrence join failed"
                );
                Err(err)
            }
        }
    }

    async fn execute(&self) -> Result<BTreeMap<FileType, usize>> {
        self.config.validate()?;

        let wanted = &self.config.output_types;
        let observation_primary = if wanted.contains(&FileType::Ssm)
            || wanted.contains(&FileType::Observation)
        {
            Some(FileType::Ssm.primary_for_output()?)
        } else {
            None
        };
        let mut secondary_primaries = Vec::new();
        for output in [FileType::Cnsm, FileType::Sgv, FileType::Stsm] {
            if wanted.contains(&output) {
                secondary_primaries.push(output.primary_for_output()?);
            }
        }

        let identity = match &self.identity {
            Some(cache) => IdentitySource::Prebuilt(cache.clone()),
            None => {
                IdentitySource::SampleRecords(self.store.read(FileType::SampleSurrogateKey).await?)
            }
        };
        let observation_inputs = match observation_primary {
            Some(primary_type) => Some(self.read_inputs(primary_type).await?),
            None => None,
        };
        let mut secondary_inputs = Vec::with_capacity(secondary_primaries.len());
        for primary_type in secondary_primaries {
            secondary_inputs.push(self.read_inputs(primary_type).await?);
        }

        let config = self.config.clone();
        let results = tokio::task::spawn_blocking(move || {
            compute(&config, identity, observation_inputs, secondary_inputs)
        })
        .await
        .map_err(|e| {
            JoinError::Execution {
                code: ErrorCode::EXEC_INTERRUPTED,
                stage: "join".to_string(),
                partition: None,
                message: "join worker did not complete".to_string(),
                source: None,
            }
            .with_source(e)
        })??;

        let mut written = BTreeMap::new();
        for (file_type, records) in results {
            if !wanted.contains(&file_type) {
                continue;
            }
            self.store
                .write(file_type, &records, self.config.partitions)
                .await?;
            info!(file_type = %file_type, records = records.len(), "Output written");
            written.insert(file_type, records.len());
        }
        Ok(written)
    }

    async fn read_inputs(&self, primary_type: FileType) -> Result<TaskInputs> {
        let secondary_type = primary_type.secondary_type()?;
        let meta_type = primary_type.meta_type()?;
        let (primary, secondary, meta) = futures::try_join!(
            self.store.read(primary_type),
            self.store.read(secondary_type),
            self.store.read(meta_type),
        )?;
        Ok(TaskInputs {
            primary_type,
            primary,
            secondary,
            meta,
        })
    }
}

/// Build the identity cache once, then run every task against it
fn compute(
    config: &JobConfig,
    identity: IdentitySource,
    observation_inputs: Option<TaskInputs>,
    secondary_inputs: Vec<TaskInputs>,
) -> Result<Vec<(FileType, Vec<Record>)>> {
    let executor = Arc::new(Executor::new(&config.executor_config())?);
    let identity = match identity {
        IdentitySource::Prebuilt(cache) => cache,
        IdentitySource::SampleRecords(samples) => {
            let samples: Vec<SampleRecord> =
                samples.into_iter().map(SampleRecord::from).collect();
            IdentityCache::from_sample_records(&samples)?
        }
    };
    info!(samples = identity.len(), "Identity cache ready");

    let ctx = TaskContext::new(executor, identity, config.project.clone());
    let partitions = config.partitions;
    let mut results = Vec::new();

    if let Some(inputs) = observation_inputs {
        let task = ObservationJoinTask::new(
            inputs.primary_type,
            Redactor::new(config.controlled_fields.iter().cloned()),
        )?;
        let (primary, secondary, meta) = inputs.datasets(partitions);
        let outputs = task.run(
            &ctx,
            ObservationInputs {
                primary,
                secondary,
                meta,
            },
        )?;
        results.push((FileType::Ssm, outputs.ssm));
        results.push((FileType::Observation, outputs.observation));
    }

    for inputs in secondary_inputs {
        let task = SecondaryJoinTask::new(inputs.primary_type)?;
        let (primary, secondary, meta) = inputs.datasets(partitions);
        let records = task.run(
            &ctx,
            SecondaryInputs {
                primary,
                secondary,
                meta,
            },
        )?;
        results.push((task.output_type(), records));
    }

    Ok(results)
}
