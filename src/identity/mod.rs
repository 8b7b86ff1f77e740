//! Identity resolution cache.
//!
//! Maps submitted analyzed sample ids to surrogate sample ids and resolved
//! donor identities, per project. The cache is built in a single pass before
//! any join runs and is shared with workers through a
//! [`Broadcast`](crate::substrate::Broadcast) handle; it has no mutating
//! methods once built.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{common, ErrorCode, JoinError, Result};
use crate::model::fields::{ANALYZED_SAMPLE_ID, DONOR_ID, PROJECT_ID, SAMPLE_ID, SUBMITTED_DONOR_ID};
use crate::model::{DonorSample, FileType, Record, SampleRecord};

#[derive(Debug, Clone, Default)]
pub struct IdentityCache {
    /// project -> submitted analyzed sample id -> resolved identity
    projects: FxHashMap<String, FxHashMap<String, DonorSample>>,
}

impl IdentityCache {
    /// Build from sample surrogate key records.
    ///
    /// Every record must carry the project, the submitted and surrogate sample
    /// ids and the submitted and surrogate donor ids.
    pub fn from_sample_records<'a>(
        records: impl IntoIterator<Item = &'a SampleRecord>,
    ) -> Result<Self> {
        let mut builder = IdentityBuilder::default();
        for record in records {
            builder.add(donor_sample_of(record)?)?;
        }
        Ok(builder.finish())
    }

    /// Build from an already resolved donor/sample mapping
    pub fn from_donor_samples(samples: impl IntoIterator<Item = DonorSample>) -> Result<Self> {
        let mut builder = IdentityBuilder::default();
        for sample in samples {
            builder.add(sample)?;
        }
        Ok(builder.finish())
    }

    pub fn len(&self) -> usize {
        self.projects.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    /// Resolved identity of a submitted analyzed sample id
    pub fn donor_sample(
        &self,
        file_type: FileType,
        project: &str,
        submitted_sample_id: &str,
    ) -> Result<&DonorSample> {
        self.project(file_type, project)?
            .get(submitted_sample_id)
            .ok_or_else(|| common::sample_not_found(file_type.id(), submitted_sample_id))
    }

    /// Surrogate sample id of a submitted analyzed sample id
    pub fn sample_id(
        &self,
        file_type: FileType,
        project: &str,
        submitted_sample_id: &str,
    ) -> Result<&str> {
        Ok(self
            .donor_sample(file_type, project, submitted_sample_id)?
            .sample_id
            .as_str())
    }

    /// Surrogate sample id of a submitted matched (control) sample id
    pub fn matched_sample_id(
        &self,
        file_type: FileType,
        project: &str,
        matched_sample_id: &str,
    ) -> Result<&str> {
        self.project(file_type, project)?
            .get(matched_sample_id)
            .map(|sample| sample.sample_id.as_str())
            .ok_or_else(|| common::matched_sample_not_found(file_type.id(), matched_sample_id))
    }

    /// Project a record belongs to: its own `_project_id`, else the job's project scope
    pub fn resolve_project(
        &self,
        file_type: FileType,
        record: &Record,
        job_project: Option<&str>,
    ) -> Result<String> {
        if let Some(project) = record.text(PROJECT_ID) {
            return Ok(project);
        }
        job_project.map(str::to_string).ok_or_else(|| {
            JoinError::identity_with_code(
                ErrorCode::IDENTITY_PROJECT_NOT_FOUND,
                file_type,
                record
                    .text(ANALYZED_SAMPLE_ID)
                    .unwrap_or_else(|| "<unknown>".to_string()),
                "record has no _project_id and the job has no project scope",
            )
        })
    }

    fn project(&self, file_type: FileType, project: &str) -> Result<&FxHashMap<String, DonorSample>> {
        self.projects
            .get(project)
            .ok_or_else(|| common::project_not_found(file_type.id(), project))
    }
}

#[derive(Default)]
struct IdentityBuilder {
    projects: FxHashMap<String, FxHashMap<String, DonorSample>>,
}

impl IdentityBuilder {
    fn add(&mut self, sample: DonorSample) -> Result<()> {
        let samples = self.projects.entry(sample.project_id.clone()).or_default();
        match samples.get(&sample.submitted_sample_id) {
            Some(existing) if *existing != sample => Err(JoinError::identity_with_code(
                ErrorCode::IDENTITY_CONFLICT,
                FileType::SampleSurrogateKey,
                sample.submitted_sample_id.clone(),
                format!(
                    "conflicting identities in project {}: sample {} donor {} vs sample {} donor {}",
                    sample.project_id,
                    existing.sample_id,
                    existing.donor_id,
                    sample.sample_id,
                    sample.donor_id
                ),
            )),
            Some(_) => Ok(()),
            None => {
                samples.insert(sample.submitted_sample_id.clone(), sample);
                Ok(())
            }
        }
    }

    fn finish(self) -> IdentityCache {
        let cache = IdentityCache {
            projects: self.projects,
        };
        debug!(
            projects = cache.projects.len(),
            samples = cache.len(),
            "Identity cache built"
        );
        cache
    }
}

fn donor_sample_of(record: &SampleRecord) -> Result<DonorSample> {
    let required = |value: Option<String>, field: &str| {
        value.ok_or_else(|| {
            JoinError::identity_with_code(
                ErrorCode::IDENTITY_INCOMPLETE_RECORD,
                FileType::SampleSurrogateKey,
                record
                    .analyzed_sample_id()
                    .unwrap_or_else(|| "<unknown>".to_string()),
                format!("sample record has no {}", field),
            )
        })
    };

    Ok(DonorSample {
        project_id: required(record.project_id(), PROJECT_ID)?,
        submitted_donor_id: required(record.submitted_donor_id(), SUBMITTED_DONOR_ID)?,
        donor_id: required(record.donor_id(), DONOR_ID)?,
        submitted_sample_id: required(record.analyzed_sample_id(), ANALYZED_SAMPLE_ID)?,
        sample_id: required(record.sample_id(), SAMPLE_ID)?,
    })
}
