//! Join for copy number, germline and structural mutation types.
//!
//! Each primary record is enriched with its meta record and resolved
//! identities, then receives the set of secondary records sharing its key.
//! Secondary records are pre-aggregated per key with the set combiner into
//! the primary side's partition count.

use serde_json::Value;
use tracing::info;

use super::TaskContext;
use crate::error::{common, JoinError, Result};
use crate::identity::IdentityCache;
use crate::join::{aggregate_consequences, KeyFields};
use crate::model::fields::{
    ANALYZED_SAMPLE_ID, CONSEQUENCE_ARRAY, DONOR_ID, MATCHED_SAMPLE_SURROGATE_ID, PROJECT_ID,
    SAMPLE_ID,
};
use crate::model::{
    canonical_value, ConsequenceRecord, FileType, MetaRecord, MutationRecord, Record,
};
use crate::substrate::Dataset;

pub struct SecondaryInputs {
    pub primary: Dataset<MutationRecord>,
    pub secondary: Dataset<ConsequenceRecord>,
    pub meta: Dataset<MetaRecord>,
}

#[derive(Debug, Clone, Copy)]
pub struct SecondaryJoinTask {
    primary_type: FileType,
    output_type: FileType,
}

impl SecondaryJoinTask {
    pub fn new(primary_type: FileType) -> Result<Self> {
        let output_type = primary_type.output_type()?;
        if !matches!(output_type, FileType::Cnsm | FileType::Sgv | FileType::Stsm) {
            return Err(JoinError::join_key_configuration(
                primary_type,
                "not joined by the secondary join task",
            ));
        }
        KeyFields::primary_secondary(primary_type)?;
        Ok(Self {
            primary_type,
            output_type,
        })
    }

    pub fn primary_type(&self) -> FileType {
        self.primary_type
    }

    pub fn output_type(&self) -> FileType {
        self.output_type
    }

    pub fn run(&self, ctx: &TaskContext, inputs: SecondaryInputs) -> Result<Vec<Record>> {
        let exec = ctx.executor();
        let primary_type = self.primary_type;
        let secondary_type = primary_type.secondary_type()?;
        let meta_type = primary_type.meta_type()?;
        let meta_fields = KeyFields::meta(primary_type)?;
        let key_fields = KeyFields::primary_secondary(primary_type)?;

        info!(
            file_type = %primary_type,
            primary = inputs.primary.len(),
            secondary = inputs.secondary.len(),
            meta = inputs.meta.len(),
            "Running secondary join"
        );

        let num_partitions = inputs.primary.num_partitions();
        let keyed_primary = inputs.primary.key_by(exec, "key primary", |record| {
            meta_fields.extract(record.as_record(), primary_type)
        })?;
        let keyed_meta = inputs.meta.key_by(exec, "key meta", |record| {
            meta_fields.extract(record.as_record(), meta_type)
        })?;

        let identity = ctx.identity();
        let project = ctx.project();
        let enriched = keyed_primary
            .join(exec, "primary-meta join", &keyed_meta, num_partitions)?
            .try_map(exec, "attach identities", |(_, (primary, meta))| {
                let record = enrich(primary_type, primary, meta, identity, project)?;
                Ok((key_fields.extract(&record, primary_type)?, record))
            })?;

        let keyed_secondary = inputs.secondary.try_map(exec, "key secondary", |record| {
            let key = key_fields.extract(record.as_record(), secondary_type)?;
            let mut consequence = record.clone();
            key_fields.strip(consequence.as_record_mut());
            Ok((key, consequence))
        })?;
        let aggregated = aggregate_consequences(exec, &keyed_secondary, num_partitions)?;

        let mut output = enriched
            .left_outer_join(exec, "primary-secondary join", &aggregated, num_partitions)?
            .map(exec, "append consequences", |(_, (record, consequences))| {
                let mut record = record.clone();
                let mut values: Vec<Value> = consequences
                    .iter()
                    .flatten()
                    .map(|c| c.as_record().clone().into_value())
                    .collect();
                values.sort_by_cached_key(canonical_value);
                record.array_mut(CONSEQUENCE_ARRAY).extend(values);
                record
            })?
            .collect();
        output.sort_by_cached_key(Record::canonical);

        info!(
            file_type = %self.output_type,
            records = output.len(),
            "Secondary join complete"
        );
        Ok(output)
    }
}

/// Primary record with meta fields and resolved donor, sample and project ids
fn enrich(
    primary_type: FileType,
    primary: &MutationRecord,
    meta: &MetaRecord,
    identity: &IdentityCache,
    job_project: Option<&str>,
) -> Result<Record> {
    let mut record = primary.as_record().clone();
    record.merge_missing(meta.as_record());

    let project = identity.resolve_project(primary_type, &record, job_project)?;
    let submitted_sample = record
        .text(ANALYZED_SAMPLE_ID)
        .ok_or_else(|| common::join_key_field_missing(primary_type.id(), ANALYZED_SAMPLE_ID))?;
    let donor = identity.donor_sample(primary_type, &project, &submitted_sample)?;

    record.insert(DONOR_ID, donor.donor_id.clone());
    record.insert(SAMPLE_ID, donor.sample_id.clone());
    record.insert(PROJECT_ID, project.clone());

    if let Some(matched) = primary.matched_sample_id() {
        let matched_id = identity.matched_sample_id(primary_type, &project, &matched)?;
        record.insert(MATCHED_SAMPLE_SURROGATE_ID, matched_id);
    }

    Ok(record)
}
