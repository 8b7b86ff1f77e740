//! Meta join and regrouping by resolved donor and mutation.

use tracing::debug;

use super::keys::{JoinKey, KeyFields};
use super::primary_secondary::PrimarySecondary;
use crate::error::{common, Result};
use crate::identity::IdentityCache;
use crate::model::fields::{ANALYZED_SAMPLE_ID, MUTATION_ID};
use crate::model::{ConsequenceRecord, FileType, MetaRecord, MutationRecord};
use crate::substrate::{Broadcast, Dataset, Executor};

/// One analysis of a mutation: primary record, its consequences and its meta record
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub primary: MutationRecord,
    pub consequences: Vec<ConsequenceRecord>,
    pub meta: MetaRecord,
}

/// Occurrence identity: resolved donor and mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DonorMutationKey {
    pub donor_id: String,
    pub mutation_id: String,
}

/// Inner join on `(analysis_id, analyzed_sample_id)`; primary records without meta are dropped
pub fn join_meta(
    exec: &Executor,
    primary_type: FileType,
    joined: &Dataset<PrimarySecondary>,
    meta: &Dataset<MetaRecord>,
) -> Result<Dataset<Observation>> {
    let key_fields = KeyFields::meta(primary_type)?;
    let meta_type = primary_type.meta_type()?;
    let num_partitions = joined.num_partitions();

    let keyed_joined = joined.try_map(exec, "key observation", |pair| {
        Ok((
            key_fields.extract(pair.primary.as_record(), primary_type)?,
            pair.clone(),
        ))
    })?;
    let keyed_meta = meta.key_by(exec, "key meta", |record| {
        key_fields.extract(record.as_record(), meta_type)
    })?;

    let observations = keyed_joined
        .join(exec, "meta join", &keyed_meta, num_partitions)?
        .map(exec, "observations", |(_, (pair, meta)): &(JoinKey, (PrimarySecondary, MetaRecord))| {
            Observation {
                primary: pair.primary.clone(),
                consequences: pair.consequences.clone(),
                meta: meta.clone(),
            }
        })?;

    debug!(
        file_type = %primary_type,
        joined = joined.len(),
        observations = observations.len(),
        "Meta join complete"
    );
    Ok(observations)
}

/// Resolve the donor of every observation and group by donor and mutation.
///
/// A submitted sample id missing from the identity cache fails the stage.
pub fn group_by_donor_mutation(
    exec: &Executor,
    primary_type: FileType,
    observations: &Dataset<Observation>,
    identity: &Broadcast<IdentityCache>,
    job_project: Option<&str>,
) -> Result<Dataset<(DonorMutationKey, Vec<Observation>)>> {
    let keyed = observations.try_map(exec, "resolve donors", |observation| {
        Ok((
            donor_mutation_key(primary_type, &observation.primary, identity, job_project)?,
            observation.clone(),
        ))
    })?;

    keyed.group_by_key(exec, "group by donor", observations.num_partitions())
}

fn donor_mutation_key(
    primary_type: FileType,
    primary: &MutationRecord,
    identity: &IdentityCache,
    job_project: Option<&str>,
) -> Result<DonorMutationKey> {
    let record = primary.as_record();
    let project = identity.resolve_project(primary_type, record, job_project)?;
    let sample_id = primary
        .analyzed_sample_id()
        .ok_or_else(|| common::join_key_field_missing(primary_type.id(), ANALYZED_SAMPLE_ID))?;
    let mutation_id = primary
        .mutation_id()
        .ok_or_else(|| common::join_key_field_missing(primary_type.id(), MUTATION_ID))?;

    let donor = identity.donor_sample(primary_type, &project, &sample_id)?;
    Ok(DonorMutationKey {
        donor_id: donor.donor_id.clone(),
        mutation_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::join::primary_secondary::join_primary_secondary;
    use crate::model::{Record, SampleRecord};
    use crate::substrate::ExecutorConfig;
    use serde_json::{json, Value};

    fn exec() -> Executor {
        Executor::new(&ExecutorConfig {
            workers: 2,
            max_attempts: 1,
            default_partitions: 2,
        })
        .unwrap()
    }

    fn records<T: From<Record>>(values: Vec<Value>) -> Vec<T> {
        values
            .into_iter()
            .map(|v| Record::from_value(v).unwrap().into())
            .collect()
    }

    fn identity() -> Broadcast<IdentityCache> {
        let samples: Vec<SampleRecord> = records(vec![
            json!({"_project_id": "P1", "analyzed_sample_id": "S1", "_sample_id": "SA1",
                   "donor_id": "D1", "_donor_id": "DO1"}),
            json!({"_project_id": "P1", "analyzed_sample_id": "S2", "_sample_id": "SA2",
                   "donor_id": "D1", "_donor_id": "DO1"}),
        ]);
        Broadcast::new(IdentityCache::from_sample_records(&samples).unwrap())
    }

    fn primary_row(observation: &str, sample: &str, analysis: &str) -> Value {
        json!({
            "observation_id": observation,
            "analysis_id": analysis,
            "analyzed_sample_id": sample,
            "mutation_id": "MU1",
            "_project_id": "P1",
            "marking": "OPEN"
        })
    }

    fn observations(exec: &Executor, primaries: Vec<Value>) -> Dataset<Observation> {
        let primary = Dataset::from_vec(records(primaries), 2);
        let secondary = Dataset::from_vec(Vec::new(), 1);
        let meta = Dataset::from_vec(
            records(vec![
                json!({"analysis_id": "A1", "analyzed_sample_id": "S1", "platform": "Illumina"}),
                json!({"analysis_id": "A2", "analyzed_sample_id": "S2", "platform": "SOLiD"}),
            ]),
            1,
        );
        let joined = join_primary_secondary(exec, FileType::SsmP, &primary, &secondary).unwrap();
        join_meta(exec, FileType::SsmP, &joined, &meta).unwrap()
    }

    #[test]
    fn test_primary_without_meta_is_dropped() {
        let exec = exec();
        let observed = observations(
            &exec,
            vec![primary_row("O1", "S1", "A1"), primary_row("O2", "S1", "A9")],
        )
        .collect();

        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].primary.observation_id().as_deref(), Some("O1"));
        assert_eq!(observed[0].meta.as_record().text("platform").as_deref(), Some("Illumina"));
    }

    #[test]
    fn test_analyses_of_one_donor_share_a_group() {
        let exec = exec();
        let observed = observations(
            &exec,
            vec![primary_row("O1", "S1", "A1"), primary_row("O2", "S2", "A2")],
        );

        let groups = group_by_donor_mutation(&exec, FileType::SsmP, &observed, &identity(), None)
            .unwrap()
            .collect();

        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].0,
            DonorMutationKey {
                donor_id: "DO1".into(),
                mutation_id: "MU1".into()
            }
        );
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_unknown_sample_fails_grouping() {
        let exec = exec();
        let meta = Dataset::from_vec(
            records(vec![json!({"analysis_id": "A1", "analyzed_sample_id": "S9"})]),
            1,
        );
        let primary = Dataset::from_vec(records(vec![primary_row("O1", "S9", "A1")]), 1);
        let joined =
            join_primary_secondary(&exec, FileType::SsmP, &primary, &Dataset::empty(1)).unwrap();
        let observed = join_meta(&exec, FileType::SsmP, &joined, &meta).unwrap();

        let err = group_by_donor_mutation(&exec, FileType::SsmP, &observed, &identity(), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::IDENTITY_SAMPLE_NOT_FOUND);
        assert!(err.to_string().contains("'S9'"));
    }
}
