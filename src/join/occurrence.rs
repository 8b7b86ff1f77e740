//! Folding a donor-mutation group into one occurrence record.
//!
//! An occurrence holds the mutation-level fields once, the resolved donor
//! identifiers, every consequence contributed by the group and one
//! `observation` entry per analysis. Members are ordered by
//! `(analysis_id, analyzed_sample_id, observation_id)` before folding, so the
//! result does not depend on the order the group was assembled in.

use serde_json::Value;

use super::meta::{DonorMutationKey, Observation};
use crate::error::{common, JoinError, Result};
use crate::identity::IdentityCache;
use crate::model::fields::{
    ANALYZED_SAMPLE_ID, CONSEQUENCE_ARRAY, DONOR_ID, MATCHED_SAMPLE_SURROGATE_ID,
    MUTATION_FIELDS, OBSERVATION_ARRAY, SAMPLE_ID, SUBMITTED_DONOR_ID,
};
use crate::model::{canonical_value, FileType, Record};

/// Build the occurrence of one donor-mutation group
pub fn build_occurrence(
    primary_type: FileType,
    key: &DonorMutationKey,
    group: &[Observation],
    identity: &IdentityCache,
    job_project: Option<&str>,
) -> Result<Record> {
    let mut members: Vec<&Observation> = group.iter().collect();
    members.sort_by_cached_key(|member| member_order(member));

    let representative = members.first().ok_or_else(|| {
        JoinError::execution(
            "build occurrences",
            format!("empty group for donor {} mutation {}", key.donor_id, key.mutation_id),
        )
    })?;

    let mut occurrence = Record::new();
    let source = representative.primary.as_record();
    for field in MUTATION_FIELDS {
        if let Some(value) = source.get(field) {
            occurrence.insert(*field, value.clone());
        }
    }

    let project = identity.resolve_project(primary_type, source, job_project)?;
    let submitted_sample = submitted_sample_id(primary_type, source)?;
    let donor = identity.donor_sample(primary_type, &project, &submitted_sample)?;
    occurrence.insert(DONOR_ID, key.donor_id.clone());
    occurrence.insert(SUBMITTED_DONOR_ID, donor.submitted_donor_id.clone());

    let mut consequences: Vec<Value> = members
        .iter()
        .flat_map(|member| member.consequences.iter())
        .map(|consequence| consequence.as_record().clone().into_value())
        .collect();
    consequences.sort_by_cached_key(canonical_value);
    *occurrence.array_mut(CONSEQUENCE_ARRAY) = consequences;

    let mut observations = Vec::with_capacity(members.len());
    for member in &members {
        observations.push(observation_entry(primary_type, member, identity, job_project)?);
    }
    *occurrence.array_mut(OBSERVATION_ARRAY) = observations;

    Ok(occurrence)
}

fn observation_entry(
    primary_type: FileType,
    member: &Observation,
    identity: &IdentityCache,
    job_project: Option<&str>,
) -> Result<Value> {
    let source = member.primary.as_record();
    let project = identity.resolve_project(primary_type, source, job_project)?;

    let mut entry = source.clone();
    for field in MUTATION_FIELDS {
        entry.remove(field);
    }
    entry.remove(CONSEQUENCE_ARRAY);
    entry.merge_missing(member.meta.as_record());

    let submitted_sample = submitted_sample_id(primary_type, source)?;
    let sample_id = identity.sample_id(primary_type, &project, &submitted_sample)?;
    entry.insert(SAMPLE_ID, sample_id);

    if let Some(matched) = member.primary.matched_sample_id() {
        let matched_id = identity.matched_sample_id(primary_type, &project, &matched)?;
        entry.insert(MATCHED_SAMPLE_SURROGATE_ID, matched_id);
    }

    Ok(entry.into_value())
}

fn submitted_sample_id(primary_type: FileType, record: &Record) -> Result<String> {
    record
        .text(ANALYZED_SAMPLE_ID)
        .ok_or_else(|| common::join_key_field_missing(primary_type.id(), ANALYZED_SAMPLE_ID))
}

fn member_order(member: &Observation) -> (Option<String>, Option<String>, Option<String>, String) {
    let primary = &member.primary;
    (
        primary.analysis_id(),
        primary.analyzed_sample_id(),
        primary.observation_id(),
        primary.as_record().canonical(),
    )
}
