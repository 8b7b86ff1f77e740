//! Common test utilities and fixtures

#![allow(dead_code)]

use occurrence_join::config::JobConfig;
use occurrence_join::model::{FileType, Record};
use occurrence_join::storage::MemoryStore;
use occurrence_join::substrate::{Dataset, Executor, ExecutorConfig};
use serde_json::{json, Value};

pub const PROJECT: &str = "BRCA-UK";

pub fn record(value: Value) -> Record {
    Record::from_value(value).expect("fixture must be a JSON object")
}

pub fn records(values: Vec<Value>) -> Vec<Record> {
    values.into_iter().map(record).collect()
}

pub fn dataset<T: From<Record>>(values: Vec<Value>, partitions: usize) -> Dataset<T> {
    Dataset::from_vec(
        values.into_iter().map(|v| T::from(record(v))).collect(),
        partitions,
    )
}

pub fn executor(workers: usize) -> Executor {
    Executor::new(&ExecutorConfig {
        workers,
        max_attempts: 2,
        default_partitions: 4,
    })
    .expect("executor should start")
}

/// Sample identity row as produced by upstream identifier assignment
pub fn sample_row(submitted_sample: &str, sample: &str, submitted_donor: &str, donor: &str) -> Value {
    json!({
        "_project_id": PROJECT,
        "analyzed_sample_id": submitted_sample,
        "_sample_id": sample,
        "donor_id": submitted_donor,
        "_donor_id": donor,
    })
}

pub fn default_samples() -> Vec<Value> {
    vec![
        sample_row("S1", "SA1", "d1", "DO1"),
        sample_row("N1", "SA2", "d1", "DO1"),
        sample_row("S2", "SA3", "d2", "DO2"),
    ]
}

pub fn ssm_primary(
    observation: &str,
    analysis: &str,
    sample: &str,
    mutation: &str,
    marking: &str,
) -> Value {
    json!({
        "observation_id": observation,
        "analysis_id": analysis,
        "analyzed_sample_id": sample,
        "matched_sample_id": "N1",
        "mutation_id": mutation,
        "mutation_type": "single base substitution",
        "chromosome": "17",
        "chromosome_start": 7577120,
        "chromosome_end": 7577120,
        "mutated_from_allele": "G",
        "mutated_to_allele": "A",
        "marking": marking,
        "control_genotype": "G/G",
        "tumour_genotype": "G/A",
        "quality_score": 40,
    })
}

pub fn ssm_meta(analysis: &str, sample: &str) -> Value {
    json!({
        "analysis_id": analysis,
        "analyzed_sample_id": sample,
        "platform": "Illumina HiSeq",
    })
}

pub fn ssm_secondary(observation: &str, gene: &str) -> Value {
    json!({"observation_id": observation, "gene": gene})
}

/// Job configuration scoped to the fixture project with a small pool
pub fn job_config(output_types: Vec<FileType>) -> JobConfig {
    JobConfig {
        workers: 2,
        partitions: 3,
        project: Some(PROJECT.to_string()),
        output_types,
        ..JobConfig::default()
    }
}

/// Memory store seeded with the given record sets
pub fn seeded_store(sets: Vec<(FileType, Vec<Value>)>) -> MemoryStore {
    sets.into_iter()
        .fold(MemoryStore::new(), |store, (file_type, values)| {
            store.with_records(file_type, records(values))
        })
}

/// Value of a field inside a record, by dotted path
pub fn field<'a>(record: &'a Record, path: &str) -> &'a Value {
    record.get(path).unwrap_or(&Value::Null)
}

pub fn array<'a>(record: &'a Record, field: &str) -> &'a [Value] {
    record
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
