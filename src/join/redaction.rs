//! Controlled-data redaction.

use serde_json::Value;

use crate::error::Result;
use crate::model::fields::{CONSEQUENCE_ARRAY, DEFAULT_CONTROLLED_FIELDS, OBSERVATION_ARRAY};
use crate::model::{ConsequenceRecord, Marking, MutationRecord, Record};
use crate::substrate::{Dataset, Executor};

/// Strips controlled fields from open records and drops controlled ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redactor {
    controlled_fields: Vec<String>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(DEFAULT_CONTROLLED_FIELDS.iter().copied())
    }
}

impl Redactor {
    pub fn new<I, S>(controlled_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            controlled_fields: controlled_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn controlled_fields(&self) -> &[String] {
        &self.controlled_fields
    }

    /// Open-access form of `record`, or `None` when the record is controlled.
    ///
    /// A record without a resolvable marking is an error.
    pub fn redact(&self, record: &Record) -> Result<Option<Record>> {
        if Marking::resolve(record)?.is_controlled() {
            return Ok(None);
        }
        let mut open = record.clone();
        self.strip(&mut open);
        Ok(Some(open))
    }

    /// Remove every controlled field path from `record`; absent paths are skipped
    pub fn strip(&self, record: &mut Record) {
        for field in &self.controlled_fields {
            record.remove(field);
        }
    }

    /// Strip an occurrence and each of its observation and consequence entries.
    ///
    /// A nested entry that is not an object cannot be stripped and is an error.
    pub fn strip_occurrence(&self, occurrence: &mut Record) -> Result<()> {
        self.strip(occurrence);
        for array in [OBSERVATION_ARRAY, CONSEQUENCE_ARRAY] {
            let stripped = match occurrence.get(array) {
                Some(Value::Array(entries)) => entries
                    .iter()
                    .map(|entry| {
                        let mut entry = Record::from_value(entry.clone())
                            .map_err(|e| e.with_context(format!("redacting {} entry", array)))?;
                        self.strip(&mut entry);
                        Ok(entry.into_value())
                    })
                    .collect::<Result<Vec<Value>>>()?,
                _ => continue,
            };
            *occurrence.array_mut(array) = stripped;
        }
        Ok(())
    }

    /// Secondary records with every controlled field path removed
    pub fn strip_dataset(
        &self,
        exec: &Executor,
        secondary: &Dataset<ConsequenceRecord>,
    ) -> Result<Dataset<ConsequenceRecord>> {
        secondary.map(exec, "strip consequences", |record| {
            let mut record = record.clone();
            self.strip(record.as_record_mut());
            record
        })
    }

    /// Open-access primary records: controlled ones filtered out, the rest stripped
    pub fn redact_dataset(
        &self,
        exec: &Executor,
        primary: &Dataset<MutationRecord>,
    ) -> Result<Dataset<MutationRecord>> {
        primary.try_flat_map(exec, "redact", |record| {
            Ok(self.redact(record.as_record())?.map(MutationRecord::from))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_controlled_records_dropped() {
        let redactor = Redactor::default();
        let controlled = record(json!({"marking": "CONTROLLED", "quality_score": 12}));
        assert_eq!(redactor.redact(&controlled).unwrap(), None);
    }

    #[test]
    fn test_open_records_stripped_in_place() {
        let redactor = Redactor::new(["quality_score", "detail.raw"]);
        let open = record(json!({
            "marking": "OPEN",
            "quality_score": 12,
            "detail": {"raw": "AC", "kept": true},
            "mutation_id": "MU1"
        }));

        let redacted = redactor.redact(&open).unwrap().unwrap();
        assert_eq!(
            redacted.into_value(),
            json!({"marking": "OPEN", "detail": {"kept": true}, "mutation_id": "MU1"})
        );
    }

    #[test]
    fn test_masked_records_are_open() {
        let redactor = Redactor::default();
        let masked = record(json!({"marking": "MASKED", "tumour_genotype": "A/T"}));
        let redacted = redactor.redact(&masked).unwrap().unwrap();
        assert!(!redacted.contains("tumour_genotype"));
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let redactor = Redactor::default();
        let open = record(json!({"marking": "OPEN", "probability": 0.9, "gene": "TP53"}));

        let once = redactor.redact(&open).unwrap().unwrap();
        let twice = redactor.redact(&once).unwrap().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_marking_is_fatal() {
        let err = Redactor::default()
            .redact(&record(json!({"mutation_id": "MU1"})))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MARKING_MISSING);
        assert!(err.is_data_integrity());
    }

    #[test]
    fn test_strip_occurrence_reaches_nested_entries() {
        let redactor = Redactor::new(["quality_score", "probability"]);
        let mut occurrence = record(json!({
            "mutation_id": "MU1",
            "quality_score": 3,
            "consequence": [{"gene": "TP53", "probability": 0.97}],
            "observation": [{"quality_score": 1, "analysis_id": "A1"}, {"analysis_id": "A2"}]
        }));

        redactor.strip_occurrence(&mut occurrence).unwrap();
        assert_eq!(
            occurrence.into_value(),
            json!({
                "mutation_id": "MU1",
                "consequence": [{"gene": "TP53"}],
                "observation": [{"analysis_id": "A1"}, {"analysis_id": "A2"}]
            })
        );
    }

    #[test]
    fn test_non_object_entry_fails_redaction() {
        let redactor = Redactor::default();
        let mut occurrence = record(json!({
            "mutation_id": "MU1",
            "observation": [{"analysis_id": "A1"}, "quality_score=40"]
        }));

        let err = redactor.strip_occurrence(&mut occurrence).unwrap_err();
        assert_eq!(err.code(), ErrorCode::STORAGE_DESERIALIZATION_ERROR);
        assert!(err.to_string().contains("observation"), "{}", err);
    }

    #[test]
    fn test_strip_dataset_keeps_every_record() {
        let exec = Executor::new(&crate::substrate::ExecutorConfig {
            workers: 1,
            max_attempts: 1,
            default_partitions: 2,
        })
        .unwrap();
        let redactor = Redactor::new(["probability"]);
        let secondary: Dataset<ConsequenceRecord> = Dataset::from_vec(
            vec![
                record(json!({"observation_id": "O1", "probability": 0.5})).into(),
                record(json!({"observation_id": "O2"})).into(),
            ],
            2,
        );

        let stripped = redactor.strip_dataset(&exec, &secondary).unwrap();
        assert_eq!(stripped.len(), 2);
        assert!(stripped.iter().all(|c| !c.as_record().contains("probability")));
    }
}
