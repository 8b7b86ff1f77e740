//! Join keys and the static per-file-type key field table.

use serde_json::Value;
use std::fmt;

use crate::error::{common, ErrorCode, JoinError, Result};
use crate::model::fields::{
    ANALYSIS_ID, ANALYZED_SAMPLE_ID, MUTATION_ID, OBSERVATION_ID, PLACEMENT, SV_ID,
};
use crate::model::{FileType, Record};

/// Primary–secondary key fields per primary file type, in key order
const SECONDARY_JOIN_FIELDS: &[(FileType, &[&str])] = &[
    (FileType::SsmP, &[OBSERVATION_ID]),
    (FileType::SsmPMaskedSurrogateKey, &[OBSERVATION_ID]),
    (
        FileType::CnsmP,
        &[ANALYSIS_ID, ANALYZED_SAMPLE_ID, MUTATION_ID],
    ),
    (FileType::SgvPMasked, &[OBSERVATION_ID]),
    (
        FileType::StsmP,
        &[ANALYSIS_ID, ANALYZED_SAMPLE_ID, SV_ID, PLACEMENT],
    ),
];

const META_JOIN_FIELDS: &[&str] = &[ANALYSIS_ID, ANALYZED_SAMPLE_ID];

/// Ordered key values extracted from one record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKey(Vec<String>);

impl JoinKey {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Declared key field paths for one side of a join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyFields {
    fields: &'static [&'static str],
}

impl KeyFields {
    /// Fields joining a primary type with its secondary records
    pub fn primary_secondary(primary: FileType) -> Result<Self> {
        SECONDARY_JOIN_FIELDS
            .iter()
            .find(|(file_type, _)| *file_type == primary)
            .map(|(_, fields)| Self { fields })
            .ok_or_else(|| {
                JoinError::join_key_configuration(
                    primary,
                    "no primary-secondary join fields are registered",
                )
            })
    }

    /// Fields joining a primary type with its meta records
    pub fn meta(primary: FileType) -> Result<Self> {
        Self::primary_secondary(primary)?;
        Ok(Self {
            fields: META_JOIN_FIELDS,
        })
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Extract the key of `record`, read as a record of `file_type`.
    ///
    /// Every declared field must hold a scalar value.
    pub fn extract(&self, record: &Record, file_type: FileType) -> Result<JoinKey> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let value = match record.get(field) {
                None | Some(Value::Null) => {
                    return Err(common::join_key_field_missing(file_type.id(), field))
                }
                Some(Value::Array(_)) | Some(Value::Object(_)) => {
                    return Err(JoinError::missing_join_key(
                        ErrorCode::JOIN_KEY_FIELD_INVALID,
                        file_type,
                        *field,
                        "key fields must hold a scalar value",
                    ))
                }
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            values.push(value);
        }
        Ok(JoinKey(values))
    }

    /// Remove the key fields, which the joined parent record already carries
    pub fn strip(&self, record: &mut Record) {
        for field in self.fields {
            record.remove(field);
        }
    }
}

/// Check that every requested output type has registered key fields
pub fn validate_registered(outputs: &[FileType]) -> Result<()> {
    for output in outputs {
        let primary = output.primary_for_output().map_err(|_| {
            JoinError::join_key_configuration(*output, "not a joinable output type")
        })?;
        KeyFields::primary_secondary(primary)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_follows_declared_order() {
        let fields = KeyFields::primary_secondary(FileType::StsmP).unwrap();
        let key = fields
            .extract(
                &record(json!({
                    "placement": 1,
                    "sv_id": "SV7",
                    "analysis_id": "A1",
                    "analyzed_sample_id": "S1",
                    "other": "ignored"
                })),
                FileType::StsmP,
            )
            .unwrap();

        assert_eq!(key.values(), &["A1", "S1", "SV7", "1"]);
        assert_eq!(key.to_string(), "A1/S1/SV7/1");
    }

    #[test]
    fn test_absent_or_null_key_field_is_a_data_error() {
        let fields = KeyFields::primary_secondary(FileType::SsmP).unwrap();

        let err = fields
            .extract(&record(json!({"marking": "OPEN"})), FileType::SsmS)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::JOIN_KEY_FIELD_MISSING);
        assert_eq!(err.file_type(), Some("ssm_s"));
        assert!(err.is_data_integrity());

        let err = fields
            .extract(&record(json!({"observation_id": null})), FileType::SsmP)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::JOIN_KEY_FIELD_MISSING);

        let err = fields
            .extract(&record(json!({"observation_id": ["O1"]})), FileType::SsmP)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::JOIN_KEY_FIELD_INVALID);
    }

    #[test]
    fn test_strip_removes_only_key_fields() {
        let fields = KeyFields::primary_secondary(FileType::SsmP).unwrap();
        let mut consequence = record(json!({"observation_id": "O1", "gene": "TP53"}));
        fields.strip(&mut consequence);
        assert_eq!(consequence.into_value(), json!({"gene": "TP53"}));
    }

    #[test]
    fn test_meta_fields_shared_by_primary_types() {
        for primary in [FileType::SsmP, FileType::CnsmP, FileType::StsmP] {
            assert_eq!(
                KeyFields::meta(primary).unwrap().fields(),
                &[ANALYSIS_ID, ANALYZED_SAMPLE_ID]
            );
        }
    }

    #[test]
    fn test_unregistered_types_rejected() {
        let err = KeyFields::primary_secondary(FileType::SsmM).unwrap_err();
        assert_eq!(err.code(), ErrorCode::JOIN_KEY_NOT_REGISTERED);
        assert!(!err.is_data_integrity());

        assert!(validate_registered(&[FileType::Ssm, FileType::Observation, FileType::Cnsm]).is_ok());
        let err = validate_registered(&[FileType::SsmM]).unwrap_err();
        assert_eq!(err.file_type(), Some("ssm_m"));
    }
}
