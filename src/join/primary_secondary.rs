//! Left outer join of primary records with their grouped secondary records.

use tracing::debug;

use super::keys::{JoinKey, KeyFields};
use crate::error::Result;
use crate::model::{ConsequenceRecord, FileType, MutationRecord};
use crate::substrate::{Dataset, Executor};

/// A primary record with every secondary record sharing its key
#[derive(Debug, Clone, PartialEq)]
pub struct PrimarySecondary {
    pub key: JoinKey,
    pub primary: MutationRecord,
    pub consequences: Vec<ConsequenceRecord>,
}

/// Pair every primary record with the secondary records of its key.
///
/// A primary record without secondary records is kept with an empty
/// consequence collection. Secondary records lose their key fields and are
/// grouped into the primary side's partition count.
pub fn join_primary_secondary(
    exec: &Executor,
    primary_type: FileType,
    primary: &Dataset<MutationRecord>,
    secondary: &Dataset<ConsequenceRecord>,
) -> Result<Dataset<PrimarySecondary>> {
    let key_fields = KeyFields::primary_secondary(primary_type)?;
    let secondary_type = primary_type.secondary_type()?;
    let num_partitions = primary.num_partitions();

    let keyed_primary = primary.key_by(exec, "key primary", |record| {
        key_fields.extract(record.as_record(), primary_type)
    })?;
    let grouped_secondary = secondary
        .try_map(exec, "key secondary", |record| {
            let key = key_fields.extract(record.as_record(), secondary_type)?;
            let mut consequence = record.clone();
            key_fields.strip(consequence.as_record_mut());
            Ok((key, consequence))
        })?
        .group_by_key(exec, "group secondary", num_partitions)?;

    debug!(
        file_type = %primary_type,
        primary = keyed_primary.len(),
        secondary_keys = grouped_secondary.len(),
        "Joining primary with secondary records"
    );

    keyed_primary
        .left_outer_join(exec, "primary-secondary join", &grouped_secondary, num_partitions)?
        .map(exec, "primary-secondary pairs", |(key, (primary, consequences))| {
            PrimarySecondary {
                key: key.clone(),
                primary: primary.clone(),
                consequences: consequences.clone().unwrap_or_default(),
            }
        })
}
