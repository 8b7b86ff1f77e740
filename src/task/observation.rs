//! Simple somatic mutation join: full `SSM` and redacted `OBSERVATION` outputs.
//!
//! Both outputs are derived from the same cached inputs by running the whole
//! join pipeline twice, once over every primary record and once over the
//! open-access primary records only. Consequence grouping depends on which
//! primary records take part, so the redacted output is not a filter of the
//! full one.

use tracing::info;

use super::TaskContext;
use crate::error::Result;
use crate::join::{
    build_occurrence, group_by_donor_mutation, join_meta, join_primary_secondary, KeyFields,
    Redactor,
};
use crate::model::{ConsequenceRecord, FileType, MetaRecord, MutationRecord, Record};
use crate::substrate::Dataset;

pub struct ObservationInputs {
    pub primary: Dataset<MutationRecord>,
    pub secondary: Dataset<ConsequenceRecord>,
    pub meta: Dataset<MetaRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationOutputs {
    /// Occurrences over every primary record
    pub ssm: Vec<Record>,
    /// Occurrences over open-access primary records, controlled fields stripped
    pub observation: Vec<Record>,
}

#[derive(Debug, Clone)]
pub struct ObservationJoinTask {
    primary_type: FileType,
    redactor: Redactor,
}

impl ObservationJoinTask {
    pub fn new(primary_type: FileType, redactor: Redactor) -> Result<Self> {
        KeyFields::primary_secondary(primary_type)?;
        primary_type.meta_type()?;
        Ok(Self {
            primary_type,
            redactor,
        })
    }

    pub fn primary_type(&self) -> FileType {
        self.primary_type
    }

    /// Compute both outputs; nothing is returned unless both succeed
    pub fn run(&self, ctx: &TaskContext, inputs: ObservationInputs) -> Result<ObservationOutputs> {
        info!(
            file_type = %self.primary_type,
            primary = inputs.primary.len(),
            secondary = inputs.secondary.len(),
            meta = inputs.meta.len(),
            "Running observation join"
        );

        let ssm = self.join_occurrences(ctx, &inputs.primary, &inputs.secondary, &inputs.meta)?;

        let open_primary = self
            .redactor
            .redact_dataset(ctx.executor(), &inputs.primary)?;
        let open_secondary = self
            .redactor
            .strip_dataset(ctx.executor(), &inputs.secondary)?;
        let mut observation =
            self.join_occurrences(ctx, &open_primary, &open_secondary, &inputs.meta)?;
        for occurrence in &mut observation {
            self.redactor.strip_occurrence(occurrence)?;
        }

        // Both outputs are derived; release the cached inputs.
        drop(open_primary);
        drop(open_secondary);
        drop(inputs);

        info!(
            file_type = %self.primary_type,
            ssm = ssm.len(),
            observation = observation.len(),
            "Observation join complete"
        );
        Ok(ObservationOutputs { ssm, observation })
    }

    /// One full pass of the join pipeline; occurrences come back ordered by donor and mutation
    pub fn join_occurrences(
        &self,
        ctx: &TaskContext,
        primary: &Dataset<MutationRecord>,
        secondary: &Dataset<ConsequenceRecord>,
        meta: &Dataset<MetaRecord>,
    ) -> Result<Vec<Record>> {
        let exec = ctx.executor();
        let primary_type = self.primary_type;

        let joined = join_primary_secondary(exec, primary_type, primary, secondary)?;
        let observations = join_meta(exec, primary_type, &joined, meta)?;
        drop(joined);

        let groups = group_by_donor_mutation(
            exec,
            primary_type,
            &observations,
            ctx.identity(),
            ctx.project(),
        )?;
        drop(observations);

        let identity = ctx.identity();
        let project = ctx.project();
        let mut occurrences = groups
            .try_map(exec, "build occurrences", |(key, group)| {
                Ok((
                    key.clone(),
                    build_occurrence(primary_type, key, group, identity, project)?,
                ))
            })?
            .collect();
        occurrences.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(occurrences.into_iter().map(|(_, record)| record).collect())
    }
}
