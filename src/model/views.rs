//! Typed views over the record kinds the join consumes.
//!
//! Each view is a transparent wrapper around [`Record`]; the wrappers only
//! add accessors for the well-known fields of their kind, so unknown
//! submission fields pass through untouched.

use serde::{Deserialize, Serialize};

use super::fields;
use super::marking::Marking;
use super::record::Record;
use crate::error::JoinError;

macro_rules! record_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Record);

        impl $name {
            pub fn as_record(&self) -> &Record {
                &self.0
            }

            pub fn as_record_mut(&mut self) -> &mut Record {
                &mut self.0
            }

            pub fn into_record(self) -> Record {
                self.0
            }
        }

        impl From<Record> for $name {
            fn from(record: Record) -> Self {
                Self(record)
            }
        }

        impl From<$name> for Record {
            fn from(view: $name) -> Self {
                view.0
            }
        }
    };
}

record_view!(
    /// Primary (`_P`) row: one (analyzed sample, mutation, analysis) observation
    MutationRecord
);

record_view!(
    /// Secondary (`_S`) row: consequence annotation for a primary key
    ConsequenceRecord
);

record_view!(
    /// Meta (`_M`) row: sequencing and analysis metadata for one analyzed sample
    MetaRecord
);

record_view!(
    /// Sample row mapping a submitted analyzed sample id to surrogate identities
    SampleRecord
);

impl MutationRecord {
    pub fn observation_id(&self) -> Option<String> {
        self.0.text(fields::OBSERVATION_ID)
    }

    pub fn analysis_id(&self) -> Option<String> {
        self.0.text(fields::ANALYSIS_ID)
    }

    pub fn analyzed_sample_id(&self) -> Option<String> {
        self.0.text(fields::ANALYZED_SAMPLE_ID)
    }

    pub fn matched_sample_id(&self) -> Option<String> {
        self.0.text(fields::MATCHED_SAMPLE_ID)
    }

    pub fn mutation_id(&self) -> Option<String> {
        self.0.text(fields::MUTATION_ID)
    }

    pub fn marking(&self) -> Result<Marking, JoinError> {
        Marking::resolve(&self.0)
    }
}

impl MetaRecord {
    pub fn analysis_id(&self) -> Option<String> {
        self.0.text(fields::ANALYSIS_ID)
    }

    pub fn analyzed_sample_id(&self) -> Option<String> {
        self.0.text(fields::ANALYZED_SAMPLE_ID)
    }
}

impl SampleRecord {
    pub fn project_id(&self) -> Option<String> {
        self.0.text(fields::PROJECT_ID)
    }

    pub fn analyzed_sample_id(&self) -> Option<String> {
        self.0.text(fields::ANALYZED_SAMPLE_ID)
    }

    pub fn sample_id(&self) -> Option<String> {
        self.0.text(fields::SAMPLE_ID)
    }

    pub fn submitted_donor_id(&self) -> Option<String> {
        self.0.text(fields::SUBMITTED_DONOR_ID)
    }

    pub fn donor_id(&self) -> Option<String> {
        self.0.text(fields::DONOR_ID)
    }
}
