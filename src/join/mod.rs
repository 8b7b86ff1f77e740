//! Join and aggregation core.
//!
//! Stages, in pipeline order: primary–secondary left outer join, meta inner
//! join, regrouping by resolved donor and mutation, occurrence building.
//! Redaction and the set-based consequence aggregator are used by the tasks
//! in [`crate::task`].

pub mod consequences;
pub mod keys;
pub mod meta;
pub mod occurrence;
pub mod primary_secondary;
pub mod redaction;

pub use consequences::{aggregate_consequences, comb_op, seq_op, ConsequenceSet};
pub use keys::{validate_registered, JoinKey, KeyFields};
pub use meta::{group_by_donor_mutation, join_meta, DonorMutationKey, Observation};
pub use occurrence::build_occurrence;
pub use primary_secondary::{join_primary_secondary, PrimarySecondary};
pub use redaction::Redactor;
