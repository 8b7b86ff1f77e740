//! Set aggregation of high-cardinality secondary records per key.
//!
//! [`seq_op`] folds one record into a partition-local set and [`comb_op`]
//! unions two partial sets. Both are associative and commutative, so the
//! result is the same for any partitioning and any merge order.

use rustc_hash::FxHashSet;

use super::keys::JoinKey;
use crate::error::Result;
use crate::model::ConsequenceRecord;
use crate::substrate::{Dataset, Executor};

pub type ConsequenceSet = FxHashSet<ConsequenceRecord>;

pub fn seq_op(mut acc: ConsequenceSet, record: &ConsequenceRecord) -> ConsequenceSet {
    acc.insert(record.clone());
    acc
}

pub fn comb_op(left: ConsequenceSet, right: ConsequenceSet) -> ConsequenceSet {
    let (mut larger, smaller) = if left.len() >= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    larger.extend(smaller);
    larger
}

/// Aggregate keyed secondary records into one set per key
pub fn aggregate_consequences(
    exec: &Executor,
    keyed: &Dataset<(JoinKey, ConsequenceRecord)>,
    num_partitions: usize,
) -> Result<Dataset<(JoinKey, ConsequenceSet)>> {
    keyed.aggregate_by_key(
        exec,
        "aggregate consequences",
        ConsequenceSet::default(),
        seq_op,
        comb_op,
        num_partitions,
    )
}
