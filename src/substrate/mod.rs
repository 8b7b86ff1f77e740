//! In-process collection-processing substrate.
//!
//! Partitioned datasets, a retrying worker pool and read-only broadcast
//! values. The join core only relies on the operations exposed here, so the
//! results are the same for any partition count or worker count.

pub mod broadcast;
pub mod dataset;
pub mod executor;

pub use broadcast::Broadcast;
pub use dataset::{partition_for, Dataset};
pub use executor::{Executor, ExecutorConfig};
