//! # occurrence-join
//!
//! Reconciles primary, secondary and meta mutation submission records into
//! one occurrence record per donor and mutation, plus an open-access variant
//! with controlled data removed.
//!
//! ## Usage
//!
//! ```bash
//! occurrence-join run --working-dir ./release --project BRCA-UK
//! occurrence-join check-config --config job.yml
//! ```
//!
//! ## Modules
//!
//! - `config` - Layered job configuration (defaults, YAML, environment)
//! - `error` - Unified error type with stable error codes
//! - `identity` - Read-only sample and donor identity cache
//! - `join` - Join, grouping, occurrence building and redaction stages
//! - `model` - Semi-structured records, file types and well-known fields
//! - `storage` - Record stores for input and output record sets
//! - `substrate` - Partitioned datasets on a retrying worker pool
//! - `task` - Join tasks and the job that runs them
pub mod config;
pub mod error;
pub mod identity;
pub mod join;
pub mod model;
pub mod storage;
pub mod substrate;
pub mod task;

pub use config::JobConfig;
pub use error::{JoinError, Result};
pub use task::{JobSummary, JoinJob};
