//! Core trait of the record storage layer

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{FileType, Record};

/// Reads input record sets and writes output record sets, one per file type
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every record of `file_type`; a missing record set reads as empty
    async fn read(&self, file_type: FileType) -> Result<Vec<Record>>;

    /// Replace the record set of `file_type`, split into `partitions` parts.
    ///
    /// The previous contents stay visible until the new set is complete.
    async fn write(&self, file_type: FileType, records: &[Record], partitions: usize) -> Result<()>;

    /// Check whether a readable record set exists for `file_type`
    async fn exists(&self, file_type: FileType) -> Result<bool>;
}
