//! In-memory record store for testing

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::{FileType, Record};
use crate::storage::traits::RecordStore;

#[derive(Default)]
pub struct MemoryStore {
    record_sets: RwLock<HashMap<FileType, Vec<Record>>>,
    writes: RwLock<Vec<FileType>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record set
    pub fn with_records(mut self, file_type: FileType, records: Vec<Record>) -> Self {
        self.record_sets.get_mut().insert(file_type, records);
        self
    }

    /// Current contents of a record set
    pub async fn records(&self, file_type: FileType) -> Option<Vec<Record>> {
        self.record_sets.read().await.get(&file_type).cloned()
    }

    /// File types written so far, in write order
    pub async fn written(&self) -> Vec<FileType> {
        self.writes.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, file_type: FileType) -> Result<Vec<Record>> {
        Ok(self
            .record_sets
            .read()
            .await
            .get(&file_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn write(&self, file_type: FileType, records: &[Record], _partitions: usize) -> Result<()> {
        self.record_sets
            .write()
            .await
            .insert(file_type, records.to_vec());
        self.writes.write().await.push(file_type);
        Ok(())
    }

    async fn exists(&self, file_type: FileType) -> Result<bool> {
        Ok(self.record_sets.read().await.contains_key(&file_type))
    }
}
