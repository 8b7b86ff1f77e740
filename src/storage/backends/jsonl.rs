//! JSON-lines record store on the local file system.
//!
//! Record sets live in `<root>/<file type dir>/part-NNNNN.json`, one JSON
//! object per line. Outputs are written into a hidden staging directory and
//! renamed over the previous output once every part is on disk.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ErrorCode, ErrorExt, JoinError, Result};
use crate::model::{FileType, Record};
use crate::storage::traits::RecordStore;

pub struct JsonlStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl JsonlStore {
    /// Create a store reading from `input_dir` and writing to `output_dir`
    pub async fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let input_dir = input_dir.into();
        let output_dir = output_dir.into();

        fs::create_dir_all(&output_dir)
            .await
            .to_storage_error("Cannot create output directory", Some(output_dir.clone()))?;

        Ok(Self {
            input_dir,
            output_dir,
        })
    }

    pub fn input_path(&self, file_type: FileType) -> PathBuf {
        self.input_dir.join(file_type.dir_name())
    }

    pub fn output_path(&self, file_type: FileType) -> PathBuf {
        self.output_dir.join(file_type.dir_name())
    }

    /// Data files of a record set, sorted by name; hidden and marker files are skipped
    async fn part_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(dir)
            .await
            .to_storage_error("Cannot list record set", Some(dir.to_path_buf()))?;

        let mut parts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .to_storage_error("Cannot list record set", Some(dir.to_path_buf()))?
        {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.') || n.starts_with('_'))
                .unwrap_or(true);
            let is_file = entry
                .file_type()
                .await
                .to_storage_error("Cannot inspect record set entry", Some(path.clone()))?
                .is_file();
            if !hidden && is_file {
                parts.push(path);
            }
        }
        parts.sort();
        Ok(parts)
    }
}

fn parse_part(path: &Path, content: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let location = format!("{}:{}", path.display(), index + 1);
        let value: Value = serde_json::from_str(line)
            .map_err(|e| JoinError::from(e).with_context(&location))?;
        records.push(Record::from_value(value).map_err(|e| e.with_context(&location))?);
    }
    Ok(records)
}

fn render_part(records: &[Record]) -> Result<String> {
    let mut content = String::new();
    for record in records {
        content.push_str(&serde_json::to_string(record)?);
        content.push('\n');
    }
    Ok(content)
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn read(&self, file_type: FileType) -> Result<Vec<Record>> {
        let dir = self.input_path(file_type);
        if !self.exists(file_type).await? {
            warn!(
                file_type = %file_type,
                path = %dir.display(),
                "Record set is missing, reading it as empty"
            );
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for part in self.part_files(&dir).await? {
            let content = fs::read_to_string(&part)
                .await
                .to_storage_error("Cannot read record part", Some(part.clone()))?;
            records.extend(parse_part(&part, &content)?);
        }

        debug!(file_type = %file_type, records = records.len(), "Read record set");
        Ok(records)
    }

    async fn write(&self, file_type: FileType, records: &[Record], partitions: usize) -> Result<()> {
        let target = self.output_path(file_type);
        let staging = self
            .output_dir
            .join(format!(".{}.{}.tmp", file_type.dir_name(), Uuid::new_v4()));

        fs::create_dir_all(&staging)
            .await
            .to_storage_error("Cannot create staging directory", Some(staging.clone()))?;

        let chunk = records.len().div_ceil(partitions.max(1)).max(1);
        for (index, part) in records.chunks(chunk).enumerate() {
            let path = staging.join(format!("part-{:05}.json", index));
            fs::write(&path, render_part(part)?)
                .await
                .to_storage_error("Cannot write record part", Some(path.clone()))?;
        }

        if fs::try_exists(&target).await.unwrap_or(false) {
            fs::remove_dir_all(&target)
                .await
                .to_storage_error("Cannot replace previous output", Some(target.clone()))?;
        }
        fs::rename(&staging, &target).await.map_err(|e| {
            JoinError::storage_with_code(
                ErrorCode::STORAGE_IO_ERROR,
                format!("Cannot move staged output from {}", staging.display()),
                Some(target.clone()),
            )
            .with_source(e)
        })?;

        debug!(
            file_type = %file_type,
            records = records.len(),
            path = %target.display(),
            "Wrote record set"
        );
        Ok(())
    }

    async fn exists(&self, file_type: FileType) -> Result<bool> {
        let dir = self.input_path(file_type);
        Ok(fs::metadata(&dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false))
    }
}
