//! Job configuration.
//!
//! Configuration is layered, each layer overriding the previous one:
//!
//! 1. Hardcoded defaults
//! 2. An optional YAML file
//! 3. Environment variables (`OCCURRENCE_JOIN_*` prefix)
//! 4. Command line flags, applied by the binary
//!
//! [`JobConfig::validate`] reports every problem at once rather than stopping
//! at the first one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{common, ErrorCode, ErrorExt, JoinError, Result};
use crate::join::validate_registered;
use crate::model::fields::DEFAULT_CONTROLLED_FIELDS;
use crate::model::FileType;
use crate::substrate::ExecutorConfig;

/// Prefix of every environment variable read by [`JobConfig::merge_env_vars`]
pub const ENV_PREFIX: &str = "OCCURRENCE_JOIN_";

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Worker threads running partitions in parallel
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Partition count of every input record set
    #[serde(default = "default_partitions")]
    pub partitions: usize,

    /// Attempts per unit of work before a transient failure fails the job
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Field paths stripped from open-access output
    #[serde(default = "default_controlled_fields")]
    pub controlled_fields: Vec<String>,

    /// Project scope for records that carry no `_project_id`
    #[serde(default)]
    pub project: Option<String>,

    /// Directory holding one sub-directory per input file type
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Directory receiving the outputs; the working directory when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Output file types to produce
    #[serde(default = "default_output_types")]
    pub output_types: Vec<FileType>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            workers: default_workers(),
            partitions: default_partitions(),
            max_attempts: default_max_attempts(),
            controlled_fields: default_controlled_fields(),
            project: None,
            working_dir: default_working_dir(),
            output_dir: None,
            output_types: default_output_types(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_workers() -> usize {
    ExecutorConfig::default().workers
}

fn default_partitions() -> usize {
    ExecutorConfig::default().default_partitions
}

fn default_max_attempts() -> u32 {
    ExecutorConfig::default().max_attempts
}

fn default_controlled_fields() -> Vec<String> {
    DEFAULT_CONTROLLED_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_types() -> Vec<FileType> {
    vec![FileType::Ssm, FileType::Observation]
}

impl JobConfig {
    /// Parse a YAML document; absent keys take their defaults
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a YAML configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Err(common::config_not_found(path));
        }
        let content = fs::read_to_string(path)
            .await
            .to_config_error(format!("Cannot read configuration file {}", path.display()))?;
        let config = Self::from_yaml_str(&content)
            .map_err(|e| e.with_context(format!("in {}", path.display())))?;
        debug!(path = %path.display(), "Loaded job configuration");
        Ok(config)
    }

    /// Apply `OCCURRENCE_JOIN_*` environment variables
    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, called with full variable names
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        if let Some(log_level) = var("LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(workers) = var("WORKERS") {
            self.workers = parse_env("WORKERS", &workers)?;
        }
        if let Some(partitions) = var("PARTITIONS") {
            self.partitions = parse_env("PARTITIONS", &partitions)?;
        }
        if let Some(max_attempts) = var("MAX_ATTEMPTS") {
            self.max_attempts = parse_env("MAX_ATTEMPTS", &max_attempts)?;
        }
        if let Some(project) = var("PROJECT") {
            self.project = Some(project);
        }
        if let Some(working_dir) = var("WORKING_DIR") {
            self.working_dir = PathBuf::from(working_dir);
        }
        if let Some(output_dir) = var("OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(output_dir));
        }
        if let Some(fields) = var("CONTROLLED_FIELDS") {
            self.controlled_fields = split_list(&fields).map(str::to_string).collect();
        }
        if let Some(types) = var("OUTPUT_TYPES") {
            self.output_types = split_list(&types)
                .map(str::parse::<FileType>)
                .collect::<Result<Vec<FileType>>>()?;
        }
        Ok(())
    }

    /// Check every setting, then that each output type has registered join keys
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "log_level '{}' must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            ));
        }
        if self.workers == 0 {
            errors.push("workers must be at least 1".to_string());
        }
        if self.partitions == 0 {
            errors.push("partitions must be at least 1".to_string());
        }
        if self.max_attempts == 0 {
            errors.push("max_attempts must be at least 1".to_string());
        }
        if self.controlled_fields.iter().any(|f| f.trim().is_empty()) {
            errors.push("controlled_fields cannot contain empty field paths".to_string());
        }
        if self.output_types.is_empty() {
            errors.push("output_types cannot be empty".to_string());
        }
        if let Some(project) = &self.project {
            if project.trim().is_empty() {
                errors.push("project cannot be empty when provided".to_string());
            }
        }

        if !errors.is_empty() {
            return Err(JoinError::config_with_code(
                ErrorCode::CONFIG_VALIDATION_FAILED,
                errors.join("; "),
            ));
        }

        validate_registered(&self.output_types)
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.working_dir)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            workers: self.workers,
            max_attempts: self.max_attempts,
            default_partitions: self.partitions,
        }
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_env<T: std::str::FromStr>(suffix: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        JoinError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("{}{} has an invalid value '{}'", ENV_PREFIX, suffix, value),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = JobConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output_types, vec![FileType::Ssm, FileType::Observation]);
        assert_eq!(config.output_dir(), Path::new("."));
        assert!(config.controlled_fields.contains(&"quality_score".to_string()));
    }

    #[test]
    fn test_yaml_fills_missing_keys_with_defaults() {
        let config = JobConfig::from_yaml_str(
            r#"
workers: 3
project: BRCA-UK
output_types: [SSM, CNSM]
controlled_fields: [quality_score]
"#,
        )
        .unwrap();

        assert_eq!(config.workers, 3);
        assert_eq!(config.project.as_deref(), Some("BRCA-UK"));
        assert_eq!(config.output_types, vec![FileType::Ssm, FileType::Cnsm]);
        assert_eq!(config.controlled_fields, vec!["quality_score"]);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = JobConfig::from_yaml_str("workers: [").unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_YAML);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OCCURRENCE_JOIN_LOG_LEVEL", "debug"),
            ("OCCURRENCE_JOIN_PARTITIONS", "16"),
            ("OCCURRENCE_JOIN_OUTPUT_TYPES", "ssm, stsm"),
            ("OCCURRENCE_JOIN_CONTROLLED_FIELDS", "probability,quality_score"),
        ]
        .into_iter()
        .collect();

        let mut config = JobConfig::default();
        config
            .merge_env_from(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.partitions, 16);
        assert_eq!(config.output_types, vec![FileType::Ssm, FileType::Stsm]);
        assert_eq!(config.controlled_fields, vec!["probability", "quality_score"]);
    }

    #[test]
    fn test_env_rejects_bad_numbers() {
        let mut config = JobConfig::default();
        let err = config
            .merge_env_from(|name| (name == "OCCURRENCE_JOIN_WORKERS").then(|| "many".to_string()))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_VALUE);
        assert!(err.to_string().contains("OCCURRENCE_JOIN_WORKERS"));
    }

    #[test]
    fn test_validation_accumulates_errors() {
        let config = JobConfig {
            log_level: "loud".to_string(),
            workers: 0,
            partitions: 0,
            output_types: Vec::new(),
            ..JobConfig::default()
        };

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert_eq!(err.code(), ErrorCode::CONFIG_VALIDATION_FAILED);
        assert!(message.contains("log_level"));
        assert!(message.contains("workers"));
        assert!(message.contains("partitions"));
        assert!(message.contains("output_types"));
    }

    #[test]
    fn test_validation_rejects_unjoinable_outputs() {
        let config = JobConfig {
            output_types: vec![FileType::Ssm, FileType::SsmM],
            ..JobConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::JOIN_KEY_NOT_REGISTERED);
        assert_eq!(err.file_type(), Some("ssm_m"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = JobConfig::load(Path::new("/nonexistent/occurrence-join.yml"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_load_unreadable_file_is_config_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = JobConfig::load(temp.path()).await.unwrap_err();

        assert!(matches!(err, JoinError::Config { .. }));
        assert_eq!(err.code(), ErrorCode::CONFIG_GENERIC);
        assert!(err.to_string().contains("Cannot read configuration file"), "{}", err);
    }
}
