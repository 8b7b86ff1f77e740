use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;
pub mod helpers;

pub use codes::{describe_error_code, ErrorCode};
pub use helpers::{common, ErrorExt};

/// The unified error type for the occurrence join
#[derive(Error, Debug)]
pub enum JoinError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Identity resolution failed for {file_type} key '{key}': {message}")]
    IdentityResolution {
        code: u16,
        file_type: String,
        key: String,
        message: String,
    },

    #[error("[E{code:04}] Marking resolution failed: {message}")]
    MarkingResolution {
        code: u16,
        message: String,
        record: Option<String>,
    },

    #[error("[E{code:04}] Join key configuration error for {file_type}: {message}")]
    JoinKeyConfiguration {
        code: u16,
        file_type: String,
        message: String,
    },

    #[error("[E{code:04}] Missing join key '{field}' in {file_type} record: {message}")]
    MissingJoinKey {
        code: u16,
        file_type: String,
        field: String,
        message: String,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Execution error in stage '{stage}': {message}")]
    Execution {
        code: u16,
        stage: String,
        partition: Option<usize>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl JoinError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create an identity resolution error for a submitted key
    pub fn identity(
        file_type: impl Display,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::identity_with_code(ErrorCode::IDENTITY_GENERIC, file_type, key, message)
    }

    /// Create an identity resolution error with specific code
    pub fn identity_with_code(
        code: u16,
        file_type: impl Display,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::IdentityResolution {
            code,
            file_type: file_type.to_string(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a marking resolution error, keeping a rendering of the offending record
    pub fn marking(code: u16, message: impl Into<String>, record: Option<String>) -> Self {
        Self::MarkingResolution {
            code,
            message: message.into(),
            record,
        }
    }

    /// Create an error for a file type without a registered join key set
    pub fn join_key_configuration(file_type: impl Display, message: impl Into<String>) -> Self {
        Self::JoinKeyConfiguration {
            code: ErrorCode::JOIN_KEY_NOT_REGISTERED,
            file_type: file_type.to_string(),
            message: message.into(),
        }
    }

    /// Create an error for a record lacking one of its declared key fields
    pub fn missing_join_key(
        code: u16,
        file_type: impl Display,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MissingJoinKey {
            code,
            file_type: file_type.to_string(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a storage error with default code
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            code: ErrorCode::STORAGE_GENERIC,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create an execution error with default code
    pub fn execution(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            code: ErrorCode::EXEC_GENERIC,
            stage: stage.into(),
            partition: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient failure for a single unit of work
    pub fn transient(stage: impl Into<String>, partition: usize, message: impl Into<String>) -> Self {
        Self::Execution {
            code: ErrorCode::EXEC_TRANSIENT,
            stage: stage.into(),
            partition: Some(partition),
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    ///
    /// Variants without a source slot keep the source text in their message.
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Execution { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::IdentityResolution { message, .. }
            | Self::MarkingResolution { message, .. }
            | Self::JoinKeyConfiguration { message, .. }
            | Self::MissingJoinKey { message, .. } => {
                *message = format!("{}: {}", message, source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::IdentityResolution { message, .. }
            | Self::MarkingResolution { message, .. }
            | Self::JoinKeyConfiguration { message, .. }
            | Self::MissingJoinKey { message, .. }
            | Self::Storage { message, .. }
            | Self::Execution { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::IdentityResolution { .. } => 3,
            Self::Storage { .. } => 4,
            Self::Execution { .. } => 5,
            Self::MarkingResolution { .. } => 6,
            Self::JoinKeyConfiguration { .. } => 7,
            Self::MissingJoinKey { .. } => 8,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::IdentityResolution { code, .. }
            | Self::MarkingResolution { code, .. }
            | Self::JoinKeyConfiguration { code, .. }
            | Self::MissingJoinKey { code, .. }
            | Self::Storage { code, .. }
            | Self::Execution { code, .. } => *code,
        }
    }

    /// File type the failure was detected in, when known
    pub fn file_type(&self) -> Option<&str> {
        match self {
            Self::IdentityResolution { file_type, .. }
            | Self::JoinKeyConfiguration { file_type, .. }
            | Self::MissingJoinKey { file_type, .. } => Some(file_type),
            _ => None,
        }
    }

    /// True for failures caused by the input data itself.
    ///
    /// These abort the job and are never retried.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::IdentityResolution { .. }
                | Self::MarkingResolution { .. }
                | Self::MissingJoinKey { .. }
        )
    }

    /// Check if a failed unit of work may be attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Execution { code, .. } => *code == ErrorCode::EXEC_TRANSIENT,
            Self::Storage { code, .. } => *code == ErrorCode::STORAGE_TEMPORARY,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {}", message),
            Self::IdentityResolution {
                file_type,
                key,
                message,
                ..
            } => format!(
                "File type {} failed identity resolution for '{}': {}",
                file_type, key, message
            ),
            Self::MarkingResolution {
                message, record, ..
            } => match record {
                Some(r) => format!("Failed to resolve marking from {}: {}", r, message),
                None => format!("Failed to resolve marking: {}", message),
            },
            Self::JoinKeyConfiguration {
                file_type, message, ..
            } => format!("No join keys for file type {}: {}", file_type, message),
            Self::MissingJoinKey {
                file_type, field, ..
            } => format!(
                "File type {} has a record without join key field '{}'",
                file_type, field
            ),
            Self::Storage { message, path, .. } => {
                if let Some(p) = path {
                    format!("Storage error at {}: {}", p.display(), message)
                } else {
                    format!("Storage error: {}", message)
                }
            }
            Self::Execution {
                stage,
                partition,
                message,
                ..
            } => {
                if let Some(p) = partition {
                    format!("Stage '{}' failed on partition {}: {}", stage, p, message)
                } else {
                    format!("Stage '{}' failed: {}", stage, message)
                }
            }
        }
    }
}

/// Type alias for Results using JoinError
pub type Result<T> = std::result::Result<T, JoinError>;

/// Type alias for application Results (using anyhow for flexibility)
pub type AppResult<T> = anyhow::Result<T>;

impl From<std::io::Error> for JoinError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let (code, message) = match err.kind() {
            ErrorKind::NotFound => (ErrorCode::STORAGE_NOT_FOUND, "File or directory not found"),
            ErrorKind::PermissionDenied => {
                (ErrorCode::STORAGE_PERMISSION_DENIED, "Permission denied")
            }
            ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted => {
                (ErrorCode::STORAGE_TEMPORARY, "Resource temporarily unavailable")
            }
            _ => (ErrorCode::STORAGE_IO_ERROR, "IO operation failed"),
        };

        JoinError::storage_with_code(code, message, None).with_source(err)
    }
}

impl From<serde_json::Error> for JoinError {
    fn from(err: serde_json::Error) -> Self {
        JoinError::storage_with_code(
            ErrorCode::STORAGE_DESERIALIZATION_ERROR,
            "Invalid JSON record",
            None,
        )
        .with_source(err)
    }
}

impl From<serde_yaml::Error> for JoinError {
    fn from(err: serde_yaml::Error) -> Self {
        JoinError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax")
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "part-00000.json");
        let err = JoinError::storage("Cannot read input")
            .with_source(io_err)
            .with_context("while reading ssm_p");

        assert_eq!(err.code(), ErrorCode::STORAGE_GENERIC);
        assert!(err.to_string().contains("[E3000]"));
        assert!(err.user_message().contains("Cannot read input"));
    }

    #[test]
    fn test_identity_error_names_file_type_and_key() {
        let err = JoinError::identity_with_code(
            ErrorCode::IDENTITY_SAMPLE_NOT_FOUND,
            "ssm_p",
            "S9",
            "not present in donor cache",
        );

        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.file_type(), Some("ssm_p"));
        assert!(err.to_string().contains("ssm_p"));
        assert!(err.to_string().contains("'S9'"));
        assert!(err.is_data_integrity());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(JoinError::transient("join", 3, "worker lost").is_retryable());
        assert!(JoinError::from(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "slow disk"
        ))
        .is_retryable());

        let marking = JoinError::marking(ErrorCode::MARKING_MISSING, "absent", None);
        assert!(!marking.is_retryable());
        assert!(marking.is_data_integrity());

        let config = JoinError::join_key_configuration("ssm_m", "no keys");
        assert!(!config.is_retryable());
        assert!(!config.is_data_integrity());
    }
}
