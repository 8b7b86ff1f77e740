use super::{ErrorCode, JoinError};
use std::path::PathBuf;

/// Extension trait for convenient error conversion
pub trait ErrorExt<T> {
    /// Convert to JoinError with a configuration message
    fn to_config_error(self, message: impl Into<String>) -> Result<T, JoinError>;

    /// Convert to JoinError with a storage message and the affected path
    fn to_storage_error(
        self,
        message: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Result<T, JoinError>;
}

impl<T, E> ErrorExt<T> for Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn to_config_error(self, message: impl Into<String>) -> Result<T, JoinError> {
        self.map_err(|e| JoinError::config(message).with_source(e))
    }

    fn to_storage_error(
        self,
        message: impl Into<String>,
        path: Option<PathBuf>,
    ) -> Result<T, JoinError> {
        self.map_err(|e| {
            JoinError::storage_with_code(ErrorCode::STORAGE_IO_ERROR, message, path).with_source(e)
        })
    }
}

/// Helper functions for common error scenarios
pub mod common {
    use super::*;

    /// Create a not found error for configuration
    pub fn config_not_found(path: impl AsRef<std::path::Path>) -> JoinError {
        JoinError::config_with_code(
            ErrorCode::CONFIG_NOT_FOUND,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
    }

    /// A submitted analyzed sample id with no donor/sample identity
    pub fn sample_not_found(file_type: &str, sample_id: &str) -> JoinError {
        JoinError::identity_with_code(
            ErrorCode::IDENTITY_SAMPLE_NOT_FOUND,
            file_type,
            sample_id,
            "submitted sample id is absent from the identity cache",
        )
    }

    /// A project with no identity mapping at all
    pub fn project_not_found(file_type: &str, project: &str) -> JoinError {
        JoinError::identity_with_code(
            ErrorCode::IDENTITY_PROJECT_NOT_FOUND,
            file_type,
            project,
            "project is absent from the identity cache",
        )
    }

    /// A matched sample id with no surrogate sample id
    pub fn matched_sample_not_found(file_type: &str, sample_id: &str) -> JoinError {
        JoinError::identity_with_code(
            ErrorCode::IDENTITY_MATCHED_SAMPLE_NOT_FOUND,
            file_type,
            sample_id,
            "matched sample id has no surrogate sample id",
        )
    }

    /// A declared join key field absent from a record
    pub fn join_key_field_missing(file_type: &str, field: &str) -> JoinError {
        JoinError::missing_join_key(
            ErrorCode::JOIN_KEY_FIELD_MISSING,
            file_type,
            field,
            "declared key fields must be present on every record",
        )
    }
}
