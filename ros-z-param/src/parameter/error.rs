use crate::error::ServiceError;

use super::value::ParameterType;

pub type Result<T, E = ParameterError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("parameter '{0}' is not set")]
    NotFound(String),
    #[error("parameter '{name}' is of type {actual}, requested {requested}")]
    TypeMismatch {
        name: String,
        requested: ParameterType,
        actual: ParameterType,
    },
    #[error("parameter service answered {got} entries for {expected} requested")]
    MalformedResponse { expected: usize, got: usize },
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ParameterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}

/// Failure to load a parameter file.
#[derive(Debug, thiserror::Error)]
pub enum ParameterFileError {
    #[error("failed to read parameter file {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse parameter file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid parameter file: {0}")]
    Format(String),
}
