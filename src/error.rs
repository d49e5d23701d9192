use thiserror::Error;

use crate::model::TaskId;

#[derive(Debug, Error)]
pub enum TaskdeckError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task '{0}' not found")]
    NotFound(TaskId),

    #[error("Storage error on '{key}': {message}")]
    Persistence { key: String, message: String },

    #[error("Import error: {0}")]
    ImportFormat(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Biometric error: {0}")]
    Biometric(String),

    #[error("App is locked. Pass --passcode to unlock")]
    Locked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),
}

impl TaskdeckError {
    pub fn persistence(key: &str, err: impl std::fmt::Display) -> Self {
        TaskdeckError::Persistence {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TaskdeckError {
    fn from(e: serde_json::Error) -> Self {
        TaskdeckError::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TaskdeckError>;
