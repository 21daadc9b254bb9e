use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectColorsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid color {0:?}: expected #rrggbb")]
    InvalidColor(String),

    #[error("Invalid boolean {0:?}: expected true or false")]
    InvalidBool(String),

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Not a project directory or .code-workspace file: {}", .0.display())]
    NotAProject(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures while persisting to a settings file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to overwrite {}: existing content is not plain JSON ({reason})", path.display())]
    Unparseable { path: PathBuf, reason: String },

    #[error("No project is open")]
    NoProject,

    #[error("Could not determine the global settings location")]
    NoGlobalLocation,

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProjectColorsError>;
