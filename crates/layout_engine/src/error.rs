use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Block's meta was not found: {kind}")]
    MetaNotFound { kind: String },

    #[error("No meta node is flagged as root")]
    MissingRootMeta,

    #[error("No block instances registered for type '{kind}'")]
    MissingInstances { kind: String },

    #[error("Unknown restriction '{0}'")]
    UnknownRestriction(String),

    #[error("Invalid metrics: {0}")]
    InvalidMetrics(String),

    #[error("Invalid build request: {0}")]
    InvalidRequest(String),

    #[error("Column {index} is out of range for a layout of {colspan} columns")]
    ColumnOutOfRange { index: usize, colspan: usize },

    #[error("Inconsistent layout snapshot: {0}")]
    Snapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create file {path}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl From<toml::de::Error> for LayoutError {
    fn from(err: toml::de::Error) -> Self {
        LayoutError::Config(format!("TOML parse error: {err}"))
    }
}
