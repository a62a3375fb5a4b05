use layout_engine::LayoutError;
use std::{error::Error as StdError, io};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Signal handling error")]
    SignalHandling {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error(transparent)]
    Engine(#[from] LayoutError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(windows)]
    #[error(transparent)]
    Ctrlc(#[from] ctrlc::Error),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
