//! Error types for the SMS dispatch core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load recipient table: {0}")]
    Load(String),

    #[error("Row validation failed: {0}")]
    Validation(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("A batch is already running")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
