// src/errors.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Malformed configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported configuration version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Review mode is not active")]
    NotActive,

    #[error("Review mode is already active")]
    AlreadyActive,
}
