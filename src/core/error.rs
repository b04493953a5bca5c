//! Error types for the Strata terrain core

use thiserror::Error;

use crate::persist::PersistError;

/// Main error type for the terrain core
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Height map error: {0}")]
    HeightMap(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
