//! Error types for data loading, configuration, and export.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised outside the per-timestep loop.
///
/// The simulation loop itself never returns errors: invalid energy flows
/// there are invariant violations and panic.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
