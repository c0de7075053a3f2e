use thiserror::Error;

use super::{ConfigError, RunError, TransportError, ValidationError};

/// Top-level error for the binary. Everything a run can fail with converges
/// here so `main` has one exit path.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CLI error: {0}")]
    Clap(#[from] clap::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Run error: {0}")]
    Run(#[from] RunError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn transport<E>(error: E) -> Self
    where
        E: Into<TransportError>,
    {
        error.into().into()
    }

    pub fn run<E>(error: E) -> Self
    where
        E: Into<RunError>,
    {
        error.into().into()
    }
}
