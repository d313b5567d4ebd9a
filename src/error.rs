use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors from the per-day log store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no log file for {0}")]
    NotFound(NaiveDate),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in log file: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

/// Errors from the tunnel supervisor.
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("failed to spawn tunnel process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("tunnel URL not found in process output")]
    UrlNotFound,

    #[error("failed to copy tunnel URL to clipboard: {0}")]
    Clipboard(#[source] std::io::Error),
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing required variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid port value: {0}")]
    InvalidPort(String),
}

/// Startup-phase error surface. Any of these is fatal to the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
