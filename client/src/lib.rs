pub mod client;
pub mod config;

pub use client::{BattleReport, Client};
pub use config::{Config, ConfigError, ValidatedConfig};
use league_types::league::ProgramError;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The ledger refused the instruction; nothing was written.
    #[error("rejected ({}): {}", .0.code(), .0)]
    Rejected(ProgramError),
    /// Storage or environment failure. Nothing was committed, so retrying is safe.
    #[error("submission failed: {0:#}")]
    Failed(anyhow::Error),
    #[error("account not found")]
    AccountNotFound,
    #[error("unexpected response")]
    UnexpectedResponse,
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(err)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
