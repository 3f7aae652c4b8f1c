use commonware_codec::DecodeExt;
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    Signer,
};
use commonware_utils::from_hex_formatted;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};
use thiserror::Error;
use tracing::Level;

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration of the `league` command line client.
#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
    /// Path of the SQLite database holding the ledger.
    pub database: String,
    /// Hex-encoded ed25519 key that pays for and signs submitted instructions.
    pub private_key: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be hex")]
    InvalidHex { field: &'static str },
    #[error("{field} is invalid")]
    InvalidDecode {
        field: &'static str,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

pub struct ValidatedConfig {
    pub database: PathBuf,
    pub signer: PrivateKey,
    pub public_key: PublicKey,
    pub log_level: Level,
}

struct RedactedConfig<'a>(&'a Config);

impl fmt::Debug for RedactedConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = self.0;
        f.debug_struct("Config")
            .field("database", &cfg.database)
            .field("private_key", &"<redacted>")
            .field("log_level", &cfg.log_level)
            .finish()
    }
}

impl Config {
    pub fn redacted_debug(&self) -> impl fmt::Debug + '_ {
        RedactedConfig(self)
    }

    pub fn parse_signer(&self) -> Result<PrivateKey, ConfigError> {
        let bytes = from_hex_formatted(&self.private_key).ok_or(ConfigError::InvalidHex {
            field: "private_key",
        })?;
        PrivateKey::decode(bytes.as_ref()).map_err(|source| ConfigError::InvalidDecode {
            field: "private_key",
            source,
        })
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Empty { field: "database" });
        }
        let signer = self.parse_signer()?;
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        Ok(ValidatedConfig {
            database: PathBuf::from(self.database),
            public_key: signer.public_key(),
            signer,
            log_level,
        })
    }
}
