//! Error types for keychain provisioning.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeychainError>;

#[derive(Debug, Error)]
pub enum KeychainError {
    #[error("{0} not supported. Keychain provisioning is only supported on macOS")]
    UnsupportedPlatform(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The `security` binary could not be started at all.
    #[error("Failed to execute security {subcommand}: {source}")]
    CommandSpawn {
        subcommand: String,
        #[source]
        source: std::io::Error,
    },

    /// `security` ran and exited non-zero.
    #[error("security {subcommand} failed (exit code {}): {stderr}", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    CommandFailed {
        subcommand: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Certificate {index} is not valid base64: {source}")]
    CertificateDecode {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Carries position and message only, never the offending source line
    #[error("Config file parse error: {0}")]
    ConfigParse(String),
}
