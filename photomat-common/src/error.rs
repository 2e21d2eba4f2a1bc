//! Common error types for photomat

use thiserror::Error;

/// Common result type for photomat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the photomat crates
#[derive(Error, Debug)]
pub enum Error {
    /// TOML syntax or schema error
    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input (command line or config value)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
