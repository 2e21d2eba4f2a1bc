//! # Photomat Common Library
//!
//! Shared code for the photomat booth controller:
//! - Booth configuration model (TOML) and config file resolution
//! - Common error type
//! - Logging initialisation with verbosity levels

pub mod config;
pub mod error;
pub mod logging;

pub use config::BoothConfig;
pub use error::{Error, Result};
