//! Error types for photomat-ctl
//!
//! Only [`Error::EmptyCatalog`] is fatal inside the scheduler. Session and
//! load failures are recovered locally by the slot or the next scheduling
//! pass.

use std::time::Duration;
use thiserror::Error;

use crate::catalog::Category;

/// Failure of a single call into a playback session
///
/// Covers both queries (position, duration, status) and commands (alpha,
/// volume, seek, play, quit).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Player process could not be started
    #[error("failed to start player: {0}")]
    Spawn(String),

    /// Player did not answer a query or command
    #[error("player call failed: {0}")]
    Call(String),

    /// Player answered with something we could not interpret
    #[error("unexpected player reply: {0}")]
    Reply(String),

    /// Call did not complete within its time limit
    #[error("player did not answer within {0:?}")]
    Timeout(Duration),

    /// Session is no longer available
    #[error("player session has ended")]
    Closed,
}

/// Why a slot could not be loaded with a new video
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadFailure {
    /// Slot still owns a session; loads are rejected, never queued
    #[error("slot already owns a playback session")]
    AlreadyActive,

    /// Player could not open the video
    #[error("could not open playback session: {0}")]
    Open(#[from] SessionError),
}

/// GPIO line errors
#[derive(Error, Debug)]
pub enum GpioError {
    /// Line could not be requested or accessed
    #[error("GPIO line {pin}: {reason}")]
    Line { pin: u32, reason: String },

    /// GPIO chip could not be opened
    #[error("GPIO chip {0}")]
    Chip(String),

    /// No GPIO support on this platform
    #[error("GPIO is not supported on this platform")]
    Unsupported,
}

/// Main error type for photomat-ctl
#[derive(Error, Debug)]
pub enum Error {
    /// A category had no videos when one was needed (fatal)
    #[error("No {0} videos available")]
    EmptyCatalog(Category),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] photomat_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using photomat-ctl Error
pub type Result<T> = std::result::Result<T, Error>;
