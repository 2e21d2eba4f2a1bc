//! Playback-session collaborator interface
//!
//! A backend opens sessions; a session is one running player instance
//! bound to a single video, layer and viewport. Every call may be slow or
//! fail. Callers bound them with a timeout (see [`super::slot`]).

use std::path::PathBuf;

use async_trait::async_trait;
use photomat_common::config::Viewport;

use crate::error::SessionError;

/// Playback state as reported by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedStatus {
    Playing,
    Paused,
    Stopped,
}

/// Parameters for opening a new session
#[derive(Debug, Clone, PartialEq)]
pub struct OpenRequest {
    /// Slot index the session belongs to (used to name the player instance)
    pub slot: usize,
    pub reference: PathBuf,
    pub viewport: Viewport,
    pub layer: i32,
    pub initial_alpha: u8,
    /// 0.0 (silent) to 1.0 (full volume)
    pub initial_volume: f64,
    pub extra_args: Vec<String>,
}

/// Opens playback sessions
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    /// Start a player for `request.reference`
    ///
    /// On success the session is loaded and paused, ready to be started.
    async fn open(&self, request: &OpenRequest) -> Result<Box<dyn PlayerSession>, SessionError>;
}

/// One running player instance
#[async_trait]
pub trait PlayerSession: Send {
    /// Current playback position in seconds
    async fn position(&mut self) -> Result<f64, SessionError>;

    /// Total length in seconds
    async fn duration(&mut self) -> Result<f64, SessionError>;

    async fn playback_status(&mut self) -> Result<ReportedStatus, SessionError>;

    /// Layer transparency, 0 (invisible) to 255 (opaque)
    async fn set_alpha(&mut self, alpha: u8) -> Result<(), SessionError>;

    /// Linear volume, 0.0 to 1.0
    async fn set_volume(&mut self, volume: f64) -> Result<(), SessionError>;

    /// Seek to an absolute position in seconds
    async fn set_position(&mut self, seconds: f64) -> Result<(), SessionError>;

    async fn play(&mut self) -> Result<(), SessionError>;

    /// Terminate the player; the session must not be used afterwards
    async fn quit(&mut self) -> Result<(), SessionError>;
}
