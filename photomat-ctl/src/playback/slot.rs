//! Playback slot: one player session bound to a fixed layer
//!
//! The slot samples its session (position, status) when serviced, derives
//! the transparency for that instant from its [`FadeProfile`] and drives
//! the optional camera trigger from the remaining playback time.
//!
//! # Status
//!
//! ```text
//!            load ok              poll: Playing/Paused/Stopped
//! Absent ──────────────► Paused ◄─────────────────────────────► Playing/Stopped
//!   ▲                       │                                        │
//!   │                       └──── any failed call ──► Faulted ◄──────┘
//!   └────────────────────────────── unload ───────────────────────────┘
//! ```
//!
//! No call into a session is allowed to stall the control loop: each one
//! is bounded by a timeout and a failure only degrades this slot.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use photomat_common::config::Viewport;
use tracing::{debug, trace, warn};

use super::fade::{volume_for_alpha, FadeProfile};
use super::session::{OpenRequest, PlayerBackend, PlayerSession, ReportedStatus};
use super::trigger::{TriggerBinding, TriggerEdge};
use crate::error::{LoadFailure, SessionError};
use crate::gpio::LOG_TARGET as GPIO;

/// Marker for an unknown position or duration
pub const UNKNOWN: f64 = -1.0;

/// Slot playback status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    /// No session
    Absent,
    Playing,
    Paused,
    Stopped,
    /// A call into the session failed; cleared by unload
    Faulted(String),
}

impl SlotStatus {
    /// Session is loaded and healthy (staged or playing)
    pub fn is_running(&self) -> bool {
        matches!(self, SlotStatus::Playing | SlotStatus::Paused)
    }

    /// Session reached its end or broke; it only waits to be unloaded
    pub fn is_finished(&self) -> bool {
        matches!(self, SlotStatus::Stopped | SlotStatus::Faulted(_))
    }
}

impl From<ReportedStatus> for SlotStatus {
    fn from(status: ReportedStatus) -> Self {
        match status {
            ReportedStatus::Playing => SlotStatus::Playing,
            ReportedStatus::Paused => SlotStatus::Paused,
            ReportedStatus::Stopped => SlotStatus::Stopped,
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Absent => f.write_str("Absent"),
            SlotStatus::Playing => f.write_str("Playing"),
            SlotStatus::Paused => f.write_str("Paused"),
            SlotStatus::Stopped => f.write_str("Stopped"),
            SlotStatus::Faulted(reason) => write!(f, "Faulted({})", reason),
        }
    }
}

/// Fixed per-slot display and call settings
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSettings {
    pub layer: i32,
    pub viewport: Viewport,
    /// Mirror transparency to volume
    pub volume_linked: bool,
    pub extra_args: Vec<String>,
    /// Bound for each query or command
    pub query_timeout: Duration,
    /// Bound for opening a session
    pub open_timeout: Duration,
    /// Bound for terminating a session; must exceed the backend's own
    /// quit grace period plus its kill
    pub quit_timeout: Duration,
}

impl Default for SlotSettings {
    fn default() -> Self {
        Self {
            layer: 1,
            viewport: Viewport::default(),
            volume_linked: true,
            extra_args: Vec::new(),
            query_timeout: Duration::from_millis(500),
            open_timeout: Duration::from_secs(10),
            quit_timeout: Duration::from_secs(2),
        }
    }
}

/// Await a session call, failing it with [`SessionError::Timeout`] past `limit`
async fn guarded<T, F>(limit: Duration, call: F) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(SessionError::Timeout(limit)))
}

/// One playback unit bound to a fixed layer
pub struct PlaybackSlot {
    index: usize,
    settings: SlotSettings,
    fade: FadeProfile,
    trigger: Option<TriggerBinding>,
    session: Option<Box<dyn PlayerSession>>,
    reference: Option<PathBuf>,
    duration: f64,
    position: f64,
    status: SlotStatus,
    last_alpha: Option<u8>,
}

impl fmt::Debug for PlaybackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSlot")
            .field("index", &self.index)
            .field("layer", &self.settings.layer)
            .field("reference", &self.reference)
            .field("status", &self.status)
            .field("position", &self.position)
            .field("duration", &self.duration)
            .field("last_alpha", &self.last_alpha)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl PlaybackSlot {
    pub fn new(index: usize, settings: SlotSettings) -> Self {
        Self {
            index,
            settings,
            fade: FadeProfile::default(),
            trigger: None,
            session: None,
            reference: None,
            duration: UNKNOWN,
            position: UNKNOWN,
            status: SlotStatus::Absent,
            last_alpha: None,
        }
    }

    /// Attach a camera trigger output driven by this slot
    pub fn with_trigger(mut self, trigger: TriggerBinding) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Open a session for `reference`, staged (paused, invisible, silent)
    ///
    /// Rejected with [`LoadFailure::AlreadyActive`] while a session is
    /// still owned. A failed duration query does not fail the load; the
    /// duration stays unknown and is re-queried on later polls.
    pub async fn load(
        &mut self,
        backend: &dyn PlayerBackend,
        reference: &Path,
        fade: FadeProfile,
    ) -> Result<(), LoadFailure> {
        if self.session.is_some() {
            return Err(LoadFailure::AlreadyActive);
        }

        let request = OpenRequest {
            slot: self.index,
            reference: reference.to_path_buf(),
            viewport: self.settings.viewport,
            layer: self.settings.layer,
            initial_alpha: 0,
            initial_volume: 0.0,
            extra_args: self.settings.extra_args.clone(),
        };
        let mut session = guarded(self.settings.open_timeout, backend.open(&request)).await?;

        let limit = self.settings.query_timeout;
        self.duration = match guarded(limit, session.duration()).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Slot {}: duration of {} unknown: {}", self.index, reference.display(), e);
                UNKNOWN
            }
        };
        self.position = guarded(limit, session.position()).await.unwrap_or(UNKNOWN);

        self.session = Some(session);
        self.reference = Some(reference.to_path_buf());
        self.fade = fade;
        self.status = SlotStatus::Paused;
        self.last_alpha = Some(request.initial_alpha);

        debug!(
            "Slot {} (layer {}): loaded {} ({:.2}s)",
            self.index,
            self.settings.layer,
            reference.display(),
            self.duration
        );
        Ok(())
    }

    /// Terminate and release the session
    ///
    /// Returns whether a session was present. Safe to call repeatedly.
    /// A lit trigger output is switched off.
    pub async fn unload(&mut self) -> bool {
        if let Some(trigger) = self.trigger.as_mut() {
            if trigger.retire() {
                debug!(target: GPIO, "Slot {}: trigger output retired on unload", self.index);
            }
        }

        let Some(mut session) = self.session.take() else {
            self.status = SlotStatus::Absent;
            return false;
        };

        if let Err(e) = guarded(self.settings.quit_timeout, session.quit()).await {
            warn!("Slot {}: quit failed: {}", self.index, e);
        }
        drop(session);

        debug!(
            "Slot {}: unloaded {} ({})",
            self.index,
            self.reference
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            self.status
        );

        self.reference = None;
        self.status = SlotStatus::Absent;
        self.position = UNKNOWN;
        self.duration = UNKNOWN;
        self.last_alpha = None;
        true
    }

    /// Sample position and status from the session
    ///
    /// Never fails outward: a failed query marks the slot
    /// [`SlotStatus::Faulted`] and leaves the position unknown.
    pub async fn poll_status(&mut self) {
        let limit = self.settings.query_timeout;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if matches!(self.status, SlotStatus::Faulted(_)) {
            return;
        }

        let sampled = async {
            let position = guarded(limit, session.position()).await?;
            let status = guarded(limit, session.playback_status()).await?;
            Ok::<_, SessionError>((position, status))
        }
        .await;

        match sampled {
            Ok((position, status)) => {
                self.position = position;
                self.status = status.into();
            }
            Err(e) => {
                self.fault(e);
                return;
            }
        }

        if self.duration < 0.0 {
            if let Some(session) = self.session.as_mut() {
                match guarded(limit, session.duration()).await {
                    Ok(duration) => {
                        debug!("Slot {}: duration now known ({:.2}s)", self.index, duration);
                        self.duration = duration;
                    }
                    Err(e) => trace!("Slot {}: duration still unknown: {}", self.index, e),
                }
            }
        }

        trace!(
            "Slot {}: {} {:.2}/{:.2}",
            self.index,
            self.status,
            self.position,
            self.duration
        );
    }

    /// Apply the transparency envelope and drive the trigger output
    pub async fn apply_fade(&mut self) {
        let limit = self.settings.query_timeout;
        let volume_linked = self.settings.volume_linked;
        let target = self
            .fade
            .target_alpha(&self.status, self.position, self.duration);

        if let (Some(alpha), Some(session)) = (target, self.session.as_mut()) {
            if self.last_alpha != Some(alpha) {
                let written = async {
                    guarded(limit, session.set_alpha(alpha)).await?;
                    if volume_linked {
                        guarded(limit, session.set_volume(volume_for_alpha(alpha))).await?;
                    }
                    Ok::<_, SessionError>(())
                }
                .await;

                match written {
                    Ok(()) => {
                        trace!("Slot {}: alpha {}", self.index, alpha);
                        self.last_alpha = Some(alpha);
                    }
                    Err(e) => {
                        self.fault(e);
                        return;
                    }
                }
            }
        }

        if self.status != SlotStatus::Playing {
            return;
        }
        let Some(remaining) = self.remaining() else {
            return;
        };
        if let Some(trigger) = self.trigger.as_mut() {
            match trigger.update(remaining) {
                Some(TriggerEdge::Rising) => debug!(
                    target: GPIO,
                    "Slot {}: trigger on ({:.2}s remaining)",
                    self.index,
                    remaining
                ),
                Some(TriggerEdge::Falling) => debug!(
                    target: GPIO,
                    "Slot {}: trigger off ({:.2}s remaining)",
                    self.index,
                    remaining
                ),
                None => {}
            }
        }
    }

    /// Periodic management: unload a finished session, otherwise poll and fade
    ///
    /// Returns `true` when the session was unloaded.
    pub async fn service(&mut self) -> bool {
        if self.status.is_finished() {
            debug!("Slot {}: releasing {} session", self.index, self.status);
            return self.unload().await;
        }
        if self.session.is_none() {
            return false;
        }
        self.poll_status().await;
        self.apply_fade().await;
        false
    }

    /// Rewind, show at the start transparency and begin playback
    ///
    /// Returns `false` (and marks the slot faulted) when the session
    /// rejected a command, or when there is no session to start.
    pub async fn start(&mut self) -> bool {
        let limit = self.settings.query_timeout;
        let volume_linked = self.settings.volume_linked;
        let alpha = self.fade.alpha_start;
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let started = async {
            guarded(limit, session.set_position(0.0)).await?;
            guarded(limit, session.set_alpha(alpha)).await?;
            if volume_linked {
                guarded(limit, session.set_volume(volume_for_alpha(alpha))).await?;
            }
            guarded(limit, session.play()).await
        }
        .await;

        match started {
            Ok(()) => {
                self.position = 0.0;
                self.status = SlotStatus::Playing;
                self.last_alpha = Some(alpha);
                debug!("Slot {}: playing", self.index);
                true
            }
            Err(e) => {
                self.fault(e);
                false
            }
        }
    }

    /// Make a playing session fade out right away
    ///
    /// Drops the fade-in and pretends the video ends `fade_out_time` plus
    /// one tick from the last sampled position, so the regular envelope
    /// ramps it down. Slots without a known position are left alone.
    pub fn begin_early_fade_out(&mut self, fade_out_time: f64, tick: Duration) -> bool {
        if self.session.is_none() || self.position < 0.0 {
            return false;
        }
        self.fade.fade_in_time = 0.0;
        self.fade.fade_out_time = fade_out_time;
        self.duration = self.position + fade_out_time + tick.as_secs_f64();
        debug!(
            "Slot {}: early fade-out, ends at {:.2}s",
            self.index, self.duration
        );
        true
    }

    /// Playing inside its fade-in or fade-out window
    pub fn is_mid_fade(&self) -> bool {
        self.status == SlotStatus::Playing && self.fade.is_ramping(self.position, self.duration)
    }

    /// Can take a new video (after unloading a finished session)
    pub fn is_reusable(&self) -> bool {
        self.status == SlotStatus::Absent || self.status.is_finished()
    }

    /// Seconds of playback left, when position and duration are known
    pub fn remaining(&self) -> Option<f64> {
        (self.duration >= 0.0 && self.position >= 0.0).then(|| self.duration - self.position)
    }

    fn fault(&mut self, error: SessionError) {
        warn!("Slot {}: session fault: {}", self.index, error);
        self.status = SlotStatus::Faulted(error.to_string());
        self.position = UNKNOWN;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn layer(&self) -> i32 {
        self.settings.layer
    }

    pub fn status(&self) -> &SlotStatus {
        &self.status
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn fade(&self) -> &FadeProfile {
        &self.fade
    }

    pub fn last_alpha(&self) -> Option<u8> {
        self.last_alpha
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn reference(&self) -> Option<&Path> {
        self.reference.as_deref()
    }

    pub fn trigger_lit(&self) -> bool {
        self.trigger.as_ref().is_some_and(|t| t.is_lit())
    }
}
