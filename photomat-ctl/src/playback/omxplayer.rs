//! omxplayer backend
//!
//! One `omxplayer` process per session, rendering straight to a dispmanx
//! layer. Control and queries go over the player's MPRIS D-Bus interface
//! through `dbus-send`. The session bus address is the one omxplayer
//! writes to `/tmp/omxplayerdbus.<user>`.
//!
//! **Timing:** position and duration travel as microseconds.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use photomat_common::config::PlayerConfig;
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

use super::session::{OpenRequest, PlayerBackend, PlayerSession, ReportedStatus};
use crate::error::SessionError;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const PROPERTIES: &str = "org.freedesktop.DBus.Properties";
const PLAYER: &str = "org.mpris.MediaPlayer2.Player";
const ROOT: &str = "org.mpris.MediaPlayer2";

/// Volume sent for a silent player (millibels)
const SILENT_MILLIBELS: i64 = -10_000;

/// Interval between readiness checks while a player starts
const READY_POLL: Duration = Duration::from_millis(50);

/// How long a player may take to exit after Quit before it is killed
const QUIT_GRACE: Duration = Duration::from_millis(500);

/// Spawns omxplayer processes
#[derive(Debug, Clone)]
pub struct OmxBackend {
    config: PlayerConfig,
    pid: u32,
}

impl OmxBackend {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            pid: std::process::id(),
        }
    }

    fn bus_address_file(&self) -> PathBuf {
        self.config.dbus_address_file.clone().unwrap_or_else(|| {
            let user = std::env::var("USER")
                .or_else(|_| std::env::var("LOGNAME"))
                .unwrap_or_else(|_| "root".to_string());
            PathBuf::from(format!("/tmp/omxplayerdbus.{}", user))
        })
    }

    /// D-Bus name of the player instance serving `slot`
    pub fn bus_name(&self, slot: usize) -> String {
        format!("org.mpris.MediaPlayer2.omxplayer{}_{}", self.pid, slot)
    }

    fn command(&self, request: &OpenRequest, bus_name: &str) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .arg("--win")
            .arg(request.viewport.to_string())
            .args(["--aspect-mode", "letterbox"])
            .arg("--layer")
            .arg(request.layer.to_string())
            .arg("--alpha")
            .arg(request.initial_alpha.to_string())
            .arg("--vol")
            .arg(volume_to_millibels(request.initial_volume).to_string())
            .arg("--dbus_name")
            .arg(bus_name)
            .args(&self.config.extra_args)
            .args(&request.extra_args)
            .arg(&request.reference)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl PlayerBackend for OmxBackend {
    async fn open(&self, request: &OpenRequest) -> Result<Box<dyn PlayerSession>, SessionError> {
        let bus_name = self.bus_name(request.slot);
        debug!(
            "Starting {} for {} on layer {}",
            self.config.binary.display(),
            request.reference.display(),
            request.layer
        );

        let child = self
            .command(request, &bus_name)
            .spawn()
            .map_err(|e| SessionError::Spawn(format!("{}: {}", self.config.binary.display(), e)))?;

        let mut session = OmxSession {
            child,
            control: DbusControl {
                dbus_send: self.config.dbus_send.clone(),
                bus_name,
                bus_address_file: self.bus_address_file(),
                bus_address: None,
                reply_timeout_ms: self.config.reply_timeout_ms,
            },
        };

        session.wait_until_ready().await?;
        session.control.call(PLAYER, "Pause", &[]).await?;
        Ok(Box::new(session))
    }
}

/// `dbus-send` wrapper addressing one player instance
#[derive(Debug)]
struct DbusControl {
    dbus_send: PathBuf,
    bus_name: String,
    bus_address_file: PathBuf,
    bus_address: Option<String>,
    reply_timeout_ms: u64,
}

impl DbusControl {
    /// Read the session bus address once the player has published it
    async fn resolve_bus_address(&mut self) {
        if self.bus_address.is_some() {
            return;
        }
        if let Ok(content) = tokio::fs::read_to_string(&self.bus_address_file).await {
            let address = content.trim();
            if !address.is_empty() {
                trace!("D-Bus address {}", address);
                self.bus_address = Some(address.to_string());
            }
        }
    }

    /// Invoke `interface.member` and return the literal reply text
    async fn call(&self, interface: &str, member: &str, args: &[String]) -> Result<String, SessionError> {
        let mut command = Command::new(&self.dbus_send);
        command
            .arg("--print-reply=literal")
            .arg("--session")
            .arg(format!("--reply-timeout={}", self.reply_timeout_ms))
            .arg(format!("--dest={}", self.bus_name))
            .arg(OBJECT_PATH)
            .arg(format!("{}.{}", interface, member))
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(address) = &self.bus_address {
            command.env("DBUS_SESSION_BUS_ADDRESS", address);
        }

        let output = command
            .output()
            .await
            .map_err(|e| SessionError::Call(format!("{}: {}", self.dbus_send.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::Call(format!("{}: {}", member, stderr.trim())));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn query_micros(&self, member: &str) -> Result<f64, SessionError> {
        let reply = self.call(PROPERTIES, member, &[]).await?;
        parse_int64_reply(&reply).map(micros_to_seconds)
    }
}

/// Running omxplayer process and its control channel
pub struct OmxSession {
    child: Child,
    control: DbusControl,
}

impl OmxSession {
    /// Poll until the player answers on D-Bus
    ///
    /// Unbounded here; the caller applies the open timeout.
    async fn wait_until_ready(&mut self) -> Result<(), SessionError> {
        loop {
            if let Some(status) = self
                .child
                .try_wait()
                .map_err(|e| SessionError::Spawn(e.to_string()))?
            {
                return Err(SessionError::Spawn(format!("player exited during startup ({})", status)));
            }

            self.control.resolve_bus_address().await;
            match self.control.call(PROPERTIES, "PlaybackStatus", &[]).await {
                Ok(_) => {
                    debug!("{} ready", self.control.bus_name);
                    return Ok(());
                }
                Err(e) => trace!("{} not ready: {}", self.control.bus_name, e),
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }
}

#[async_trait]
impl PlayerSession for OmxSession {
    async fn position(&mut self) -> Result<f64, SessionError> {
        self.control.query_micros("Position").await
    }

    async fn duration(&mut self) -> Result<f64, SessionError> {
        self.control.query_micros("Duration").await
    }

    async fn playback_status(&mut self) -> Result<ReportedStatus, SessionError> {
        let reply = self.control.call(PROPERTIES, "PlaybackStatus", &[]).await?;
        parse_status_reply(&reply)
    }

    async fn set_alpha(&mut self, alpha: u8) -> Result<(), SessionError> {
        let args = ["objpath:/not/used".to_string(), format!("int64:{}", alpha)];
        self.control.call(PLAYER, "SetAlpha", &args).await.map(drop)
    }

    async fn set_volume(&mut self, volume: f64) -> Result<(), SessionError> {
        let args = [format!("double:{}", volume.clamp(0.0, 1.0))];
        self.control.call(PROPERTIES, "Volume", &args).await.map(drop)
    }

    async fn set_position(&mut self, seconds: f64) -> Result<(), SessionError> {
        let args = [
            "objpath:/not/used".to_string(),
            format!("int64:{}", seconds_to_micros(seconds)),
        ];
        self.control.call(PLAYER, "SetPosition", &args).await.map(drop)
    }

    async fn play(&mut self) -> Result<(), SessionError> {
        self.control.call(PLAYER, "Play", &[]).await.map(drop)
    }

    async fn quit(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.control.call(ROOT, "Quit", &[]).await {
            debug!("{}: Quit not acknowledged: {}", self.control.bus_name, e);
        }

        match tokio::time::timeout(QUIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                trace!("{} exited ({})", self.control.bus_name, status);
                Ok(())
            }
            Ok(Err(e)) => Err(SessionError::Call(e.to_string())),
            Err(_) => {
                warn!("{} ignored Quit, killing it", self.control.bus_name);
                self.child
                    .kill()
                    .await
                    .map_err(|e| SessionError::Call(e.to_string()))
            }
        }
    }
}

/// Linear volume (0.0 to 1.0) as omxplayer millibels
pub fn volume_to_millibels(volume: f64) -> i64 {
    if volume.is_nan() || volume <= 0.0 {
        return SILENT_MILLIBELS;
    }
    let millibels = 2000.0 * volume.min(1.0).log10();
    (millibels.round() as i64).max(SILENT_MILLIBELS)
}

fn micros_to_seconds(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

fn seconds_to_micros(seconds: f64) -> i64 {
    (seconds.max(0.0) * 1_000_000.0).round() as i64
}

/// Parse `int64 N` from a literal `dbus-send` reply
fn parse_int64_reply(reply: &str) -> Result<i64, SessionError> {
    reply
        .split_whitespace()
        .last()
        .and_then(|token| token.parse::<i64>().ok())
        .ok_or_else(|| SessionError::Reply(reply.trim().to_string()))
}

fn parse_status_reply(reply: &str) -> Result<ReportedStatus, SessionError> {
    match reply.trim() {
        "Playing" => Ok(ReportedStatus::Playing),
        "Paused" => Ok(ReportedStatus::Paused),
        "Stopped" => Ok(ReportedStatus::Stopped),
        other => Err(SessionError::Reply(other.to_string())),
    }
}
