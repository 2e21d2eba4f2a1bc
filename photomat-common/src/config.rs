//! Booth configuration and config file resolution
//!
//! All settings live in a single TOML file. Every field has a built-in
//! default, so the booth starts (with defaults) even when no file is found.
//!
//! # Config file resolution
//!
//! 1. Command-line argument `--config` (highest priority)
//! 2. Environment variable `PHOTOMAT_CONFIG`
//! 3. User config: `~/.config/photomat/config.toml`
//! 4. System config: `/etc/photomat/config.toml`
//! 5. Built-in defaults (fallback)
//!
//! An empty video list is deliberately *not* a validation error: the
//! scheduler treats it as fatal only when it actually needs a video from
//! that category.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PHOTOMAT_CONFIG";

/// Complete booth configuration
///
/// Scalar fields come first so the struct serializes to valid TOML
/// (values before tables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoothConfig {
    /// Control loop period in milliseconds
    pub tick_ms: u64,

    /// Upper bound for a single position/status query or player command
    pub query_timeout_ms: u64,

    /// Upper bound for opening a new playback session
    pub open_timeout_ms: u64,

    /// Upper bound for shutting a player down (Quit, grace period, kill)
    pub quit_timeout_ms: u64,

    /// Verbosity level 0-5 (none, state, progress, gpio, video info, action)
    pub verbosity: u8,

    /// Consecutive countdown load failures tolerated before returning to idle
    pub countdown_load_attempts: u32,

    pub player: PlayerConfig,
    pub gpio: GpioConfig,
    pub trigger: TriggerConfig,
    pub slots: SlotsConfig,
    pub idle: CatalogConfig,
    pub countdown: CatalogConfig,
    pub applause: CatalogConfig,
}

impl Default for BoothConfig {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            query_timeout_ms: 500,
            open_timeout_ms: 10_000,
            quit_timeout_ms: 2_000,
            verbosity: 1,
            countdown_load_attempts: 3,
            player: PlayerConfig::default(),
            gpio: GpioConfig::default(),
            trigger: TriggerConfig::default(),
            slots: SlotsConfig::default(),
            idle: CatalogConfig::default(),
            countdown: CatalogConfig::default(),
            applause: CatalogConfig::default(),
        }
    }
}

/// External video player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Player executable
    pub binary: PathBuf,

    /// `dbus-send` executable used for player control
    pub dbus_send: PathBuf,

    /// File the player writes its session bus address to.
    /// Defaults to `/tmp/omxplayerdbus.<user>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbus_address_file: Option<PathBuf>,

    /// D-Bus reply timeout handed to `dbus-send`
    pub reply_timeout_ms: u64,

    /// Extra arguments appended to every player invocation
    pub extra_args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("omxplayer"),
            dbus_send: PathBuf::from("dbus-send"),
            dbus_address_file: None,
            reply_timeout_ms: 500,
            extra_args: Vec::new(),
        }
    }
}

/// GPIO line assignments (BCM numbering on the default chip)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// GPIO character device
    pub chip: PathBuf,

    /// Photo buzzer pushbutton (J8 pin 11 on a Raspberry Pi)
    pub buzzer_pin: u32,

    /// Exit pushbutton (J8 pin 16)
    pub exit_pin: u32,

    /// Camera trigger output (J8 pin 26)
    pub trigger_pin: u32,

    /// Consumer label shown by `gpioinfo`
    pub consumer: String,

    /// Consecutive identical samples required to accept a button press
    pub debounce_ticks: u32,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            chip: PathBuf::from("/dev/gpiochip0"),
            buzzer_pin: 17,
            exit_pin: 23,
            trigger_pin: 7,
            consumer: "photomat".to_string(),
            debounce_ticks: 2,
        }
    }
}

/// Camera trigger pulse timing, in seconds before the end of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Remaining time at which the output switches on
    pub on_offset: f64,

    /// Remaining time at which the output switches off
    pub off_offset: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            on_offset: 2.0,
            off_offset: 1.0,
        }
    }
}

/// Selection policy for a video catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Play entries in list order, wrapping around
    #[default]
    Sequential,

    /// Pick a uniformly random entry each time
    Random,
}

/// One video category (idle, countdown or applause)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub mode: SelectionMode,

    /// Seed for random mode; omitted means seeded from the OS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Explicit video list
    pub videos: Vec<PathBuf>,

    /// Directory scanned for videos (appended after `videos`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Fade-in duration in seconds
    pub fade_in: f64,

    /// Fade-out duration in seconds
    pub fade_out: f64,

    /// Transparency at sequence start
    pub alpha_start: u8,

    /// Transparency while playing
    pub alpha_play: u8,

    /// Transparency at sequence end
    pub alpha_end: u8,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::Sequential,
            seed: None,
            videos: Vec::new(),
            directory: None,
            fade_in: 2.0,
            fade_out: 2.0,
            alpha_start: 0,
            alpha_play: 255,
            alpha_end: 0,
        }
    }
}

/// Display settings for one playback slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Render layer (higher numbers are on top)
    pub layer: i32,

    #[serde(default)]
    pub viewport: Viewport,

    /// Mirror transparency to volume so audio fades with the picture
    #[serde(default = "default_true")]
    pub volume_linked: bool,
}

fn default_true() -> bool {
    true
}

/// The three fixed playback slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotsConfig {
    #[serde(default = "default_idle_first")]
    pub idle_first: SlotConfig,

    #[serde(default = "default_idle_second")]
    pub idle_second: SlotConfig,

    #[serde(default = "default_countdown_slot")]
    pub countdown: SlotConfig,
}

fn slot_on_layer(layer: i32) -> SlotConfig {
    SlotConfig {
        layer,
        viewport: Viewport::default(),
        volume_linked: true,
    }
}

fn default_idle_first() -> SlotConfig {
    slot_on_layer(2)
}

fn default_idle_second() -> SlotConfig {
    slot_on_layer(1)
}

fn default_countdown_slot() -> SlotConfig {
    slot_on_layer(4)
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            idle_first: default_idle_first(),
            idle_second: default_idle_second(),
            countdown: default_countdown_slot(),
        }
    }
}

/// Display rectangle `x1,y1,x2,y2` (inclusive corners)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Viewport {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x1: 0,
            y1: 0,
            x2: 1919,
            y2: 1079,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
    }
}

impl FromStr for Viewport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidInput(format!("viewport '{}': {}", s, e)))?;

        let (x1, y1, x2, y2) = match parts.as_slice() {
            [x1, y1, x2, y2] => (*x1, *y1, *x2, *y2),
            _ => {
                return Err(Error::InvalidInput(format!(
                    "viewport '{}' must have four comma-separated values",
                    s
                )))
            }
        };

        if x2 <= x1 || y2 <= y1 {
            return Err(Error::InvalidInput(format!(
                "viewport '{}' has an empty area",
                s
            )));
        }

        Ok(Self { x1, y1, x2, y2 })
    }
}

impl TryFrom<String> for Viewport {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Viewport> for String {
    fn from(viewport: Viewport) -> Self {
        viewport.to_string()
    }
}

impl BoothConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, falling back to built-in defaults
    ///
    /// Returns the config together with the file it came from (`None` when
    /// the built-in defaults were used). Logging is not initialised yet when
    /// this runs, so the caller reports the source.
    pub fn load(cli_arg: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match resolve_config_path(cli_arg) {
            Some(path) => {
                let config = Self::load_file(&path)?;
                Ok((config, Some(path)))
            }
            None => {
                let config = Self::default();
                config.validate()?;
                Ok((config, None))
            }
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be greater than zero".into()));
        }
        if self.query_timeout_ms == 0 || self.open_timeout_ms == 0 || self.quit_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be greater than zero".into()));
        }
        if self.gpio.debounce_ticks == 0 {
            return Err(Error::Config("gpio.debounce_ticks must be at least 1".into()));
        }
        if self.countdown_load_attempts == 0 {
            return Err(Error::Config(
                "countdown_load_attempts must be at least 1".into(),
            ));
        }

        let trigger = &self.trigger;
        if !trigger.on_offset.is_finite() || !trigger.off_offset.is_finite() || trigger.off_offset < 0.0 {
            return Err(Error::Config(
                "trigger offsets must be finite and not negative".into(),
            ));
        }
        if trigger.off_offset >= trigger.on_offset {
            return Err(Error::Config(format!(
                "trigger.off_offset ({}) must be smaller than trigger.on_offset ({})",
                trigger.off_offset, trigger.on_offset
            )));
        }

        for (name, catalog) in [
            ("idle", &self.idle),
            ("countdown", &self.countdown),
            ("applause", &self.applause),
        ] {
            for (field, value) in [("fade_in", catalog.fade_in), ("fade_out", catalog.fade_out)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::Config(format!(
                        "{}.{} must be a non-negative number of seconds",
                        name, field
                    )));
                }
            }
        }

        let pins = [self.gpio.buzzer_pin, self.gpio.exit_pin, self.gpio.trigger_pin];
        if pins[0] == pins[1] || pins[0] == pins[2] || pins[1] == pins[2] {
            return Err(Error::Config("GPIO pins must be distinct".into()));
        }

        let layers = [
            self.slots.idle_first.layer,
            self.slots.idle_second.layer,
            self.slots.countdown.layer,
        ];
        if layers[0] == layers[1] || layers[0] == layers[2] || layers[1] == layers[2] {
            return Err(Error::Config("slot layers must be distinct".into()));
        }

        Ok(())
    }

    /// Control loop period
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Per-call timeout for player queries and commands
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Timeout for opening a playback session
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Timeout for terminating a playback session
    pub fn quit_timeout(&self) -> Duration {
        Duration::from_millis(self.quit_timeout_ms)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))
    }
}

/// Find the config file to load, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3/4: user then system config file
    default_config_locations().into_iter().find(|p| p.exists())
}

/// Well-known config file locations in priority order
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("photomat").join("config.toml"));
    }
    locations.push(PathBuf::from("/etc/photomat/config.toml"));
    locations
}
