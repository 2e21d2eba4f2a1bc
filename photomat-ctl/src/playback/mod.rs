//! Playback slots and the player collaborator
//!
//! - [`session`]: backend/session traits implemented by real players and test fakes
//! - [`slot`]: one session bound to a fixed layer, with its fade and trigger logic
//! - [`fade`]: transparency envelope math
//! - [`trigger`]: camera trigger timing
//! - [`omxplayer`]: Raspberry Pi omxplayer backend

pub mod fade;
pub mod omxplayer;
pub mod session;
pub mod slot;
pub mod trigger;

pub use fade::FadeProfile;
pub use omxplayer::OmxBackend;
pub use session::{OpenRequest, PlayerBackend, PlayerSession, ReportedStatus};
pub use slot::{PlaybackSlot, SlotSettings, SlotStatus};
pub use trigger::{TriggerBinding, TriggerEdge, TriggerOffsets};
