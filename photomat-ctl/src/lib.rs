//! # Photomat Booth Controller Library (photomat-ctl)
//!
//! Drives an unattended photo-booth display: an idle video loop with
//! double-buffered crossfades, a countdown sequence that fires a camera
//! trigger pulse at a fixed offset before its end, and an applause
//! sequence before returning to idle.
//!
//! **Architecture:** one cooperative control loop ([`scheduler::Scheduler`])
//! owning three [`playback::PlaybackSlot`]s, the video catalogs and the
//! debounced GPIO inputs. Video players and GPIO lines sit behind traits
//! ([`playback::PlayerBackend`], [`gpio::DigitalInput`],
//! [`gpio::DigitalOutput`]) so the scheduler can be driven tick by tick in
//! tests.

pub mod catalog;
pub mod error;
pub mod gpio;
pub mod playback;
pub mod scheduler;

pub use error::{Error, Result};
pub use scheduler::{Phase, Scheduler};
