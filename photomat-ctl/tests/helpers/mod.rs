//! Test helpers for photomat-ctl integration tests
//!
//! - FakeBackend / FakeWorld: scripted player sessions with a manual clock
//! - FakeInput / FakeOutput: in-memory GPIO lines
//! - Booth: scheduler wired to the fakes
//! - LogCapture: thread-local tracing capture

#![allow(dead_code)]

pub mod booth;
pub mod fake_gpio;
pub mod fake_player;
pub mod log_capture;

pub use booth::{videos, Booth, BoothVideos};
pub use fake_gpio::{FakeInput, FakeOutput};
pub use fake_player::{FakeBackend, FakeSession, FakeWorld, SessionRecord};
pub use log_capture::{LogCapture, LogRecord};
