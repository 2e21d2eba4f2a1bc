//! Scripted player backend
//!
//! Every opened session is recorded in a shared [`FakeWorld`]. Tests move
//! playback time forward with [`FakeWorld::advance`] and script failures
//! per session or per video.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use photomat_ctl::error::SessionError;
use photomat_ctl::playback::{OpenRequest, PlayerBackend, PlayerSession, ReportedStatus};

/// One session ever opened by the fake backend
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub reference: PathBuf,
    pub slot: usize,
    pub layer: i32,
    pub initial_alpha: u8,
    pub initial_volume: f64,
    pub position: f64,
    pub duration: f64,
    pub status: ReportedStatus,
    pub alive: bool,
    pub alpha_writes: Vec<u8>,
    pub volume_writes: Vec<f64>,
    pub play_calls: u32,
    pub quit_calls: u32,
    /// Position/status/duration queries fail
    pub fail_queries: bool,
    /// Only duration queries fail
    pub fail_duration: bool,
    /// Every call hangs forever
    pub hang: bool,
    /// Time the player takes to shut down after Quit
    pub quit_delay: Duration,
}

/// Shared state behind the fake backend and its sessions
#[derive(Debug)]
pub struct FakeWorld {
    pub sessions: Vec<SessionRecord>,
    pub open_attempts: Vec<PathBuf>,
    pub durations: HashMap<PathBuf, f64>,
    pub default_duration: f64,
    pub fail_open: HashSet<PathBuf>,
    pub fail_duration: HashSet<PathBuf>,
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self {
            sessions: Vec::new(),
            open_attempts: Vec::new(),
            durations: HashMap::new(),
            default_duration: 10.0,
            fail_open: HashSet::new(),
            fail_duration: HashSet::new(),
        }
    }
}

impl FakeWorld {
    /// Move playback time forward for every playing session
    pub fn advance(&mut self, seconds: f64) {
        for session in self.sessions.iter_mut().filter(|s| s.alive) {
            if session.status != ReportedStatus::Playing {
                continue;
            }
            session.position += seconds;
            if session.position >= session.duration {
                session.position = session.duration;
                session.status = ReportedStatus::Stopped;
            }
        }
    }

    /// Sessions still running, in opening order
    pub fn alive(&self) -> Vec<&SessionRecord> {
        self.sessions.iter().filter(|s| s.alive).collect()
    }

    /// References of all successfully opened sessions, in opening order
    pub fn opened(&self) -> Vec<PathBuf> {
        self.sessions.iter().map(|s| s.reference.clone()).collect()
    }

    /// Most recent session opened for a slot
    pub fn latest_for_slot(&mut self, slot: usize) -> Option<&mut SessionRecord> {
        self.sessions.iter_mut().rev().find(|s| s.slot == slot)
    }

    pub fn attempts_for(&self, reference: &Path) -> usize {
        self.open_attempts.iter().filter(|r| r.as_path() == reference).count()
    }
}

/// Backend handing out [`FakeSession`]s
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub world: Arc<Mutex<FakeWorld>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerBackend for FakeBackend {
    async fn open(&self, request: &OpenRequest) -> Result<Box<dyn PlayerSession>, SessionError> {
        let mut world = self.world.lock().unwrap();
        world.open_attempts.push(request.reference.clone());
        if world.fail_open.contains(&request.reference) {
            return Err(SessionError::Spawn(format!(
                "cannot open {}",
                request.reference.display()
            )));
        }

        let duration = world
            .durations
            .get(&request.reference)
            .copied()
            .unwrap_or(world.default_duration);
        let fail_duration = world.fail_duration.contains(&request.reference);
        world.sessions.push(SessionRecord {
            reference: request.reference.clone(),
            slot: request.slot,
            layer: request.layer,
            initial_alpha: request.initial_alpha,
            initial_volume: request.initial_volume,
            position: 0.0,
            duration,
            status: ReportedStatus::Paused,
            alive: true,
            alpha_writes: Vec::new(),
            volume_writes: Vec::new(),
            play_calls: 0,
            quit_calls: 0,
            fail_queries: false,
            fail_duration,
            hang: false,
            quit_delay: Duration::ZERO,
        });

        Ok(Box::new(FakeSession {
            id: world.sessions.len() - 1,
            world: Arc::clone(&self.world),
        }))
    }
}

/// Handle to one [`SessionRecord`]
pub struct FakeSession {
    id: usize,
    world: Arc<Mutex<FakeWorld>>,
}

impl FakeSession {
    async fn call<T>(
        &self,
        f: impl FnOnce(&mut SessionRecord) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let hang = self.world.lock().unwrap().sessions[self.id].hang;
        if hang {
            std::future::pending::<()>().await;
        }

        let mut world = self.world.lock().unwrap();
        let record = &mut world.sessions[self.id];
        if !record.alive {
            return Err(SessionError::Closed);
        }
        f(record)
    }
}

fn scripted_failure() -> SessionError {
    SessionError::Call("scripted failure".to_string())
}

#[async_trait]
impl PlayerSession for FakeSession {
    async fn position(&mut self) -> Result<f64, SessionError> {
        self.call(|s| {
            if s.fail_queries {
                return Err(scripted_failure());
            }
            Ok(s.position)
        })
        .await
    }

    async fn duration(&mut self) -> Result<f64, SessionError> {
        self.call(|s| {
            if s.fail_queries || s.fail_duration {
                return Err(scripted_failure());
            }
            Ok(s.duration)
        })
        .await
    }

    async fn playback_status(&mut self) -> Result<ReportedStatus, SessionError> {
        self.call(|s| {
            if s.fail_queries {
                return Err(scripted_failure());
            }
            Ok(s.status)
        })
        .await
    }

    async fn set_alpha(&mut self, alpha: u8) -> Result<(), SessionError> {
        self.call(|s| {
            s.alpha_writes.push(alpha);
            Ok(())
        })
        .await
    }

    async fn set_volume(&mut self, volume: f64) -> Result<(), SessionError> {
        self.call(|s| {
            s.volume_writes.push(volume);
            Ok(())
        })
        .await
    }

    async fn set_position(&mut self, seconds: f64) -> Result<(), SessionError> {
        self.call(|s| {
            s.position = seconds;
            Ok(())
        })
        .await
    }

    async fn play(&mut self) -> Result<(), SessionError> {
        self.call(|s| {
            s.play_calls += 1;
            s.status = ReportedStatus::Playing;
            Ok(())
        })
        .await
    }

    async fn quit(&mut self) -> Result<(), SessionError> {
        let delay = self.world.lock().unwrap().sessions[self.id].quit_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut world = self.world.lock().unwrap();
        let record = &mut world.sessions[self.id];
        record.quit_calls += 1;
        record.alive = false;
        record.status = ReportedStatus::Stopped;
        Ok(())
    }
}
