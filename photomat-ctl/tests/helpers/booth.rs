//! Scheduler wired to fake collaborators, driven tick by tick

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use photomat_ctl::catalog::{Category, VideoCatalog};
use photomat_ctl::playback::{FadeProfile, TriggerBinding, TriggerOffsets};
use photomat_ctl::scheduler::{Hardware, Phase, Scheduler, SchedulerSettings, Sequence, Sequences};

use super::fake_gpio::{FakeInput, FakeOutput};
use super::fake_player::{FakeBackend, FakeWorld};

/// Video list `/videos/<prefix>NN.mp4`
pub fn videos(prefix: &str, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("/videos/{}{:02}.mp4", prefix, i)))
        .collect()
}

/// Catalog contents for a test booth
pub struct BoothVideos {
    pub idle: Vec<PathBuf>,
    pub countdown: Vec<PathBuf>,
    pub applause: Vec<PathBuf>,
}

impl Default for BoothVideos {
    fn default() -> Self {
        Self {
            idle: videos("idle", 4),
            countdown: videos("countdown", 1),
            applause: videos("applause", 1),
        }
    }
}

/// Scheduler plus handles on all of its fake collaborators
pub struct Booth {
    pub scheduler: Scheduler,
    pub world: Arc<Mutex<FakeWorld>>,
    pub buzzer: FakeInput,
    pub exit_button: FakeInput,
    pub trigger: FakeOutput,
    tick_seconds: f64,
}

impl Booth {
    pub fn new(videos: BoothVideos) -> Self {
        Self::with_settings(videos, SchedulerSettings::default())
    }

    pub fn with_settings(videos: BoothVideos, settings: SchedulerSettings) -> Self {
        let backend = FakeBackend::new();
        let world = Arc::clone(&backend.world);
        let buzzer = FakeInput::new();
        let exit_button = FakeInput::new();
        let trigger = FakeOutput::new();

        let sequence = |category, entries| {
            Sequence::new(VideoCatalog::sequential(category, entries), FadeProfile::default())
        };
        let sequences = Sequences {
            idle: sequence(Category::Idle, videos.idle),
            countdown: sequence(Category::Countdown, videos.countdown),
            applause: sequence(Category::Applause, videos.applause),
        };
        let hardware = Hardware {
            buzzer: Box::new(buzzer.clone()),
            exit_button: Box::new(exit_button.clone()),
            trigger: Some(TriggerBinding::new(
                Box::new(trigger.clone()),
                TriggerOffsets::new(2.0, 1.0).unwrap(),
            )),
        };

        let tick_seconds = settings.tick_period.as_secs_f64();
        Self {
            scheduler: Scheduler::new(settings, Box::new(backend), sequences, hardware),
            world,
            buzzer,
            exit_button,
            trigger,
            tick_seconds,
        }
    }

    pub fn world(&self) -> MutexGuard<'_, FakeWorld> {
        self.world.lock().unwrap()
    }

    /// Advance playback time by one tick period, then run one tick
    pub async fn tick(&mut self) {
        self.world().advance(self.tick_seconds);
        self.scheduler.tick().await;
    }

    pub async fn ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.tick().await;
        }
    }

    /// Tick until `done` holds, recording each phase entered on the way
    ///
    /// Consecutive repeats are collapsed. Gives up after `max_ticks`.
    pub async fn phase_trace<F>(&mut self, max_ticks: usize, mut done: F) -> Vec<Phase>
    where
        F: FnMut(&Booth) -> bool,
    {
        let mut trace: Vec<Phase> = Vec::new();
        for _ in 0..max_ticks {
            self.tick().await;
            let phase = self.scheduler.phase();
            if trace.last() != Some(&phase) {
                trace.push(phase);
            }
            if done(self) {
                break;
            }
        }
        trace
    }

    /// Tick until `done` holds; returns false if `max_ticks` ran out
    pub async fn tick_until<F>(&mut self, max_ticks: usize, mut done: F) -> bool
    where
        F: FnMut(&Booth) -> bool,
    {
        for _ in 0..max_ticks {
            self.tick().await;
            if done(self) {
                return true;
            }
        }
        false
    }
}
