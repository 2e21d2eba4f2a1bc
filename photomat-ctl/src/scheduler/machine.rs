//! Booth state machine and control loop
//!
//! # Slots
//!
//! | Index | Role |
//! |---|---|
//! | 0, 1 | idle double buffer (one visible, the other staged) |
//! | 2 | countdown, with the camera trigger attached |
//!
//! The applause sequence is played through the idle slots, so the regular
//! idle crossfade takes over when it ends.
//!
//! # Tick
//!
//! 1. service one slot (round-robin): unload if finished, else poll + fade
//! 2. re-arm the buzzer once the countdown slot is empty again
//! 3. sample the buttons; an accepted press forces the phase
//! 4. evaluate the current phase (skipped on a tick with a forced phase)

use std::future::Future;
use std::time::Duration;

use photomat_common::config::{BoothConfig, CatalogConfig, SlotConfig};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use super::phase::{CountdownStage, IdleSlot, Phase};
use crate::catalog::{Category, VideoCatalog};
use crate::gpio::{DigitalInput, InputDebouncer, LOG_TARGET as GPIO};
use crate::playback::{FadeProfile, PlaybackSlot, PlayerBackend, SlotSettings, SlotStatus, TriggerBinding};
use crate::{Error, Result};

pub const IDLE_FIRST: usize = 0;
pub const IDLE_SECOND: usize = 1;
pub const COUNTDOWN: usize = 2;
pub const SLOT_COUNT: usize = 3;

/// Extra margin (in ticks) before the visible idle video starts fading
/// out at which the staged one is started
const START_MARGIN_TICKS: f64 = 3.0;

/// Catalog plus the fade envelope its videos are played with
#[derive(Debug)]
pub struct Sequence {
    pub catalog: VideoCatalog,
    pub fade: FadeProfile,
}

impl Sequence {
    pub fn new(catalog: VideoCatalog, fade: FadeProfile) -> Self {
        Self { catalog, fade }
    }
}

/// The three video sequences of the booth
#[derive(Debug)]
pub struct Sequences {
    pub idle: Sequence,
    pub countdown: Sequence,
    pub applause: Sequence,
}

impl Sequences {
    /// Build all catalogs from configuration (scanning directories)
    pub fn from_config(config: &BoothConfig) -> Result<Self> {
        let build = |category: Category, catalog: &CatalogConfig| -> Result<Sequence> {
            Ok(Sequence::new(
                VideoCatalog::from_config(category, catalog)?,
                FadeProfile::from(catalog),
            ))
        };
        Ok(Self {
            idle: build(Category::Idle, &config.idle)?,
            countdown: build(Category::Countdown, &config.countdown)?,
            applause: build(Category::Applause, &config.applause)?,
        })
    }

    fn get_mut(&mut self, category: Category) -> &mut Sequence {
        match category {
            Category::Idle => &mut self.idle,
            Category::Countdown => &mut self.countdown,
            Category::Applause => &mut self.applause,
        }
    }
}

/// Digital I/O used by the scheduler
pub struct Hardware {
    pub buzzer: Box<dyn DigitalInput>,
    pub exit_button: Box<dyn DigitalInput>,
    /// Camera trigger, driven by the countdown slot
    pub trigger: Option<TriggerBinding>,
}

/// Fixed scheduler parameters
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub tick_period: Duration,
    pub debounce_ticks: u32,
    /// Consecutive countdown load failures before the countdown is abandoned
    pub countdown_load_attempts: u32,
    /// Idle first, idle second, countdown
    pub slots: [SlotSettings; SLOT_COUNT],
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        let on_layer = |layer| SlotSettings {
            layer,
            ..SlotSettings::default()
        };
        Self {
            tick_period: Duration::from_millis(20),
            debounce_ticks: 2,
            countdown_load_attempts: 3,
            slots: [on_layer(2), on_layer(1), on_layer(4)],
        }
    }
}

impl SchedulerSettings {
    /// Derive from configuration; `extra_args` are appended to every player
    pub fn from_config(config: &BoothConfig, extra_args: &[String]) -> Self {
        let slot = |slot_config: &SlotConfig| SlotSettings {
            layer: slot_config.layer,
            viewport: slot_config.viewport,
            volume_linked: slot_config.volume_linked,
            extra_args: extra_args.to_vec(),
            query_timeout: config.query_timeout(),
            open_timeout: config.open_timeout(),
            quit_timeout: config.quit_timeout(),
        };
        Self {
            tick_period: config.tick_period(),
            debounce_ticks: config.gpio.debounce_ticks,
            countdown_load_attempts: config.countdown_load_attempts,
            slots: [
                slot(&config.slots.idle_first),
                slot(&config.slots.idle_second),
                slot(&config.slots.countdown),
            ],
        }
    }
}

/// Result of trying to stage a video into an idle slot
enum Staged {
    Into(IdleSlot),
    NoFreeSlot,
    LoadFailed,
}

/// Photo-booth state machine
///
/// Owns the slots, catalogs and inputs; nothing else mutates them. Driven
/// by [`Scheduler::run`] in production or by calling [`Scheduler::tick`]
/// directly.
pub struct Scheduler {
    phase: Phase,
    slots: [PlaybackSlot; SLOT_COUNT],
    backend: Box<dyn PlayerBackend>,
    sequences: Sequences,

    buzzer: Box<dyn DigitalInput>,
    exit_button: Box<dyn DigitalInput>,
    buzzer_debouncer: InputDebouncer,
    exit_debouncer: InputDebouncer,
    buzzer_armed: bool,

    /// Next slot to service, always `< SLOT_COUNT`
    service_cursor: usize,
    tick_period: Duration,
    countdown_load_attempts: u32,
    countdown_failures: u32,
    ticks: u64,

    error: Option<String>,
    exit_code: u8,
    finished: bool,
}

impl Scheduler {
    pub fn new(
        settings: SchedulerSettings,
        backend: Box<dyn PlayerBackend>,
        sequences: Sequences,
        hardware: Hardware,
    ) -> Self {
        let [idle_first, idle_second, countdown] = settings.slots;
        let mut countdown_slot = PlaybackSlot::new(COUNTDOWN, countdown);
        if let Some(trigger) = hardware.trigger {
            countdown_slot = countdown_slot.with_trigger(trigger);
        }

        Self {
            phase: Phase::SelectIdleVideo,
            slots: [
                PlaybackSlot::new(IDLE_FIRST, idle_first),
                PlaybackSlot::new(IDLE_SECOND, idle_second),
                countdown_slot,
            ],
            backend,
            sequences,
            buzzer: hardware.buzzer,
            exit_button: hardware.exit_button,
            buzzer_debouncer: InputDebouncer::new(settings.debounce_ticks),
            exit_debouncer: InputDebouncer::new(settings.debounce_ticks),
            buzzer_armed: true,
            service_cursor: 0,
            tick_period: settings.tick_period,
            countdown_load_attempts: settings.countdown_load_attempts.max(1),
            countdown_failures: 0,
            ticks: 0,
            error: None,
            exit_code: 0,
            finished: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn buzzer_armed(&self) -> bool {
        self.buzzer_armed
    }

    pub fn slot(&self, index: usize) -> &PlaybackSlot {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[PlaybackSlot] {
        &self.slots
    }

    /// 0 after a normal shutdown, 1 after a fatal error
    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    /// Message of the fatal error, if one occurred
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Exit state reached and every slot unloaded
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ask for a cooperative shutdown (same path as the exit button)
    pub fn request_exit(&mut self) {
        if !matches!(self.phase, Phase::Error | Phase::Exit) {
            self.phase = Phase::Exit;
        }
    }

    /// Run ticks until the Exit state completes; returns the exit code
    ///
    /// `shutdown` resolving requests an exit; the loop still finishes the
    /// Exit state so no player survives.
    pub async fn run<F>(&mut self, shutdown: F) -> u8
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let mut shutdown_requested = false;

        info!("Control loop started ({:?} tick)", self.tick_period);
        while !self.finished {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = &mut shutdown, if !shutdown_requested => {
                    shutdown_requested = true;
                    info!("Shutdown requested");
                    self.request_exit();
                }
            }
        }
        info!("Control loop finished after {} ticks (exit code {})", self.ticks, self.exit_code);
        self.exit_code
    }

    /// One control-loop iteration
    pub async fn tick(&mut self) {
        if self.finished {
            return;
        }
        self.ticks += 1;
        let phase_before = self.phase;

        let cursor = self.service_cursor;
        self.slots[cursor].service().await;
        self.service_cursor = (cursor + 1) % SLOT_COUNT;

        if !self.buzzer_armed
            && *self.slots[COUNTDOWN].status() == SlotStatus::Absent
            && !self.phase.is_countdown()
        {
            self.buzzer_armed = true;
            debug!(target: GPIO, "Buzzer re-armed");
        }

        let forced = self.sample_inputs();
        if !forced {
            self.step().await;
        }

        if self.phase != phase_before {
            info!("State {} -> {}", phase_before, self.phase);
        } else {
            trace!("State {} (tick {})", self.phase, self.ticks);
        }
    }

    /// Sample both buttons; returns whether a press forced the phase
    fn sample_inputs(&mut self) -> bool {
        let mut forced = false;

        if self.buzzer_armed && self.phase.is_idle_side() {
            let level = self.buzzer.is_pressed();
            if self.buzzer_debouncer.sample(level) {
                debug!(target: GPIO, "Buzzer pressed (debounced)");
                self.buzzer_armed = false;
                self.countdown_failures = 0;
                self.phase = Phase::SelectCountdownVideo;
                forced = true;
            }
        }

        let level = self.exit_button.is_pressed();
        if self.exit_debouncer.sample(level) {
            debug!(target: GPIO, "Exit button pressed (debounced)");
            if !matches!(self.phase, Phase::Error | Phase::Exit) {
                self.phase = Phase::Exit;
                forced = true;
            }
        }

        forced
    }

    async fn step(&mut self) {
        match self.phase {
            Phase::SelectIdleVideo => self.select_idle_side(Category::Idle).await,
            Phase::SelectApplauseVideo => self.select_idle_side(Category::Applause).await,
            Phase::StartIdle(slot) => self.start_idle(slot),
            Phase::PlayIdle(slot) => self.play_idle(slot).await,
            Phase::SelectCountdownVideo => self.select_countdown().await,
            Phase::StartCountdownVideo => self.start_countdown(),
            Phase::PlayCountdownVideo => self.play_countdown().await,
            Phase::WaitCountdown(stage) => self.wait_countdown(stage).await,
            Phase::Error => {
                error!("{}", self.error.as_deref().unwrap_or("unknown error"));
                self.exit_code = 1;
                self.phase = Phase::Exit;
            }
            Phase::Exit => self.exit().await,
        }
    }

    fn fail(&mut self, err: Error) {
        self.error = Some(err.to_string());
        self.phase = Phase::Error;
    }

    /// First idle slot that can take a new video
    fn free_idle_slot(&self) -> Option<IdleSlot> {
        [IdleSlot::First, IdleSlot::Second]
            .into_iter()
            .find(|slot| self.slots[slot.index()].is_reusable())
    }

    /// Load the next video of `category` into a free idle slot
    async fn stage_idle_side(&mut self, category: Category) -> Result<Staged> {
        let Some(slot) = self.free_idle_slot() else {
            return Ok(Staged::NoFreeSlot);
        };

        let sequence = self.sequences.get_mut(category);
        let selection = sequence.catalog.select()?;
        let fade = sequence.fade;

        let target = &mut self.slots[slot.index()];
        if target.has_session() {
            target.unload().await;
        }
        match target.load(self.backend.as_ref(), &selection.reference, fade).await {
            Ok(()) => {
                info!(
                    "Slot {}: staged {} video [{}] {}",
                    slot.index(),
                    category,
                    selection.index,
                    selection.reference.display()
                );
                Ok(Staged::Into(slot))
            }
            Err(e) => {
                warn!(
                    "Slot {}: cannot load {}: {}",
                    slot.index(),
                    selection.reference.display(),
                    e
                );
                Ok(Staged::LoadFailed)
            }
        }
    }

    async fn select_idle_side(&mut self, category: Category) {
        // A buzzer press can leave a staged slot behind; start it first
        if let Some(staged) = [IdleSlot::First, IdleSlot::Second]
            .into_iter()
            .find(|slot| *self.slots[slot.index()].status() == SlotStatus::Paused)
        {
            self.phase = Phase::StartIdle(staged);
            return;
        }

        match self.stage_idle_side(category).await {
            Ok(Staged::Into(slot)) => self.phase = Phase::StartIdle(slot),
            Ok(Staged::NoFreeSlot) | Ok(Staged::LoadFailed) => {}
            Err(e) => self.fail(e),
        }
    }

    /// Start the staged slot once its partner is about to fade out
    fn start_idle(&mut self, waiting: IdleSlot) {
        if *self.slots[waiting.index()].status() != SlotStatus::Paused {
            debug!("Slot {} no longer staged", waiting.index());
            self.phase = Phase::SelectIdleVideo;
            return;
        }

        let running = &self.slots[waiting.other().index()];
        let margin = START_MARGIN_TICKS * self.tick_period.as_secs_f64();
        let ready = !running.status().is_running()
            || running
                .remaining()
                .is_some_and(|remaining| remaining <= running.fade().fade_out_time + margin);

        if ready {
            self.phase = Phase::PlayIdle(waiting);
        }
    }

    async fn play_idle(&mut self, slot: IdleSlot) {
        let target = &mut self.slots[slot.index()];
        if target.has_session() && !target.start().await {
            warn!("Slot {}: start failed", slot.index());
        }
        self.phase = Phase::SelectIdleVideo;
    }

    async fn select_countdown(&mut self) {
        // Wait for a running crossfade to finish
        if self.slots.iter().any(PlaybackSlot::is_mid_fade) {
            return;
        }

        let sequence = &mut self.sequences.countdown;
        let fade = sequence.fade;
        let selection = match sequence.catalog.select() {
            Ok(selection) => selection,
            Err(e) => return self.fail(e),
        };

        let slot = &mut self.slots[COUNTDOWN];
        if slot.has_session() && slot.is_reusable() {
            slot.unload().await;
        }
        match slot.load(self.backend.as_ref(), &selection.reference, fade).await {
            Ok(()) => {
                info!(
                    "Slot {}: staged countdown video [{}] {}",
                    COUNTDOWN,
                    selection.index,
                    selection.reference.display()
                );
                self.countdown_failures = 0;
                self.phase = Phase::StartCountdownVideo;
            }
            Err(e) => {
                self.countdown_failures += 1;
                warn!(
                    "Cannot load countdown {} (attempt {}/{}): {}",
                    selection.reference.display(),
                    self.countdown_failures,
                    self.countdown_load_attempts,
                    e
                );
                if self.countdown_failures >= self.countdown_load_attempts {
                    warn!("Countdown abandoned");
                    self.countdown_failures = 0;
                    self.phase = Phase::SelectIdleVideo;
                }
            }
        }
    }

    /// Fade the idle slots out under the countdown's fade-in
    fn start_countdown(&mut self) {
        let fade_out_time = self.slots[COUNTDOWN].fade().fade_out_time;
        let tick = self.tick_period;
        for slot in &mut self.slots[IDLE_FIRST..=IDLE_SECOND] {
            if slot.status().is_running() {
                slot.begin_early_fade_out(fade_out_time, tick);
            }
        }
        self.phase = Phase::PlayCountdownVideo;
    }

    async fn play_countdown(&mut self) {
        let slot = &mut self.slots[COUNTDOWN];
        if !slot.status().is_running() {
            warn!("Countdown session lost before start ({})", slot.status());
            slot.unload().await;
            self.phase = Phase::SelectCountdownVideo;
            return;
        }
        if !slot.start().await {
            warn!("Slot {}: countdown start failed", COUNTDOWN);
        }
        self.phase = Phase::WaitCountdown(CountdownStage::First);
    }

    async fn wait_countdown(&mut self, stage: CountdownStage) {
        let countdown = &self.slots[COUNTDOWN];
        if !countdown.status().is_running() {
            return self.enter_applause(stage).await;
        }

        let mut stage = stage;
        if stage == CountdownStage::First && countdown.position() > countdown.fade().fade_in_time {
            self.release_idle_slots().await;
            stage = CountdownStage::Second;
            self.phase = Phase::WaitCountdown(stage);
        }

        let countdown = &self.slots[COUNTDOWN];
        if countdown
            .remaining()
            .is_some_and(|remaining| remaining <= countdown.fade().fade_out_time)
        {
            self.enter_applause(stage).await;
        }
    }

    async fn release_idle_slots(&mut self) {
        debug!("Releasing idle slots");
        for slot in &mut self.slots[IDLE_FIRST..=IDLE_SECOND] {
            slot.unload().await;
        }
    }

    /// Launch the applause video through the idle machinery
    async fn enter_applause(&mut self, stage: CountdownStage) {
        if stage == CountdownStage::First {
            self.release_idle_slots().await;
        }
        match self.stage_idle_side(Category::Applause).await {
            Ok(Staged::Into(slot)) => self.phase = Phase::StartIdle(slot),
            Ok(Staged::NoFreeSlot) | Ok(Staged::LoadFailed) => {
                self.phase = Phase::SelectApplauseVideo
            }
            Err(e) => self.fail(e),
        }
    }

    async fn exit(&mut self) {
        let mut unloaded = 0;
        for slot in &mut self.slots {
            if slot.unload().await {
                unloaded += 1;
            }
        }
        info!("Exit: {} player(s) unloaded", unloaded);
        self.finished = true;
    }
}
