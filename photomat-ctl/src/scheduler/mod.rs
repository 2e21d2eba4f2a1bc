//! Booth scheduler: idle loop, countdown and applause

pub mod machine;
pub mod phase;

pub use machine::{
    Hardware, Scheduler, SchedulerSettings, Sequence, Sequences, COUNTDOWN, IDLE_FIRST,
    IDLE_SECOND, SLOT_COUNT,
};
pub use phase::{CountdownStage, IdleSlot, Phase};
