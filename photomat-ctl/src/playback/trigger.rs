//! Camera trigger pulse timed against the end of a sequence

use photomat_common::config::TriggerConfig;

use crate::gpio::DigitalOutput;
use crate::{Error, Result};

/// Switch points, in seconds of remaining playback time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerOffsets {
    on_offset: f64,
    off_offset: f64,
}

/// Output transition requested for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    Rising,
    Falling,
}

impl TriggerOffsets {
    /// `off_offset` must be smaller than `on_offset`
    pub fn new(on_offset: f64, off_offset: f64) -> Result<Self> {
        if !(on_offset.is_finite() && off_offset.is_finite()) || off_offset >= on_offset {
            return Err(Error::Config(photomat_common::Error::InvalidInput(format!(
                "trigger off offset {} must be smaller than on offset {}",
                off_offset, on_offset
            ))));
        }
        Ok(Self {
            on_offset,
            off_offset,
        })
    }

    pub fn on_offset(&self) -> f64 {
        self.on_offset
    }

    pub fn off_offset(&self) -> f64 {
        self.off_offset
    }

    /// Edge to emit given the remaining time and current output state
    ///
    /// The off window is checked first: once inside it, no rising edge is
    /// considered, so a pulse can never both start and end on one tick.
    pub fn edge(&self, remaining: f64, lit: bool) -> Option<TriggerEdge> {
        if remaining <= self.off_offset {
            lit.then_some(TriggerEdge::Falling)
        } else if remaining <= self.on_offset {
            (!lit).then_some(TriggerEdge::Rising)
        } else {
            None
        }
    }
}

impl TryFrom<&TriggerConfig> for TriggerOffsets {
    type Error = Error;

    fn try_from(config: &TriggerConfig) -> Result<Self> {
        Self::new(config.on_offset, config.off_offset)
    }
}

/// Digital output driven by a slot's remaining playback time
pub struct TriggerBinding {
    output: Box<dyn DigitalOutput>,
    offsets: TriggerOffsets,
}

impl std::fmt::Debug for TriggerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerBinding")
            .field("offsets", &self.offsets)
            .field("lit", &self.output.is_lit())
            .finish()
    }
}

impl TriggerBinding {
    pub fn new(output: Box<dyn DigitalOutput>, offsets: TriggerOffsets) -> Self {
        Self { output, offsets }
    }

    pub fn offsets(&self) -> TriggerOffsets {
        self.offsets
    }

    pub fn is_lit(&self) -> bool {
        self.output.is_lit()
    }

    /// Evaluate the offsets and drive the output; returns the edge emitted
    pub fn update(&mut self, remaining: f64) -> Option<TriggerEdge> {
        let edge = self.offsets.edge(remaining, self.output.is_lit())?;
        match edge {
            TriggerEdge::Rising => self.output.on(),
            TriggerEdge::Falling => self.output.off(),
        }
        Some(edge)
    }

    /// Force the output off; returns whether it was lit
    pub fn retire(&mut self) -> bool {
        if self.output.is_lit() {
            self.output.off();
            true
        } else {
            false
        }
    }
}
