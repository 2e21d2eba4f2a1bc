//! GPIO character-device lines via `gpio-cdev`
//!
//! Buttons pull their pin to ground when pressed, so inputs are requested
//! active-low. The lines need a pull-up (external resistor or device tree
//! overlay); the character-device ABI used here cannot configure one.

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use photomat_common::config::GpioConfig;
use tracing::{debug, warn};

use super::{DigitalInput, DigitalOutput};
use crate::error::GpioError;

/// Active-low pushbutton line
pub struct CdevInput {
    pin: u32,
    handle: LineHandle,
}

impl DigitalInput for CdevInput {
    fn is_pressed(&mut self) -> bool {
        match self.handle.get_value() {
            Ok(value) => value != 0,
            Err(e) => {
                warn!("Reading GPIO{} failed: {}", self.pin, e);
                false
            }
        }
    }
}

/// Push-pull output line, initialised low
pub struct CdevOutput {
    pin: u32,
    handle: LineHandle,
    lit: bool,
}

impl CdevOutput {
    fn write(&mut self, level: bool) {
        match self.handle.set_value(u8::from(level)) {
            Ok(()) => {
                self.lit = level;
                debug!("GPIO{} -> {}", self.pin, if level { "high" } else { "low" });
            }
            Err(e) => warn!("Writing GPIO{} failed: {}", self.pin, e),
        }
    }
}

impl DigitalOutput for CdevOutput {
    fn on(&mut self) {
        self.write(true);
    }

    fn off(&mut self) {
        self.write(false);
    }

    fn is_lit(&self) -> bool {
        self.lit
    }
}

/// All booth GPIO lines
pub struct GpioLines {
    pub buzzer: CdevInput,
    pub exit_button: CdevInput,
    pub trigger: CdevOutput,
}

/// Request the buzzer, exit and trigger lines from the configured chip
pub fn open_lines(config: &GpioConfig) -> Result<GpioLines, GpioError> {
    let mut chip = Chip::new(&config.chip)
        .map_err(|e| GpioError::Chip(format!("{}: {}", config.chip.display(), e)))?;

    let mut request = |pin: u32, flags: LineRequestFlags| -> Result<LineHandle, GpioError> {
        chip.get_line(pin)
            .and_then(|line| line.request(flags, 0, &config.consumer))
            .map_err(|e| GpioError::Line {
                pin,
                reason: e.to_string(),
            })
    };

    let input_flags = LineRequestFlags::INPUT | LineRequestFlags::ACTIVE_LOW;

    let buzzer = CdevInput {
        pin: config.buzzer_pin,
        handle: request(config.buzzer_pin, input_flags.clone())?,
    };
    let exit_button = CdevInput {
        pin: config.exit_pin,
        handle: request(config.exit_pin, input_flags)?,
    };
    let trigger = CdevOutput {
        pin: config.trigger_pin,
        handle: request(config.trigger_pin, LineRequestFlags::OUTPUT)?,
        lit: false,
    };

    Ok(GpioLines {
        buzzer,
        exit_button,
        trigger,
    })
}
