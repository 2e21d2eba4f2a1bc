//! Digital I/O: pushbutton inputs and the camera trigger output
//!
//! Inputs are polled once per tick (no interrupts) and filtered by an
//! [`InputDebouncer`].

pub mod debounce;

#[cfg(target_os = "linux")]
pub mod cdev;

pub use debounce::InputDebouncer;

/// Log target for button and trigger line activity (verbosity 3)
pub const LOG_TARGET: &str = "photomat_ctl::gpio";

/// Polled digital input (pushbutton)
pub trait DigitalInput: Send {
    /// Current level, `true` while the button is held
    fn is_pressed(&mut self) -> bool;
}

/// Digital output (camera trigger line)
pub trait DigitalOutput: Send {
    fn on(&mut self);
    fn off(&mut self);
    fn is_lit(&self) -> bool;
}
