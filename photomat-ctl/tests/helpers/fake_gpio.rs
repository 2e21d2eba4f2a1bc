//! In-memory GPIO lines

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use photomat_ctl::gpio::{DigitalInput, DigitalOutput};

/// Button whose level is set by the test
#[derive(Clone, Default)]
pub struct FakeInput {
    pressed: Arc<AtomicBool>,
}

impl FakeInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::SeqCst);
    }
}

impl DigitalInput for FakeInput {
    fn is_pressed(&mut self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }
}

/// Output recording every level change
#[derive(Clone, Default)]
pub struct FakeOutput {
    state: Arc<Mutex<OutputLog>>,
}

#[derive(Debug, Default)]
struct OutputLog {
    lit: bool,
    edges: Vec<bool>,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels written, in order (`true` = switched on)
    pub fn edges(&self) -> Vec<bool> {
        self.state.lock().unwrap().edges.clone()
    }

    pub fn lit(&self) -> bool {
        self.state.lock().unwrap().lit
    }

    fn write(&self, level: bool) {
        let mut log = self.state.lock().unwrap();
        log.lit = level;
        log.edges.push(level);
    }
}

impl DigitalOutput for FakeOutput {
    fn on(&mut self) {
        self.write(true);
    }

    fn off(&mut self) {
        self.write(false);
    }

    fn is_lit(&self) -> bool {
        self.lit()
    }
}
