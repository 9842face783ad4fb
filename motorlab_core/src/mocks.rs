//! Test and helper mocks for motorlab_core

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use motorlab_traits::{HwResult, PwmChannel, QuadratureCounter};

/// Counter that replays a fixed sequence of raw counts, then repeats the
/// last one. An empty sequence reads as a counter stuck at zero.
#[derive(Debug, Clone)]
pub struct SeqCounter {
    seq: Vec<u16>,
    idx: usize,
}

impl SeqCounter {
    pub fn new(seq: Vec<u16>) -> Self {
        Self { seq, idx: 0 }
    }
}

impl QuadratureCounter for SeqCounter {
    fn count(&mut self) -> HwResult<u16> {
        let value = match self.seq.get(self.idx) {
            Some(v) => *v,
            None => self.seq.last().copied().unwrap_or(0),
        };
        self.idx = self.idx.saturating_add(1);
        Ok(value)
    }
}

/// Counter whose raw value is set from outside through a shared handle.
#[derive(Debug, Clone, Default)]
pub struct SharedCounter {
    raw: Rc<Cell<u16>>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for moving the counter while the controller owns it.
    pub fn handle(&self) -> Rc<Cell<u16>> {
        Rc::clone(&self.raw)
    }
}

impl QuadratureCounter for SharedCounter {
    fn count(&mut self) -> HwResult<u16> {
        Ok(self.raw.get())
    }
}

/// Counter that always fails.
pub struct FailingCounter;

impl QuadratureCounter for FailingCounter {
    fn count(&mut self) -> HwResult<u16> {
        Err(Box::new(std::io::Error::other("encoder unplugged")))
    }
}

/// PWM channel recording every duty written to it.
#[derive(Debug, Clone, Default)]
pub struct SpyChannel {
    log: Rc<RefCell<Vec<f32>>>,
}

impl SpyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Rc<RefCell<Vec<f32>>> {
        Rc::clone(&self.log)
    }
}

impl PwmChannel for SpyChannel {
    fn set_duty_percent(&mut self, percent: f32) -> HwResult<()> {
        self.log.borrow_mut().push(percent);
        Ok(())
    }
}

/// PWM channel that rejects every write.
pub struct FailingChannel;

impl PwmChannel for FailingChannel {
    fn set_duty_percent(&mut self, _percent: f32) -> HwResult<()> {
        Err(Box::new(std::io::Error::other("pwm unavailable")))
    }
}
