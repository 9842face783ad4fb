//! Scheduler task wrapping one step-response controller.

use std::io::Write;

use tracing::{info, warn};

use crate::controller::StepResponse;
use crate::error::{KitError, Result};
use crate::gain_input::{GainPoll, GainReceiver};
use crate::runner::Task;
use crate::status::{Phase, TickStatus};
use crate::stream::END_MARKER;

/// Writes the controller's sample stream to `sink`, one protocol line per
/// emitted sample and `end` after each run, flushed every tick.
pub struct StepResponseTask<W> {
    controller: StepResponse,
    sink: W,
    gains: Option<GainReceiver>,
    gains_closed: bool,
    max_runs: Option<u32>,
}

impl<W: Write> StepResponseTask<W> {
    pub fn new(controller: StepResponse, sink: W) -> Self {
        Self {
            controller,
            sink,
            gains: None,
            gains_closed: false,
            max_runs: None,
        }
    }

    /// Finish after this many completed runs.
    pub fn with_max_runs(mut self, runs: u32) -> Self {
        self.max_runs = Some(runs);
        self
    }

    /// Take new gains from `gains` whenever the controller is waiting.
    pub fn with_gains(mut self, gains: GainReceiver) -> Self {
        self.gains = Some(gains);
        self
    }

    pub fn controller(&self) -> &StepResponse {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut StepResponse {
        &mut self.controller
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    fn poll_gain(&mut self) -> Result<()> {
        let Some(gains) = &self.gains else {
            return Ok(());
        };
        match gains.poll() {
            GainPoll::Gain(gain) => self.controller.arm(gain),
            GainPoll::Empty => Ok(()),
            GainPoll::Closed => {
                if !self.gains_closed {
                    info!(motor = self.controller.name(), "gain input closed");
                }
                self.gains_closed = true;
                Ok(())
            }
        }
    }

    fn write_line(&mut self, line: &dyn core::fmt::Display) -> Result<()> {
        writeln!(self.sink, "{line}")
            .and_then(|()| self.sink.flush())
            .map_err(|e| eyre::Report::new(KitError::Io(e.to_string())))
    }
}

impl<W: Write> Task for StepResponseTask<W> {
    fn name(&self) -> &str {
        self.controller.name()
    }

    fn run_once(&mut self) -> Result<()> {
        if self.controller.phase() == Phase::Waiting {
            self.poll_gain()?;
        }
        match self.controller.step()? {
            TickStatus::Emitted(record) => self.write_line(&record),
            TickStatus::Finished => self.write_line(&END_MARKER),
            _ => Ok(()),
        }
    }

    fn is_finished(&self) -> bool {
        if self
            .max_runs
            .is_some_and(|max| self.controller.completed_runs() >= max)
        {
            return true;
        }
        self.controller.phase() == Phase::Waiting && (self.gains.is_none() || self.gains_closed)
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Err(e) = self.sink.flush() {
            warn!(motor = self.controller.name(), error = %e, "flushing sample stream failed");
        }
        self.controller.motor_stop()
    }
}
