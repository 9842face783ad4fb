//! Step-response controller.
//!
//! One controller owns an encoder accumulator and a motor driver and runs a
//! repeating cycle, one phase transition at most per `step()`:
//!
//! - `Ready`: drive from an assumed position of zero and record it.
//! - `Capturing`: proportional control, recording every position, until
//!   |output| <= `SETTLE_THRESHOLD`.
//! - `Settling`: `SETTLE_TICKS` more samples.
//! - `Emitting`: one recorded sample per tick with elapsed milliseconds.
//! - `Done`: the end marker, then either `Ready` again or `Waiting`.
//!
//! `step()` never sleeps; the caller decides the tick rate.

use std::sync::Arc;
use std::time::Instant;

use motorlab_traits::{Clock, PwmChannel, QuadratureCounter};
use tracing::{debug, info, warn};

use crate::config::{
    ControllerCfg, Rearm, SETTLE_THRESHOLD, SETTLE_TICKS, SettlePolicy, gain_is_valid,
};
use crate::encoder::PositionAccumulator;
use crate::error::{KitError, Result};
use crate::motor::MotorDriver;
use crate::status::{Phase, TickStatus};
use crate::stream::Record;

pub type BoxedCounter = Box<dyn QuadratureCounter>;
pub type BoxedChannel = Box<dyn PwmChannel>;

pub struct StepResponse {
    pub(crate) name: String,
    pub(crate) encoder: PositionAccumulator<BoxedCounter>,
    pub(crate) motor: MotorDriver<BoxedChannel>,
    pub(crate) cfg: ControllerCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) phase: Phase,
    pub(crate) buffer: Vec<i32>,
    pub(crate) settle_ticks: u32,
    pub(crate) emit_index: usize,
    pub(crate) emit_epoch: Instant,
    pub(crate) completed_runs: u32,
    pub(crate) last_output: Option<f32>,
}

impl core::fmt::Debug for StepResponse {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StepResponse")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("gain", &self.cfg.gain)
            .field("setpoint", &self.cfg.setpoint)
            .field("buffered", &self.buffer.len())
            .field("completed_runs", &self.completed_runs)
            .finish_non_exhaustive()
    }
}

impl StepResponse {
    /// Advance the controller by one tick.
    ///
    /// An encoder read failure is returned with the phase unchanged and
    /// nothing recorded. Motor write failures are logged; the driver has
    /// already zeroed the outputs.
    pub fn step(&mut self) -> Result<TickStatus> {
        match self.phase {
            Phase::Waiting => Ok(TickStatus::Waiting),
            Phase::Ready => {
                // No reading yet: treat the start as position zero.
                let output = self.control_output(0);
                self.drive(output);
                self.buffer.push(0);
                self.phase = Phase::Capturing;
                info!(
                    motor = %self.name,
                    gain = self.cfg.gain,
                    setpoint = self.cfg.setpoint,
                    "step run started"
                );
                Ok(TickStatus::Captured {
                    position: 0,
                    output,
                })
            }
            Phase::Capturing => {
                let position = self.encoder.read()?;
                let output = self.control_output(position);
                self.drive(output);
                self.buffer.push(position);
                if output.abs() <= SETTLE_THRESHOLD {
                    self.phase = Phase::Settling;
                    debug!(motor = %self.name, position, output, "capture settled");
                }
                Ok(TickStatus::Captured { position, output })
            }
            Phase::Settling => {
                let position = self.encoder.read()?;
                if self.cfg.settle_policy == SettlePolicy::Track {
                    let output = self.control_output(position);
                    self.drive(output);
                }
                self.buffer.push(position);
                self.settle_ticks += 1;
                let tick = self.settle_ticks;
                if tick >= SETTLE_TICKS {
                    self.phase = Phase::Emitting;
                    self.emit_epoch = self.clock.now();
                    debug!(motor = %self.name, samples = self.buffer.len(), "emitting");
                }
                Ok(TickStatus::Settling { position, tick })
            }
            Phase::Emitting => match self.buffer.get(self.emit_index) {
                Some(&position) => {
                    self.emit_index += 1;
                    Ok(TickStatus::Emitted(Record {
                        elapsed_ms: self.clock.ms_since(self.emit_epoch),
                        position,
                    }))
                }
                None => {
                    self.phase = Phase::Done;
                    Ok(TickStatus::Drained)
                }
            },
            Phase::Done => {
                self.buffer.clear();
                self.encoder.zero();
                self.settle_ticks = 0;
                self.emit_index = 0;
                self.completed_runs = self.completed_runs.saturating_add(1);
                self.phase = match self.cfg.rearm {
                    Rearm::Continuous => Phase::Ready,
                    Rearm::AwaitGain => {
                        self.stop_best_effort();
                        Phase::Waiting
                    }
                };
                info!(
                    motor = %self.name,
                    runs = self.completed_runs,
                    next = ?self.phase,
                    "step run finished"
                );
                Ok(TickStatus::Finished)
            }
        }
    }

    /// Set a new gain and start a run on the next tick.
    ///
    /// Only allowed between runs (`Ready` or `Waiting`).
    pub fn arm(&mut self, gain: f32) -> Result<()> {
        if !gain_is_valid(gain) {
            return Err(eyre::Report::new(KitError::Config(format!(
                "gain must be finite and >= 0, got {gain}"
            ))));
        }
        match self.phase {
            Phase::Ready | Phase::Waiting => {
                self.cfg.gain = gain;
                self.phase = Phase::Ready;
                info!(motor = %self.name, gain, "armed");
                Ok(())
            }
            other => Err(eyre::Report::new(KitError::State(format!(
                "cannot change gain while {other:?}"
            )))),
        }
    }

    /// Stop the motor and wait for `arm` before the next run.
    pub fn park(&mut self) -> Result<()> {
        match self.phase {
            Phase::Ready | Phase::Waiting => {
                self.phase = Phase::Waiting;
                self.motor_stop()
            }
            other => Err(eyre::Report::new(KitError::State(format!(
                "cannot park while {other:?}"
            )))),
        }
    }

    pub fn motor_stop(&mut self) -> Result<()> {
        self.motor.stop()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn gain(&self) -> f32 {
        self.cfg.gain
    }

    pub fn setpoint(&self) -> i32 {
        self.cfg.setpoint
    }

    pub fn config(&self) -> &ControllerCfg {
        &self.cfg
    }

    pub fn completed_runs(&self) -> u32 {
        self.completed_runs
    }

    /// Samples recorded for the current run.
    pub fn buffered(&self) -> &[i32] {
        &self.buffer
    }

    /// Last control output computed, if any.
    pub fn last_output(&self) -> Option<f32> {
        self.last_output
    }

    /// Accumulated encoder position without reading the hardware.
    pub fn position(&self) -> i32 {
        self.encoder.position()
    }

    fn control_output(&mut self, position: i32) -> f32 {
        let error = i64::from(self.cfg.setpoint) - i64::from(position);
        let output = self.cfg.gain * error as f32;
        self.last_output = Some(output);
        output
    }

    fn drive(&mut self, output: f32) {
        if let Err(e) = self.motor.apply(output) {
            warn!(motor = %self.name, output, error = %e, "motor command failed");
        }
    }

    fn stop_best_effort(&mut self) {
        if let Err(e) = self.motor.stop() {
            warn!(motor = %self.name, error = %e, "motor stop failed");
        }
    }
}
