//! Type-state builder for `StepResponse`.
//!
//! The encoder counter, both motor channels, and the step (gain and
//! setpoint) must be supplied before `build()` is available. `try_build()`
//! is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use motorlab_traits::{Clock, MonotonicClock, PwmChannel, QuadratureCounter};

use crate::config::{ControllerCfg, Rearm, SettlePolicy, gain_is_valid};
use crate::controller::{BoxedChannel, BoxedCounter, StepResponse};
use crate::encoder::{DEFAULT_PERIOD, PositionAccumulator};
use crate::error::{BuildError, Result};
use crate::motor::MotorDriver;
use crate::status::Phase;

pub struct Missing;
pub struct Set;

pub struct StepResponseBuilder<E, M, T> {
    name: Option<String>,
    counter: Option<BoxedCounter>,
    channels: Option<(BoxedChannel, BoxedChannel)>,
    encoder_period: u16,
    step: Option<(f32, i32)>,
    settle_policy: SettlePolicy,
    rearm: Rearm,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _e: PhantomData<E>,
    _m: PhantomData<M>,
    _t: PhantomData<T>,
}

impl Default for StepResponseBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            name: None,
            counter: None,
            channels: None,
            encoder_period: DEFAULT_PERIOD,
            step: None,
            settle_policy: SettlePolicy::default(),
            rearm: Rearm::default(),
            clock: None,
            _e: PhantomData,
            _m: PhantomData,
            _t: PhantomData,
        }
    }
}

impl StepResponse {
    pub fn builder() -> StepResponseBuilder<Missing, Missing, Missing> {
        StepResponseBuilder::default()
    }
}

impl<E, M, T> StepResponseBuilder<E, M, T> {
    /// Name used in logs and scheduler reports. Defaults to "motor".
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Largest value of the counter register (default 65535).
    pub fn with_encoder_period(mut self, period: u16) -> Self {
        self.encoder_period = period;
        self
    }

    pub fn with_settle_policy(mut self, policy: SettlePolicy) -> Self {
        self.settle_policy = policy;
        self
    }

    pub fn with_rearm(mut self, rearm: Rearm) -> Self {
        self.rearm = rearm;
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    fn retag<E2, M2, T2>(self) -> StepResponseBuilder<E2, M2, T2> {
        StepResponseBuilder {
            name: self.name,
            counter: self.counter,
            channels: self.channels,
            encoder_period: self.encoder_period,
            step: self.step,
            settle_policy: self.settle_policy,
            rearm: self.rearm,
            clock: self.clock,
            _e: PhantomData,
            _m: PhantomData,
            _t: PhantomData,
        }
    }

    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<StepResponse> {
        let counter = self
            .counter
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoder))?;
        let (channel_a, channel_b) = self
            .channels
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let (gain, setpoint) = self
            .step
            .ok_or_else(|| eyre::Report::new(BuildError::MissingGain))?;

        if !gain_is_valid(gain) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "gain must be finite and >= 0",
            )));
        }
        if self.encoder_period < 3 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "encoder period must be >= 3",
            )));
        }

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => Arc::from(c),
            None => Arc::new(MonotonicClock::new()),
        };
        let emit_epoch = clock.now();

        Ok(StepResponse {
            name: self.name.unwrap_or_else(|| "motor".to_string()),
            encoder: PositionAccumulator::with_period(counter, self.encoder_period),
            motor: MotorDriver::new(channel_a, channel_b),
            cfg: ControllerCfg {
                gain,
                setpoint,
                settle_policy: self.settle_policy,
                rearm: self.rearm,
            },
            clock,
            phase: Phase::Ready,
            buffer: Vec::new(),
            settle_ticks: 0,
            emit_index: 0,
            emit_epoch,
            completed_runs: 0,
            last_output: None,
        })
    }
}

// Setters that advance type-state
impl<M, T> StepResponseBuilder<Missing, M, T> {
    pub fn with_counter(
        mut self,
        counter: impl QuadratureCounter + 'static,
    ) -> StepResponseBuilder<Set, M, T> {
        self.counter = Some(Box::new(counter));
        self.retag()
    }
}

impl<E, T> StepResponseBuilder<E, Missing, T> {
    /// Channel A drives forward (positive levels), channel B reverse.
    pub fn with_channels(
        mut self,
        channel_a: impl PwmChannel + 'static,
        channel_b: impl PwmChannel + 'static,
    ) -> StepResponseBuilder<E, Set, T> {
        self.channels = Some((Box::new(channel_a), Box::new(channel_b)));
        self.retag()
    }
}

impl<E, M> StepResponseBuilder<E, M, Missing> {
    pub fn with_step(mut self, gain: f32, setpoint: i32) -> StepResponseBuilder<E, M, Set> {
        self.step = Some((gain, setpoint));
        self.retag()
    }

    /// Gain, setpoint and both policies in one go.
    pub fn with_config(mut self, cfg: ControllerCfg) -> StepResponseBuilder<E, M, Set> {
        self.step = Some((cfg.gain, cfg.setpoint));
        self.settle_policy = cfg.settle_policy;
        self.rearm = cfg.rearm;
        self.retag()
    }
}

impl StepResponseBuilder<Set, Set, Set> {
    /// Validate and build. Only available when counter, channels and step are set.
    pub fn build(self) -> Result<StepResponse> {
        self.try_build()
    }
}
