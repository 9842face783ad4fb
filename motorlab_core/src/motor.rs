//! Signed effort level to an H-bridge input pair.
//!
//! Positive levels drive input A and hold B low; negative levels do the
//! reverse. Magnitudes above 100 are clamped.

use eyre::WrapErr;
use motorlab_traits::PwmChannel;
use tracing::{trace, warn};

use crate::error::{KitError, Result};
use crate::hw_error::map_hw_error;

pub const MAX_DUTY: f32 = 100.0;

/// Duty pair written to the bridge inputs, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DutyPair {
    pub a: f32,
    pub b: f32,
}

impl DutyPair {
    /// Map a signed level onto the bridge. `None` for NaN or infinity.
    pub fn for_level(level: f32) -> Option<Self> {
        if !level.is_finite() {
            return None;
        }
        let magnitude = level.abs().min(MAX_DUTY);
        Some(if level < 0.0 {
            Self {
                a: 0.0,
                b: magnitude,
            }
        } else {
            Self {
                a: magnitude,
                b: 0.0,
            }
        })
    }
}

pub struct MotorDriver<P> {
    channel_a: P,
    channel_b: P,
    last: DutyPair,
}

impl<P: PwmChannel> MotorDriver<P> {
    pub fn new(channel_a: P, channel_b: P) -> Self {
        Self {
            channel_a,
            channel_b,
            last: DutyPair::default(),
        }
    }

    /// Drive the motor at `level` percent, sign selecting direction.
    ///
    /// On a non-finite level or a channel failure both inputs are zeroed
    /// (best effort) and the error is returned.
    pub fn apply(&mut self, level: f32) -> Result<DutyPair> {
        let Some(duty) = DutyPair::for_level(level) else {
            warn!(level, "non-finite duty level; stopping motor");
            self.zero_best_effort();
            return Err(eyre::Report::new(KitError::InvalidLevel(level)));
        };
        if let Err(e) = self.write(duty) {
            self.zero_best_effort();
            return Err(e);
        }
        trace!(level, a = duty.a, b = duty.b, "duty applied");
        Ok(duty)
    }

    /// Both inputs to zero; the motor coasts.
    pub fn stop(&mut self) -> Result<()> {
        self.write(DutyPair::default())
    }

    /// Last pair successfully written to both channels.
    pub fn last(&self) -> DutyPair {
        self.last
    }

    fn write(&mut self, duty: DutyPair) -> Result<()> {
        // Release the input going to zero first so the two are never both driven.
        if duty.a == 0.0 {
            Self::set(&mut self.channel_a, 0.0, "A")?;
            Self::set(&mut self.channel_b, duty.b, "B")?;
        } else {
            Self::set(&mut self.channel_b, 0.0, "B")?;
            Self::set(&mut self.channel_a, duty.a, "A")?;
        }
        self.last = duty;
        Ok(())
    }

    fn set(channel: &mut P, percent: f32, label: &'static str) -> Result<()> {
        channel
            .set_duty_percent(percent)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("setting channel {label} duty"))
    }

    fn zero_best_effort(&mut self) {
        let a = self.channel_a.set_duty_percent(0.0);
        let b = self.channel_b.set_duty_percent(0.0);
        if a.is_ok() && b.is_ok() {
            self.last = DutyPair::default();
        } else {
            warn!("could not zero both motor channels");
        }
    }
}
