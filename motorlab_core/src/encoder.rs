//! Unbounded position from a wrapping 16-bit quadrature counter.
//!
//! The hardware counter runs `0..=period` and rolls over in both directions.
//! `PositionAccumulator` samples it, treats any jump of half a counter cycle
//! or more as a rollover, and folds the corrected delta into a signed total.
//! Sampling must happen often enough that the true motion between two reads
//! stays under half a cycle; faster motion is misread as a wrap the other way.

use eyre::WrapErr;
use motorlab_traits::QuadratureCounter;
use tracing::trace;

use crate::error::Result;
use crate::hw_error::map_hw_error;

/// Period of the lab timers. The counter takes all `period + 1` (65536)
/// values, so a rollover is corrected by `period + 1`, not `period`.
pub const DEFAULT_PERIOD: u16 = u16::MAX;

pub struct PositionAccumulator<C> {
    counter: C,
    period: u16,
    last_count: u16,
    accumulated: i32,
}

impl<C> core::fmt::Debug for PositionAccumulator<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PositionAccumulator")
            .field("period", &self.period)
            .field("last_count", &self.last_count)
            .field("accumulated", &self.accumulated)
            .finish_non_exhaustive()
    }
}

impl<C: QuadratureCounter> PositionAccumulator<C> {
    pub fn new(counter: C) -> Self {
        Self::with_period(counter, DEFAULT_PERIOD)
    }

    /// `period` is the largest value the counter register holds.
    pub fn with_period(counter: C, period: u16) -> Self {
        Self {
            counter,
            period,
            last_count: 0,
            accumulated: 0,
        }
    }

    /// Sample the counter and return the updated accumulated position.
    pub fn read(&mut self) -> Result<i32> {
        let raw = self
            .counter
            .count()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading encoder counter")?;
        Ok(self.update(raw))
    }

    /// Fold an externally sampled raw count into the position.
    pub fn update(&mut self, raw: u16) -> i32 {
        let modulus = i32::from(self.period) + 1;
        let half = modulus / 2;
        let mut delta = i32::from(raw) - i32::from(self.last_count);
        if delta >= half {
            delta -= modulus;
        } else if delta <= -half {
            delta += modulus;
        }
        self.accumulated = self.accumulated.saturating_add(delta);
        trace!(raw, delta, position = self.accumulated, "encoder update");
        self.last_count = raw;
        self.accumulated
    }

    /// Last accumulated position without touching the hardware.
    pub fn position(&self) -> i32 {
        self.accumulated
    }

    /// Last raw count seen.
    pub fn last_count(&self) -> u16 {
        self.last_count
    }

    pub fn period(&self) -> u16 {
        self.period
    }

    /// Make the current physical position read as zero.
    ///
    /// The last raw count is kept so the next delta is still measured
    /// from where the counter actually is.
    pub fn zero(&mut self) {
        self.accumulated = 0;
    }
}
