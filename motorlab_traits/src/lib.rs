pub mod clock;

pub use clock::{Clock, MonotonicClock, SimClock};

/// Error type crossing the hardware seams.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A free-running quadrature counter register (e.g. a timer in encoder mode).
///
/// The value wraps modulo the counter's period; software is expected to
/// unwrap it (see `motorlab_core::encoder::PositionAccumulator`).
pub trait QuadratureCounter {
    fn count(&mut self) -> HwResult<u16>;
}

/// One PWM output of an H-bridge input pair.
pub trait PwmChannel {
    /// Set the duty cycle as a percentage in `0.0..=100.0`.
    fn set_duty_percent(&mut self, percent: f32) -> HwResult<()>;
}

impl<T: QuadratureCounter + ?Sized> QuadratureCounter for Box<T> {
    fn count(&mut self) -> HwResult<u16> {
        (**self).count()
    }
}

impl<T: PwmChannel + ?Sized> PwmChannel for Box<T> {
    fn set_duty_percent(&mut self, percent: f32) -> HwResult<()> {
        (**self).set_duty_percent(percent)
    }
}
