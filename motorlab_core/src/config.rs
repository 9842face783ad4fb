//! Runtime configuration for a step-response controller.

/// What the controller does during the settle window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Sample only; the motor keeps the last command from the capture phase.
    #[default]
    Hold,
    /// Sample and keep applying the control law.
    Track,
}

/// What happens after a run's `end` marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rearm {
    #[default]
    Continuous,
    /// Stop the motor and wait for `arm`.
    AwaitGain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerCfg {
    /// Percent duty per count of error.
    pub gain: f32,
    /// Step target in encoder counts.
    pub setpoint: i32,
    pub settle_policy: SettlePolicy,
    pub rearm: Rearm,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            gain: 0.07,
            setpoint: 6900,
            settle_policy: SettlePolicy::default(),
            rearm: Rearm::default(),
        }
    }
}

/// |output| at or below this ends the capture phase.
pub const SETTLE_THRESHOLD: f32 = 10.0;

/// Samples taken after the capture phase before emitting.
pub const SETTLE_TICKS: u32 = 10;

/// Gains must be finite and non-negative.
pub fn gain_is_valid(gain: f32) -> bool {
    gain.is_finite() && gain >= 0.0
}
