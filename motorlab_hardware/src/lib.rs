pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod pi;

use std::cell::RefCell;
use std::rc::Rc;

use motorlab_traits::{HwResult, PwmChannel, QuadratureCounter};

use crate::error::HwError;

/// Parameters of the simulated DC motor + encoder plant.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Encoder counts travelled per tick at 100% duty, once up to speed.
    pub counts_per_tick_full: f32,
    /// Fraction of the gap to the commanded speed closed each tick (0, 1].
    pub response: f32,
    /// Net duty (percent) below which static friction holds the rotor still.
    pub deadband_percent: f32,
    /// Counter period; the register takes `period + 1` distinct values.
    pub period: u16,
    /// Raw counter value at power-on.
    pub start_count: u16,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            counts_per_tick_full: 400.0,
            response: 0.5,
            deadband_percent: 2.0,
            period: u16::MAX,
            start_count: 0,
        }
    }
}

#[derive(Debug, Default)]
struct PlantState {
    duty_a: f32,
    duty_b: f32,
    velocity: f32,
    position: f64,
}

/// Which half of the H-bridge input pair a simulated channel drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

/// Simulated PWM channel feeding the shared plant.
pub struct SimulatedPwm {
    plant: Rc<RefCell<PlantState>>,
    side: Side,
}

impl PwmChannel for SimulatedPwm {
    fn set_duty_percent(&mut self, percent: f32) -> HwResult<()> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Box::new(HwError::DutyOutOfRange(percent)));
        }
        let mut plant = self.plant.borrow_mut();
        match self.side {
            Side::A => plant.duty_a = percent,
            Side::B => plant.duty_b = percent,
        }
        Ok(())
    }
}

/// Simulated quadrature counter. Every read advances the plant by one tick.
pub struct SimulatedEncoder {
    plant: Rc<RefCell<PlantState>>,
    params: SimParams,
}

impl SimulatedEncoder {
    fn advance(&self) -> f64 {
        let mut plant = self.plant.borrow_mut();
        let net = plant.duty_a - plant.duty_b;
        let drive = if net.abs() < self.params.deadband_percent {
            0.0
        } else {
            net
        };
        let target = drive / 100.0 * self.params.counts_per_tick_full;
        let response = self.params.response.clamp(f32::EPSILON, 1.0);
        plant.velocity += (target - plant.velocity) * response;
        plant.position += f64::from(plant.velocity);
        plant.position
    }
}

impl QuadratureCounter for SimulatedEncoder {
    fn count(&mut self) -> HwResult<u16> {
        let position = self.advance();
        let modulus = i64::from(self.params.period) + 1;
        let raw = (position.round() as i64 + i64::from(self.params.start_count)).rem_euclid(modulus);
        tracing::trace!(position, raw, "simulated encoder read");
        // rem_euclid keeps raw in [0, period], which always fits u16
        Ok(raw as u16)
    }
}

/// A simulated motor with its encoder: one counter and the two bridge inputs.
pub struct SimulatedKit {
    pub encoder: SimulatedEncoder,
    pub channel_a: SimulatedPwm,
    pub channel_b: SimulatedPwm,
    probe: SimulatedProbe,
}

impl SimulatedKit {
    pub fn new(params: SimParams) -> Self {
        let plant = Rc::new(RefCell::new(PlantState::default()));
        SimulatedKit {
            encoder: SimulatedEncoder {
                plant: plant.clone(),
                params,
            },
            channel_a: SimulatedPwm {
                plant: plant.clone(),
                side: Side::A,
            },
            channel_b: SimulatedPwm {
                plant: plant.clone(),
                side: Side::B,
            },
            probe: SimulatedProbe { plant },
        }
    }

    /// A handle for observing the plant after the parts have been moved out.
    pub fn probe(&self) -> SimulatedProbe {
        self.probe.clone()
    }
}

/// Read-only view of the simulated plant, for tests and diagnostics.
#[derive(Clone)]
pub struct SimulatedProbe {
    plant: Rc<RefCell<PlantState>>,
}

impl SimulatedProbe {
    /// Unwrapped shaft position in counts since power-on.
    pub fn position(&self) -> f64 {
        self.plant.borrow().position
    }

    /// Current (channel A, channel B) duty percentages.
    pub fn duties(&self) -> (f32, f32) {
        let plant = self.plant.borrow();
        (plant.duty_a, plant.duty_b)
    }
}
