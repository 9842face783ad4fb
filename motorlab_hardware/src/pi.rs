//! Raspberry Pi backends: hardware PWM for the bridge inputs and a GPIO
//! interrupt quadrature decoder standing in for a timer in encoder mode.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU16, Ordering};

use motorlab_traits::{HwResult, PwmChannel, QuadratureCounter};
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use rppal::pwm::{Channel, Polarity, Pwm};
use tracing::{debug, info};

use crate::error::{HwError, Result};

/// Step for each (previous AB, current AB) pair; invalid double transitions count 0.
const QUAD_TABLE: [i8; 16] = [0, 1, -1, 0, -1, 0, 0, 1, 1, 0, 0, -1, 0, -1, 1, 0];

/// Pin assignment for one motor on the Pi header.
#[derive(Debug, Clone, Copy)]
pub struct PiPins {
    /// Hardware PWM channel (0 or 1) driving bridge input A.
    pub pwm_a: u8,
    /// Hardware PWM channel (0 or 1) driving bridge input B.
    pub pwm_b: u8,
    /// BCM GPIO for encoder channel A.
    pub enc_a: u8,
    /// BCM GPIO for encoder channel B.
    pub enc_b: u8,
    /// Optional bridge enable line, driven high while the kit is open.
    pub enable: Option<u8>,
}

pub struct PiPwmChannel {
    pwm: Pwm,
}

impl PiPwmChannel {
    pub fn new(channel: u8, frequency_hz: f64) -> Result<Self> {
        let ch = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(HwError::Pwm(format!("no hardware pwm channel {other}"))),
        };
        let pwm = Pwm::with_frequency(ch, frequency_hz, 0.0, Polarity::Normal, true)
            .map_err(|e| HwError::Pwm(format!("open pwm{channel}: {e}")))?;
        Ok(Self { pwm })
    }
}

impl PwmChannel for PiPwmChannel {
    fn set_duty_percent(&mut self, percent: f32) -> HwResult<()> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Box::new(HwError::DutyOutOfRange(percent)));
        }
        self.pwm
            .set_duty_cycle(f64::from(percent) / 100.0)
            .map_err(|e| Box::new(HwError::Pwm(e.to_string())) as _)
    }
}

/// Interrupt-driven x4 quadrature decoder with a 16-bit wrapping counter.
pub struct GpioQuadrature {
    // Pins must stay alive for their interrupt callbacks to keep firing.
    _a: InputPin,
    _b: InputPin,
    count: Arc<AtomicU16>,
}

impl GpioQuadrature {
    pub fn new(gpio: &Gpio, pin_a: u8, pin_b: u8) -> Result<Self> {
        let mut a = gpio
            .get(pin_a)
            .map_err(|e| HwError::Gpio(format!("open encoder A pin {pin_a}: {e}")))?
            .into_input_pullup();
        let mut b = gpio
            .get(pin_b)
            .map_err(|e| HwError::Gpio(format!("open encoder B pin {pin_b}: {e}")))?
            .into_input_pullup();

        let initial = (u8::from(a.is_high()) << 1) | u8::from(b.is_high());
        let state = Arc::new(AtomicU8::new(initial));
        let count = Arc::new(AtomicU16::new(0));

        for (pin, bit) in [(&mut a, 1u8), (&mut b, 0u8)] {
            let state = state.clone();
            let count = count.clone();
            pin.set_async_interrupt(Trigger::Both, move |level: Level| {
                let mask = 1u8 << bit;
                let prev = state.load(Ordering::Relaxed);
                let next = if level == Level::High {
                    prev | mask
                } else {
                    prev & !mask
                };
                state.store(next, Ordering::Relaxed);
                match QUAD_TABLE[usize::from((prev << 2) | next)] {
                    1 => {
                        count.fetch_add(1, Ordering::Relaxed);
                    }
                    -1 => {
                        count.fetch_sub(1, Ordering::Relaxed);
                    }
                    _ => {}
                }
            })
            .map_err(|e| HwError::Gpio(format!("encoder interrupt: {e}")))?;
        }
        debug!(pin_a, pin_b, "quadrature decoder armed");

        Ok(Self {
            _a: a,
            _b: b,
            count,
        })
    }
}

impl QuadratureCounter for GpioQuadrature {
    fn count(&mut self) -> HwResult<u16> {
        Ok(self.count.load(Ordering::Relaxed))
    }
}

/// One motor's worth of Pi peripherals.
pub struct PiKit {
    pub encoder: GpioQuadrature,
    pub channel_a: PiPwmChannel,
    pub channel_b: PiPwmChannel,
    /// Held so the bridge stays enabled; dropping it releases the line.
    pub enable: Option<OutputPin>,
}

impl PiKit {
    pub fn open(pins: PiPins, pwm_frequency_hz: f64) -> Result<Self> {
        if pins.pwm_a == pins.pwm_b {
            return Err(HwError::Pwm(
                "bridge inputs A and B need distinct pwm channels".into(),
            ));
        }
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let enable = match pins.enable {
            Some(pin) => {
                let mut out = gpio
                    .get(pin)
                    .map_err(|e| HwError::Gpio(format!("open enable pin {pin}: {e}")))?
                    .into_output();
                out.set_high();
                Some(out)
            }
            None => None,
        };
        let kit = Self {
            encoder: GpioQuadrature::new(&gpio, pins.enc_a, pins.enc_b)?,
            channel_a: PiPwmChannel::new(pins.pwm_a, pwm_frequency_hz)?,
            channel_b: PiPwmChannel::new(pins.pwm_b, pwm_frequency_hz)?,
            enable,
        };
        info!(?pins, pwm_frequency_hz, "pi motor kit open");
        Ok(kit)
    }
}
