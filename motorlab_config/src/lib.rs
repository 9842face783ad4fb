#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the motor lab kit.
//!
//! `Config` and its sections are deserialized from TOML and checked with
//! `Config::validate`. Each `[[motors]]` entry describes one independent
//! encoder/driver/controller triple run by the scheduler.
use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;

/// What the controller does while it waits out the settle window.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettlePolicy {
    /// Keep sampling but leave the motor at its last command.
    #[default]
    Hold,
    /// Keep running the control law while sampling.
    Track,
}

/// What happens after the `end` marker has been emitted.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rearm {
    /// Start the next run straight away with the same gain.
    #[default]
    Continuous,
    /// Park with the motor off until a new gain is supplied.
    AwaitGain,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pins {
    pub pwm_a: u8,
    pub pwm_b: u8,
    pub enc_a: u8,
    pub enc_b: u8,
    #[serde(default)]
    pub enable: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct MotorCfg {
    pub name: String,
    /// Proportional gain, percent duty per count of error.
    pub gain: f32,
    /// Step target in encoder counts.
    pub setpoint: i32,
    /// Scheduler period for this motor's task.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    /// Higher runs first when several tasks are due.
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub settle_policy: SettlePolicy,
    #[serde(default)]
    pub rearm: Rearm,
    /// Where the sample stream goes; stdout when absent.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Header pins; only used by the `hardware` backend.
    #[serde(default)]
    pub pins: Option<Pins>,
}

fn default_period_ms() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EncoderCfg {
    /// Counter period; the register counts 0..=period.
    pub period: u16,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self { period: u16::MAX }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PwmCfg {
    pub frequency_hz: f64,
}

impl Default for PwmCfg {
    fn default() -> Self {
        Self {
            frequency_hz: 5000.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub counts_per_tick_full: f32,
    pub response: f32,
    pub deadband_percent: f32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            counts_per_tick_full: 400.0,
            response: 0.5,
            deadband_percent: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub motors: Vec<MotorCfg>,
    #[serde(default)]
    pub encoder: EncoderCfg,
    #[serde(default)]
    pub pwm: PwmCfg,
    #[serde(default)]
    pub sim: SimCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Motors
        if self.motors.is_empty() {
            eyre::bail!("at least one [[motors]] entry is required");
        }
        let mut names = HashSet::new();
        for m in &self.motors {
            if m.name.trim().is_empty() {
                eyre::bail!("motors.name must not be empty");
            }
            if !names.insert(m.name.as_str()) {
                eyre::bail!("motors.name '{}' is duplicated", m.name);
            }
            if !m.gain.is_finite() || m.gain < 0.0 {
                eyre::bail!("motors[{}].gain must be a finite value >= 0", m.name);
            }
            if m.period_ms == 0 {
                eyre::bail!("motors[{}].period_ms must be >= 1", m.name);
            }
            if m.period_ms > 60_000 {
                eyre::bail!("motors[{}].period_ms is unreasonably large (>60s)", m.name);
            }
            if let Some(p) = m.pins {
                if p.pwm_a == p.pwm_b {
                    eyre::bail!("motors[{}].pins.pwm_a and pwm_b must differ", m.name);
                }
                if p.enc_a == p.enc_b {
                    eyre::bail!("motors[{}].pins.enc_a and enc_b must differ", m.name);
                }
            }
        }

        // Encoder
        if self.encoder.period < 3 {
            eyre::bail!("encoder.period must be >= 3");
        }
        // The GPIO decoder counts through all 16 bits.
        if self.encoder.period != u16::MAX && self.motors.iter().any(|m| m.pins.is_some()) {
            eyre::bail!("encoder.period must be 65535 when [motors.pins] are set");
        }

        // PWM
        if !(self.pwm.frequency_hz.is_finite() && self.pwm.frequency_hz > 0.0) {
            eyre::bail!("pwm.frequency_hz must be > 0");
        }

        // Sim
        if !(self.sim.counts_per_tick_full.is_finite() && self.sim.counts_per_tick_full > 0.0) {
            eyre::bail!("sim.counts_per_tick_full must be > 0");
        }
        if !(self.sim.response > 0.0 && self.sim.response <= 1.0) {
            eyre::bail!("sim.response must be in (0.0, 1.0]");
        }
        if !(0.0..100.0).contains(&self.sim.deadband_percent) {
            eyre::bail!("sim.deadband_percent must be in [0.0, 100.0)");
        }
        // A full-speed tick must stay under half a counter period or every
        // read would look like a wrap.
        if f64::from(self.sim.counts_per_tick_full) >= (f64::from(self.encoder.period) + 1.0) / 2.0
        {
            eyre::bail!("sim.counts_per_tick_full must be below half of encoder.period");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[motors]]
name = "m1"
gain = 0.07
setpoint = 6900
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = load_toml(MINIMAL).unwrap();
        cfg.validate().unwrap();
        let m = &cfg.motors[0];
        assert_eq!(m.period_ms, 10);
        assert_eq!(m.priority, 0);
        assert_eq!(m.settle_policy, SettlePolicy::Hold);
        assert_eq!(m.rearm, Rearm::Continuous);
        assert!(m.output.is_none());
        assert_eq!(cfg.encoder.period, 65535);
        assert!((cfg.pwm.frequency_hz - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pins_table_attaches_to_last_motor() {
        let toml = r#"
[[motors]]
name = "m1"
gain = 0.1
setpoint = 6900
rearm = "await_gain"
settle_policy = "track"

[motors.pins]
pwm_a = 0
pwm_b = 1
enc_a = 17
enc_b = 27
enable = 22
"#;
        let cfg = load_toml(toml).unwrap();
        cfg.validate().unwrap();
        let m = &cfg.motors[0];
        assert_eq!(m.rearm, Rearm::AwaitGain);
        assert_eq!(m.settle_policy, SettlePolicy::Track);
        let pins = m.pins.unwrap();
        assert_eq!((pins.enc_a, pins.enc_b, pins.enable), (17, 27, Some(22)));
    }
}
