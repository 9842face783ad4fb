//! `From` conversions from the config crate into runtime types.

use motorlab_config as cfg;

use crate::config::{ControllerCfg, Rearm, SettlePolicy};

// ── SettlePolicy ────────────────────────────────────────────────────────────

impl From<cfg::SettlePolicy> for SettlePolicy {
    fn from(p: cfg::SettlePolicy) -> Self {
        match p {
            cfg::SettlePolicy::Hold => Self::Hold,
            cfg::SettlePolicy::Track => Self::Track,
        }
    }
}

// ── Rearm ───────────────────────────────────────────────────────────────────

impl From<cfg::Rearm> for Rearm {
    fn from(r: cfg::Rearm) -> Self {
        match r {
            cfg::Rearm::Continuous => Self::Continuous,
            cfg::Rearm::AwaitGain => Self::AwaitGain,
        }
    }
}

// ── ControllerCfg ───────────────────────────────────────────────────────────

impl From<&cfg::MotorCfg> for ControllerCfg {
    fn from(m: &cfg::MotorCfg) -> Self {
        Self {
            gain: m.gain,
            setpoint: m.setpoint,
            settle_policy: m.settle_policy.into(),
            rearm: m.rearm.into(),
        }
    }
}
