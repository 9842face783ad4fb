#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core motor lab logic (hardware-agnostic).
//!
//! All hardware access goes through `motorlab_traits::QuadratureCounter` and
//! `motorlab_traits::PwmChannel`, so the same controller runs against the
//! simulated kit, a Raspberry Pi, or test mocks.
//!
//! ## Architecture
//!
//! - **Encoder**: wrap-compensated position from a 16-bit counter (`encoder`)
//! - **Motor**: signed level to H-bridge duty pair (`motor`)
//! - **Control**: step-response state machine (`controller`, `builder`, `status`)
//! - **Protocol**: `ms,pos` sample lines, `end` marker, gain lines (`stream`)
//! - **Scheduling**: cooperative priority scheduler and the task adapter (`runner`, `task`)
//! - **Operator input**: background gain reader (`gain_input`)

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod encoder;
pub mod error;
pub mod gain_input;
pub mod hw_error;
pub mod mocks;
pub mod motor;
pub mod runner;
pub mod status;
pub mod stream;
pub mod task;

pub use builder::StepResponseBuilder;
pub use config::{ControllerCfg, Rearm, SETTLE_THRESHOLD, SETTLE_TICKS, SettlePolicy};
pub use controller::StepResponse;
pub use encoder::PositionAccumulator;
pub use error::{BuildError, KitError, Result};
pub use gain_input::{GainInput, GainPoll, GainReceiver};
pub use motor::{DutyPair, MotorDriver};
pub use runner::{Scheduler, Task, TaskProfile};
pub use status::{Phase, TickStatus};
pub use stream::{END_MARKER, Line, Record, Run, RunCollector, StreamError};
pub use task::StepResponseTask;
