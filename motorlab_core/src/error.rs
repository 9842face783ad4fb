use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KitError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("invalid duty level: {0}")]
    InvalidLevel(f32),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing encoder counter")]
    MissingEncoder,
    #[error("missing motor channels")]
    MissingMotor,
    #[error("missing gain and setpoint")]
    MissingGain,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
