use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("duty cycle out of range: {0}")]
    DutyOutOfRange(f32),
}

pub type Result<T> = std::result::Result<T, HwError>;
