//! Maps `Box<dyn Error>` from trait boundaries to typed `KitError`.
//!
//! The traits in `motorlab_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `motorlab_hardware::HwError`.

use crate::error::KitError;

/// Map a trait-boundary error to a typed `KitError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> KitError {
    #[cfg(feature = "hardware-errors")]
    {
        use motorlab_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::DutyOutOfRange(level) => KitError::InvalidLevel(*level),
                other => KitError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("out of range") {
        KitError::HardwareFault(s)
    } else {
        KitError::Hardware(s)
    }
}
