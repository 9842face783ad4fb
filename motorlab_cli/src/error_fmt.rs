//! Human-readable error descriptions and structured JSON error formatting.

use motorlab_core::error::{BuildError, KitError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEncoder => {
                "What happened: No encoder counter was provided to the controller.\nLikely causes: The encoder failed to initialize or was not wired into the builder.\nHow to fix: Check the motors.pins enc_a/enc_b values and that the counter opens.".to_string()
            }
            BuildError::MissingMotor => {
                "What happened: No motor channels were provided to the controller.\nLikely causes: PWM channels failed to initialize or were not wired into the builder.\nHow to fix: Check motors.pins pwm_a/pwm_b and that PWM is enabled on the board.".to_string()
            }
            BuildError::MissingGain => {
                "What happened: Gain and setpoint not set.\nLikely causes: A [[motors]] entry was not mapped into the controller.\nHow to fix: Give every [[motors]] entry a gain and a setpoint.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/motorlab.toml for a sample."
            ),
        };
    }

    if let Some(ke) = err.downcast_ref::<KitError>() {
        return match ke {
            KitError::Hardware(_) | KitError::HardwareFault(_) => format!(
                "What happened: {ke}.\nLikely causes: Encoder or PWM hardware not responding, wrong pins, or missing GPIO permissions.\nHow to fix: Check wiring and the [[motors]] pins, then rerun with --log-level=debug."
            ),
            KitError::Io(_) => format!(
                "What happened: {ke}.\nLikely causes: The output file or pipe was closed or is not writable.\nHow to fix: Check the motors.output path and free disk space."
            ),
            _ => format!(
                "What happened: {ke}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config with the path to a motorlab TOML file."
        );
    }

    if lower.contains("parse config") || lower.contains("invalid configuration") {
        let cause = err.root_cause();
        return format!(
            "What happened: Configuration is invalid or incomplete ({cause}).\nLikely causes: A typo in a key, a missing [[motors]] entry, or an out-of-range value.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("open pi kit") || lower.contains("pins missing") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect or missing [motors.pins] values, or insufficient GPIO/PWM permissions.\nHow to fix: Fix the [motors.pins] values in the config; ensure the process has permission to access GPIO and PWM.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 config, 3 hardware, 4 io, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if let Some(ke) = err.downcast_ref::<KitError>() {
        return match ke {
            KitError::Config(_) => 2,
            KitError::Hardware(_) | KitError::HardwareFault(_) | KitError::InvalidLevel(_) => 3,
            KitError::Io(_) => 4,
            KitError::State(_) => 1,
        };
    }
    let lower = err.to_string().to_ascii_lowercase();
    if lower.contains("config") {
        return 2;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = if let Some(be) = err.downcast_ref::<BuildError>() {
        match be {
            BuildError::InvalidConfig(_) => "InvalidConfig",
            _ => "Build",
        }
    } else if let Some(ke) = err.downcast_ref::<KitError>() {
        match ke {
            KitError::Hardware(_) | KitError::HardwareFault(_) => "Hardware",
            KitError::InvalidLevel(_) => "InvalidLevel",
            KitError::Config(_) => "Config",
            KitError::State(_) => "State",
            KitError::Io(_) => "Io",
        }
    } else {
        "Error"
    };

    json!({
        "reason": reason,
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
