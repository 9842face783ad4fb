//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "motorlab", version, about = "Motor step-response lab")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/motorlab.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run step responses on every configured motor and stream the samples
    Run {
        /// Stop each motor after this many completed runs
        #[arg(long, value_name = "N")]
        runs: Option<u32>,
        /// Ask for a gain on stdin before every run
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Prompt for a proportional gain on stdin (prompt and errors on stderr) before each run. Every motor parks with its outputs at zero until a valid gain arrives. Input that is not a finite, non-negative number is rejected and re-prompted. The command ends once stdin closes and all motors are parked."
        )]
        interactive: bool,
        /// Pace the simulated kit in wall-clock time instead of simulated time
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
    },
    /// Read a sample stream and write the runs as CSV
    Capture {
        /// Stream to read; stdin when omitted
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// CSV file to write (run,elapsed_ms,position)
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Quick health check (config valid, kit responds)
    SelfCheck,
}
