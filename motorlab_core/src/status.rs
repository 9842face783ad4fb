//! Controller phases and the per-tick status returned by `StepResponse::step`.

use crate::stream::Record;

/// Where a controller is in its run cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Armed; the next tick starts a run.
    Ready,
    /// Closing the loop and recording every position.
    Capturing,
    /// Recording a fixed number of extra samples.
    Settling,
    /// Writing one recorded sample per tick.
    Emitting,
    /// Buffer drained; the next tick emits the end marker.
    Done,
    /// Motor stopped until a new gain arrives.
    Waiting,
}

/// Outcome of a single controller tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickStatus {
    Captured { position: i32, output: f32 },
    Settling { position: i32, tick: u32 },
    Emitted(Record),
    /// Nothing emitted; the run moves to `Done`.
    Drained,
    /// The end marker for the run.
    Finished,
    Waiting,
}
