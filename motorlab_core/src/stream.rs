//! Line protocol between the controller and the host.
//!
//! Device to host: one `"<elapsed_ms>,<position>"` line per recorded sample,
//! then a line reading exactly `end`. Host to device: a gain as a decimal
//! number terminated by CRLF.

use core::fmt;

use thiserror::Error;

use crate::config::gain_is_valid;

pub const END_MARKER: &str = "end";

/// One recorded sample as emitted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// Milliseconds since the emit phase started.
    pub elapsed_ms: u64,
    pub position: i32,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.elapsed_ms, self.position)
    }
}

/// A parsed device line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Line {
    Sample { elapsed_ms: u64, position: f64 },
    End,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StreamError {
    #[error("expected 2 comma-separated fields, got {0}")]
    FieldCount(usize),
    #[error("invalid elapsed time '{0}'")]
    Elapsed(String),
    #[error("invalid position '{0}'")]
    Position(String),
    #[error("invalid gain '{0}'")]
    Gain(String),
    #[error("gain must be finite and >= 0, got {0}")]
    GainRange(f32),
}

/// Parse one line of the device stream. Surrounding whitespace (including
/// a trailing `\r`) is ignored.
pub fn parse_line(line: &str) -> Result<Line, StreamError> {
    let line = line.trim();
    if line == END_MARKER {
        return Ok(Line::End);
    }
    let fields: Vec<&str> = line.split(',').collect();
    let [ms, pos] = fields.as_slice() else {
        return Err(StreamError::FieldCount(fields.len()));
    };
    let ms = ms.trim();
    let pos = pos.trim();
    let elapsed_ms = ms
        .parse::<u64>()
        .map_err(|_| StreamError::Elapsed(ms.to_string()))?;
    let position = pos
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| StreamError::Position(pos.to_string()))?;
    Ok(Line::Sample {
        elapsed_ms,
        position,
    })
}

/// Parse a gain typed by the operator.
pub fn parse_gain_line(line: &str) -> Result<f32, StreamError> {
    let text = line.trim();
    let gain = text
        .parse::<f32>()
        .map_err(|_| StreamError::Gain(text.to_string()))?;
    if !gain_is_valid(gain) {
        return Err(StreamError::GainRange(gain));
    }
    Ok(gain)
}

pub fn format_gain_line(gain: f32) -> String {
    format!("{gain}\r\n")
}

/// Samples of one run, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub samples: Vec<(u64, f64)>,
}

impl Run {
    pub fn final_position(&self) -> Option<f64> {
        self.samples.last().map(|&(_, p)| p)
    }

    pub fn peak_position(&self) -> Option<f64> {
        self.samples.iter().map(|&(_, p)| p).reduce(f64::max)
    }

    /// How far the peak went past the final value, as a percentage of the
    /// final value. `None` for empty runs or a final value of zero.
    pub fn overshoot_percent(&self) -> Option<f64> {
        let last = self.final_position()?;
        let peak = self.peak_position()?;
        if last == 0.0 {
            return None;
        }
        Some(((peak - last) / last.abs() * 100.0).max(0.0))
    }
}

/// Groups device lines into runs split by the end marker.
#[derive(Debug, Default)]
pub struct RunCollector {
    current: Run,
    skipped: usize,
}

impl RunCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the finished run when the line is the end
    /// marker; invalid lines are counted and otherwise ignored.
    pub fn push_line(&mut self, line: &str) -> Result<Option<Run>, StreamError> {
        match parse_line(line) {
            Ok(Line::Sample {
                elapsed_ms,
                position,
            }) => {
                self.current.samples.push((elapsed_ms, position));
                Ok(None)
            }
            Ok(Line::End) => Ok(Some(core::mem::take(&mut self.current))),
            Err(e) => {
                self.skipped += 1;
                Err(e)
            }
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Samples received after the last end marker.
    pub fn pending(&self) -> usize {
        self.current.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_has_no_spaces() {
        let r = Record {
            elapsed_ms: 12,
            position: -340,
        };
        assert_eq!(r.to_string(), "12,-340");
    }

    #[test]
    fn end_marker_tolerates_crlf() {
        assert_eq!(parse_line("end\r\n"), Ok(Line::End));
    }

    #[test]
    fn overshoot_is_relative_to_final_value() {
        let run = Run {
            samples: vec![(0, 0.0), (10, 110.0), (20, 100.0)],
        };
        let o = run.overshoot_percent().unwrap();
        assert!((o - 10.0).abs() < 1e-9);
    }
}
