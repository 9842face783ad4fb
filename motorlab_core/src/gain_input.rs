//! Background reader for operator-entered gains.
//!
//! Spawns a thread that prompts on a writer, reads gain lines from a
//! `BufRead` and forwards every valid gain to each subscriber over a
//! bounded channel. Invalid lines are reported on the prompt writer and
//! re-prompted; they never reach a controller.
//!
//! The thread exits on end of input or once every subscriber is gone. A
//! blocked read cannot be interrupted, so `Drop` only joins a thread that
//! has already finished.
use std::io::{BufRead, Write};
use std::thread::JoinHandle;

use crossbeam_channel as xch;

use crate::stream::parse_gain_line;

pub const PROMPT: &str = "Set gain: ";

pub struct GainInput {
    join_handle: Option<JoinHandle<()>>,
}

/// What a subscriber sees when it polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainPoll {
    Gain(f32),
    Empty,
    /// Input ended; no more gains will arrive.
    Closed,
}

#[derive(Debug, Clone)]
pub struct GainReceiver {
    rx: xch::Receiver<f32>,
}

impl GainReceiver {
    /// Non-blocking check for a new gain.
    pub fn poll(&self) -> GainPoll {
        match self.rx.try_recv() {
            Ok(g) => GainPoll::Gain(g),
            Err(xch::TryRecvError::Empty) => GainPoll::Empty,
            Err(xch::TryRecvError::Disconnected) => GainPoll::Closed,
        }
    }

    /// Receiver fed from an existing channel.
    pub fn from_channel(rx: xch::Receiver<f32>) -> Self {
        Self { rx }
    }
}

impl GainInput {
    pub fn spawn<R, W>(reader: R, prompt: W, subscribers: usize) -> (Self, Vec<GainReceiver>)
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
    {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..subscribers)
            .map(|_| {
                let (tx, rx) = xch::bounded::<f32>(1);
                (tx, GainReceiver { rx })
            })
            .unzip();

        let join_handle = std::thread::spawn(move || read_loop(reader, prompt, senders));

        (
            Self {
                join_handle: Some(join_handle),
            },
            receivers,
        )
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }
}

fn read_loop<R: BufRead, W: Write>(mut reader: R, mut prompt: W, mut senders: Vec<xch::Sender<f32>>) {
    let mut line = String::new();
    loop {
        // Prompt output is best effort; a closed terminal does not stop input.
        let _ = write!(prompt, "{PROMPT}");
        let _ = prompt.flush();

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                tracing::debug!("gain input reached end of input");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "gain input read failed");
                break;
            }
        }

        match parse_gain_line(&line) {
            Ok(gain) => {
                // Drop subscribers whose receiver is gone.
                senders.retain(|tx| tx.send(gain).is_ok());
                if senders.is_empty() {
                    tracing::debug!("gain subscribers disconnected, exiting thread");
                    break;
                }
                tracing::info!(gain, "gain accepted");
            }
            Err(e) => {
                tracing::warn!(input = line.trim(), error = %e, "rejected gain input");
                let _ = writeln!(prompt, "Invalid input ({e}). Please enter a valid number.");
            }
        }
    }
    tracing::trace!("gain input thread exiting cleanly");
}

impl Drop for GainInput {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            if !handle.is_finished() {
                tracing::trace!("gain input thread still blocked on input; detaching");
                return;
            }
            if let Err(e) = handle.join() {
                tracing::warn!(?e, "gain input thread panicked");
            }
        }
    }
}
