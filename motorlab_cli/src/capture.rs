//! `capture`: turn a recorded sample stream into CSV.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use eyre::WrapErr;
use motorlab_core::{Run, RunCollector};

fn log_run(index: usize, run: &Run) {
    tracing::info!(
        run = index,
        samples = run.samples.len(),
        final_position = run.final_position(),
        peak_position = run.peak_position(),
        overshoot_percent = run.overshoot_percent(),
        "run captured"
    );
}

/// Copy every complete run from `input` into `out` as
/// `run,elapsed_ms,position` rows. Returns the number of runs written.
pub fn capture_stream<R: BufRead, W: Write>(mut input: R, out: W) -> eyre::Result<usize> {
    let mut csv = csv::Writer::from_writer(out);
    csv.write_record(["run", "elapsed_ms", "position"])?;

    let mut collector = RunCollector::new();
    let mut runs = 0usize;
    let mut undecodable = 0usize;
    let mut buf = Vec::new();
    let mut lineno = 0usize;
    loop {
        buf.clear();
        if input
            .read_until(b'\n', &mut buf)
            .wrap_err("read sample stream")?
            == 0
        {
            break;
        }
        lineno += 1;
        let Ok(line) = std::str::from_utf8(&buf) else {
            undecodable += 1;
            tracing::debug!(line = lineno, "skipping line that is not UTF-8");
            continue;
        };
        match collector.push_line(line) {
            Ok(Some(run)) => {
                for (elapsed_ms, position) in &run.samples {
                    csv.write_record([
                        runs.to_string(),
                        elapsed_ms.to_string(),
                        position.to_string(),
                    ])?;
                }
                log_run(runs, &run);
                runs += 1;
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(line = lineno, error = %e, "skipping line"),
        }
    }
    csv.flush().wrap_err("flush csv")?;

    let skipped = collector.skipped() + undecodable;
    if skipped > 0 {
        tracing::warn!(skipped, "ignored lines that were not samples");
    }
    if collector.pending() > 0 {
        tracing::warn!(
            samples = collector.pending(),
            "stream ended mid-run; trailing samples dropped"
        );
    }
    Ok(runs)
}

pub fn capture(input: Option<&Path>, out: &Path) -> eyre::Result<usize> {
    let sink = File::create(out).wrap_err_with(|| format!("create csv {}", out.display()))?;
    match input {
        Some(path) => {
            let file =
                File::open(path).wrap_err_with(|| format!("open stream {}", path.display()))?;
            capture_stream(BufReader::new(file), sink)
        }
        None => capture_stream(std::io::stdin().lock(), sink),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_runs_become_rows() {
        let stream = "boot noise\n10,0\n20,150.5\nend\n10,0\nend\n10,3\n";
        let mut out = Vec::new();
        let runs = capture_stream(stream.as_bytes(), &mut out).unwrap();
        assert_eq!(runs, 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "run,elapsed_ms,position\n0,10,0\n0,20,150.5\n1,10,0\n"
        );
    }

    #[test]
    fn non_utf8_noise_is_skipped() {
        let stream: &[u8] = b"\xff\xfe boot noise\n10,0\n20,5\nend\n";
        let mut out = Vec::new();
        assert_eq!(capture_stream(stream, &mut out).unwrap(), 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "run,elapsed_ms,position\n0,10,0\n0,20,5\n"
        );
    }

    #[test]
    fn empty_stream_writes_only_the_header() {
        let mut out = Vec::new();
        assert_eq!(capture_stream("".as_bytes(), &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "run,elapsed_ms,position\n");
    }
}
