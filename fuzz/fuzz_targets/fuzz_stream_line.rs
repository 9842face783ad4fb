#![no_main]
use libfuzzer_sys::fuzz_target;
use motorlab_core::stream::{parse_gain_line, parse_line};
use motorlab_core::{Line, RunCollector};

fuzz_target!(|data: &str| {
    let mut collector = RunCollector::new();
    for line in data.lines() {
        if let Ok(Line::Sample { position, .. }) = parse_line(line) {
            assert!(position.is_finite());
        }
        if let Ok(gain) = parse_gain_line(line) {
            assert!(gain.is_finite() && gain >= 0.0);
        }
        if let Ok(Some(run)) = collector.push_line(line) {
            if let Some(pct) = run.overshoot_percent() {
                assert!(pct >= 0.0);
            }
        }
    }
});
