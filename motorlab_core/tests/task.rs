use std::io::{Cursor, Write};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use motorlab_core::mocks::{SeqCounter, SpyChannel};
use motorlab_core::stream::{format_gain_line, parse_line};
use motorlab_core::{
    GainInput, GainPoll, GainReceiver, Line, Phase, Rearm, Scheduler, StepResponse,
    StepResponseTask, Task,
};
use motorlab_traits::SimClock;

fn controller(rearm: Rearm, clock: &SimClock) -> StepResponse {
    StepResponse::builder()
        .with_name("m1")
        .with_counter(SeqCounter::new(vec![6900]))
        .with_channels(SpyChannel::new(), SpyChannel::new())
        .with_step(0.07, 6900)
        .with_rearm(rearm)
        .with_clock(Box::new(clock.clone()))
        .build()
        .unwrap()
}

#[test]
fn scheduled_task_writes_protocol_lines_then_end() {
    let clock = SimClock::new();
    let mut task =
        StepResponseTask::new(controller(Rearm::Continuous, &clock), Vec::<u8>::new())
            .with_max_runs(1);

    // Drive the task directly at 10 ms ticks.
    while !task.is_finished() {
        task.run_once().unwrap();
        clock.advance(Duration::from_millis(10));
    }
    let out = String::from_utf8(task.into_sink()).unwrap();
    let lines: Vec<&str> = out.lines().collect();

    // 12 samples, then the marker.
    assert_eq!(lines.len(), 13);
    assert_eq!(lines[12], "end");
    assert_eq!(lines[0], "10,0");
    assert_eq!(lines[1], "20,6900");
    for line in lines.iter().filter(|l| **l != "end") {
        assert!(matches!(parse_line(line), Ok(Line::Sample { .. })), "{line}");
    }
}

#[test]
fn task_runs_under_the_scheduler() {
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);
    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let clock = SimClock::new();
    let sink = SharedSink::default();
    let task =
        StepResponseTask::new(controller(Rearm::Continuous, &clock), sink.clone()).with_max_runs(1);
    let mut sched = Scheduler::new(Arc::new(clock.clone()));
    sched.add(Box::new(task), 10, 0);
    sched.run_until(&AtomicBool::new(false));

    let out = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    assert!(out.ends_with("end\n"));
    assert_eq!(out.matches("end").count(), 1);
    assert_eq!(sched.profiles()[0].1.errors, 0);
}

#[test]
fn waiting_task_is_armed_from_the_gain_channel() {
    let clock = SimClock::new();
    let (tx, rx) = crossbeam_channel::bounded(1);
    let mut task = StepResponseTask::new(controller(Rearm::AwaitGain, &clock), Vec::<u8>::new())
        .with_gains(GainReceiver::from_channel(rx));

    while task.controller().phase() != Phase::Waiting {
        task.run_once().unwrap();
    }
    assert_eq!(task.controller().completed_runs(), 1);
    assert!(!task.is_finished());

    task.run_once().unwrap();
    assert_eq!(task.controller().phase(), Phase::Waiting);

    // The counter no longer moves; a zero gain lets the second run settle at once.
    tx.send(0.0).unwrap();
    task.run_once().unwrap();
    assert_eq!(task.controller().phase(), Phase::Capturing);
    assert_eq!(task.controller().gain(), 0.0);

    drop(tx);
    while task.controller().phase() != Phase::Waiting {
        task.run_once().unwrap();
    }
    task.run_once().unwrap();
    assert!(task.is_finished());
}

#[test]
fn waiting_without_gain_source_is_finished() {
    let clock = SimClock::new();
    let mut task = StepResponseTask::new(controller(Rearm::AwaitGain, &clock), Vec::<u8>::new());
    while task.controller().phase() != Phase::Waiting {
        task.run_once().unwrap();
    }
    assert!(task.is_finished());
    task.shutdown().unwrap();
}

#[derive(Clone, Default)]
struct Prompt(Arc<Mutex<Vec<u8>>>);

impl Write for Prompt {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn wait_for(rx: &GainReceiver) -> GainPoll {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match rx.poll() {
            GainPoll::Empty if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(2));
            }
            other => return other,
        }
    }
}

#[test]
fn gain_reader_forwards_valid_lines_and_reprompts_on_bad_ones() {
    let input = format!("abc\n{}-1\n{}", format_gain_line(0.25), format_gain_line(0.5));
    let prompt = Prompt::default();
    let (input_thread, receivers) = GainInput::spawn(Cursor::new(input), prompt.clone(), 1);
    let rx = &receivers[0];

    assert_eq!(wait_for(rx), GainPoll::Gain(0.25));
    assert_eq!(wait_for(rx), GainPoll::Gain(0.5));
    assert_eq!(wait_for(rx), GainPoll::Closed);

    let shown = String::from_utf8(prompt.0.lock().unwrap().clone()).unwrap();
    assert_eq!(shown.matches("Invalid input").count(), 2);
    assert!(shown.starts_with("Set gain: "));
    drop(input_thread);
}

#[test]
fn gain_reader_broadcasts_to_every_subscriber() {
    let (_input_thread, receivers) =
        GainInput::spawn(Cursor::new(format_gain_line(0.1)), std::io::sink(), 2);
    for rx in &receivers {
        assert_eq!(wait_for(rx), GainPoll::Gain(0.1));
    }
}

#[test]
fn dropped_subscribers_end_the_reader() {
    let (input_thread, receivers) = GainInput::spawn(
        Cursor::new("0.1\n0.2\n0.3\n".to_string()),
        std::io::sink(),
        1,
    );
    drop(receivers);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !input_thread.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(input_thread.is_finished());
}
