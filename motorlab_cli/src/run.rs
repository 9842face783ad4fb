//! Kit assembly and the `run` / `self-check` commands.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use motorlab_config::{Config, MotorCfg};
use motorlab_core::{ControllerCfg, Rearm, Scheduler, StepResponse, StepResponseTask};
use motorlab_core::{GainInput, GainReceiver};
use motorlab_traits::{Clock, MonotonicClock, PwmChannel, QuadratureCounter, SimClock};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOpts {
    pub runs: Option<u32>,
    pub interactive: bool,
    pub realtime: bool,
}

/// Counter and both PWM channels for one motor.
pub struct MotorIo {
    pub counter: Box<dyn QuadratureCounter>,
    pub channel_a: Box<dyn PwmChannel>,
    pub channel_b: Box<dyn PwmChannel>,
    /// Resources that must outlive the run, such as a held enable line.
    pub keep_alive: Vec<Box<dyn std::any::Any>>,
}

// ── Backends ────────────────────────────────────────────────────────────────

fn sim_params(cfg: &Config) -> motorlab_hardware::SimParams {
    motorlab_hardware::SimParams {
        counts_per_tick_full: cfg.sim.counts_per_tick_full,
        response: cfg.sim.response,
        deadband_percent: cfg.sim.deadband_percent,
        period: cfg.encoder.period,
        ..motorlab_hardware::SimParams::default()
    }
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_motor(cfg: &Config, motor: &MotorCfg) -> eyre::Result<MotorIo> {
    let kit = motorlab_hardware::SimulatedKit::new(sim_params(cfg));
    tracing::debug!(motor = %motor.name, "using simulated kit");
    Ok(MotorIo {
        counter: Box::new(kit.encoder),
        channel_a: Box::new(kit.channel_a),
        channel_b: Box::new(kit.channel_b),
        keep_alive: Vec::new(),
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_motor(cfg: &Config, motor: &MotorCfg) -> eyre::Result<MotorIo> {
    use motorlab_hardware::pi::{PiKit, PiPins};

    let pins = motor
        .pins
        .ok_or_else(|| eyre::eyre!("motors[{}].pins missing for hardware backend", motor.name))?;
    let kit = PiKit::open(
        PiPins {
            pwm_a: pins.pwm_a,
            pwm_b: pins.pwm_b,
            enc_a: pins.enc_a,
            enc_b: pins.enc_b,
            enable: pins.enable,
        },
        cfg.pwm.frequency_hz,
    )
    .wrap_err_with(|| format!("open pi kit for motor '{}'", motor.name))?;
    tracing::info!(motor = %motor.name, ?pins, "hardware kit opened");
    let mut keep_alive: Vec<Box<dyn std::any::Any>> = Vec::new();
    if let Some(enable) = kit.enable {
        keep_alive.push(Box::new(enable));
    }
    Ok(MotorIo {
        counter: Box::new(kit.encoder),
        channel_a: Box::new(kit.channel_a),
        channel_b: Box::new(kit.channel_b),
        keep_alive,
    })
}

/// Simulated time unless pacing in wall-clock time was asked for or real
/// hardware is attached.
fn make_clock(realtime: bool) -> Arc<dyn Clock + Send + Sync> {
    let hardware = cfg!(all(feature = "hardware", target_os = "linux"));
    if realtime || hardware {
        Arc::new(MonotonicClock::new())
    } else {
        Arc::new(SimClock::new())
    }
}

/// Boxed handle onto the same timeline as `clock`.
fn clone_clock(clock: &Arc<dyn Clock + Send + Sync>) -> Box<dyn Clock + Send + Sync> {
    struct Shared(Arc<dyn Clock + Send + Sync>);
    impl Clock for Shared {
        fn now(&self) -> std::time::Instant {
            self.0.now()
        }
        fn sleep(&self, d: std::time::Duration) {
            self.0.sleep(d);
        }
    }
    Box::new(Shared(Arc::clone(clock)))
}

fn open_sink(motor: &MotorCfg) -> eyre::Result<Box<dyn Write>> {
    match &motor.output {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("create output {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

pub fn build_controller(
    cfg: &Config,
    motor: &MotorCfg,
    io: MotorIo,
    clock: Box<dyn Clock + Send + Sync>,
    interactive: bool,
) -> eyre::Result<StepResponse> {
    let mut ccfg = ControllerCfg::from(motor);
    if interactive {
        ccfg.rearm = Rearm::AwaitGain;
    }
    let mut ctl = StepResponse::builder()
        .with_name(motor.name.clone())
        .with_counter(io.counter)
        .with_channels(io.channel_a, io.channel_b)
        .with_config(ccfg)
        .with_encoder_period(cfg.encoder.period)
        .with_clock(clock)
        .build()
        .wrap_err_with(|| format!("build controller for motor '{}'", motor.name))?;
    if interactive {
        ctl.park()?;
    }
    Ok(ctl)
}

pub fn run(cfg: &Config, opts: RunOpts, shutdown: &AtomicBool) -> eyre::Result<()> {
    let clock = make_clock(opts.realtime);
    let mut sched = Scheduler::new(Arc::clone(&clock));

    let (_gain_input, mut receivers): (Option<GainInput>, Vec<GainReceiver>) = if opts.interactive
    {
        let stdin = std::io::BufReader::new(std::io::stdin());
        let (input, rx) = GainInput::spawn(stdin, std::io::stderr(), cfg.motors.len());
        (Some(input), rx)
    } else {
        (None, Vec::new())
    };

    let on_stdout = cfg.motors.iter().filter(|m| m.output.is_none()).count();
    if on_stdout > 1 {
        tracing::warn!(motors = on_stdout, "several motors share stdout; their lines will interleave");
    }

    // Dropped after the scheduler stops, releasing enable lines.
    let mut held: Vec<Box<dyn std::any::Any>> = Vec::new();
    for motor in &cfg.motors {
        let mut io = open_motor(cfg, motor)?;
        held.append(&mut io.keep_alive);
        let ctl = build_controller(cfg, motor, io, clone_clock(&clock), opts.interactive)?;
        let mut task = StepResponseTask::new(ctl, open_sink(motor)?);
        if let Some(n) = opts.runs {
            task = task.with_max_runs(n);
        }
        if opts.interactive && !receivers.is_empty() {
            task = task.with_gains(receivers.remove(0));
        }
        tracing::info!(
            motor = %motor.name,
            gain = motor.gain,
            setpoint = motor.setpoint,
            period_ms = motor.period_ms,
            priority = motor.priority,
            "motor scheduled"
        );
        sched.add(Box::new(task), motor.period_ms, motor.priority);
    }

    sched.run_until(shutdown);
    eprint!("{}", sched.report());
    drop(held);
    Ok(())
}

/// Open every motor, drive it briefly forward and back, and confirm the
/// encoder follows.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let clock = make_clock(false);
    for motor in &cfg.motors {
        let mut io = open_motor(cfg, motor)?;
        let _held = std::mem::take(&mut io.keep_alive);
        let mut ctl = build_controller(cfg, motor, io, clone_clock(&clock), false)?;
        // A few ticks of the first capture phase move the motor off zero.
        for _ in 0..5 {
            ctl.step()?;
            clock.sleep(std::time::Duration::from_millis(motor.period_ms));
        }
        ctl.motor_stop()?;
        let moved = ctl.position();
        tracing::info!(motor = %motor.name, moved, "self-check");
        if motor.gain > 0.0 && motor.setpoint != 0 && moved == 0 {
            eyre::bail!("motor '{}' did not move during self-check", motor.name);
        }
    }
    Ok(())
}
