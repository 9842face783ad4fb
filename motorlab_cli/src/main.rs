mod capture;
mod cli;
mod error_fmt;
mod logging;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use motorlab_config::Config;

use crate::cli::{Cli, Commands, JSON_MODE};

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = motorlab_config::load_toml(&text).wrap_err("parse config")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn shutdown_flag() -> eyre::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .wrap_err("install ctrl-c handler")?;
    Ok(flag)
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    match cli.cmd {
        Commands::Capture { input, out } => {
            logging::init_tracing(cli.json, &cli.log_level, None);
            let runs = capture::capture(input.as_deref(), &out)?;
            tracing::info!(runs, out = %out.display(), "capture complete");
            Ok(())
        }
        Commands::Run {
            runs,
            interactive,
            realtime,
        } => {
            let cfg = load_config(&cli.config)?;
            let file_cfg = cfg.logging.file.is_some().then_some(&cfg.logging);
            logging::init_tracing(cli.json, &cli.log_level, file_cfg);
            let shutdown = shutdown_flag()?;
            run::run(
                &cfg,
                run::RunOpts {
                    runs,
                    interactive,
                    realtime,
                },
                &shutdown,
            )
        }
        Commands::SelfCheck => {
            let cfg = load_config(&cli.config)?;
            let file_cfg = cfg.logging.file.is_some().then_some(&cfg.logging);
            logging::init_tracing(cli.json, &cli.log_level, file_cfg);
            run::self_check(&cfg)?;
            println!("OK");
            Ok(())
        }
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}
