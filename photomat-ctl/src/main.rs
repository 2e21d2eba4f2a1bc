//! Photomat booth controller - main entry point
//!
//! Loads the booth configuration, opens the GPIO lines and runs the
//! scheduler until the exit button (or SIGINT/SIGTERM) ends it.
//!
//! Exit codes: 0 after a normal shutdown, 1 after a fatal error (empty
//! video catalog, bad configuration, GPIO unavailable).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use photomat_common::config::BoothConfig;
use photomat_common::logging;
use photomat_ctl::error::GpioError;
use photomat_ctl::playback::{OmxBackend, TriggerOffsets};
use photomat_ctl::scheduler::{Hardware, Scheduler, SchedulerSettings, Sequences};
use tokio::signal;
use tracing::{info, warn};

/// Command-line arguments for photomat
#[derive(Parser, Debug)]
#[command(name = "photomat")]
#[command(about = "Photo booth display controller")]
#[command(version)]
struct Args {
    /// Config file (default: $PHOTOMAT_CONFIG, ~/.config/photomat/config.toml, /etc/photomat/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control loop period in milliseconds
    #[arg(long, env = "PHOTOMAT_TICK_MS")]
    tick_ms: Option<u64>,

    /// Verbosity 0-5 (none, state, progress, gpio, video info, action)
    #[arg(short, long, env = "PHOTOMAT_VERBOSITY", value_parser = clap::value_parser!(u8).range(0..=5))]
    verbosity: Option<u8>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,

    /// Extra arguments passed to every player instance
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    player_args: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            // Logging may not be up yet
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let (mut config, source) =
        BoothConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(tick_ms) = args.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(verbosity) = args.verbosity {
        config.verbosity = verbosity;
    }
    config.validate().context("Invalid configuration")?;

    if args.dump_config {
        print!("{}", config.to_toml_string()?);
        return Ok(0);
    }

    logging::init_logging(config.verbosity)?;

    info!(
        "Starting photomat v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No config file found, using built-in defaults"),
    }

    let sequences = Sequences::from_config(&config).context("Failed to build video catalogs")?;
    for (name, sequence) in [
        ("idle", &sequences.idle),
        ("countdown", &sequences.countdown),
        ("applause", &sequences.applause),
    ] {
        if sequence.catalog.is_empty() {
            warn!("No {} videos configured", name);
        } else {
            info!("{} {} video(s)", sequence.catalog.len(), name);
        }
    }

    let offsets = TriggerOffsets::try_from(&config.trigger)?;
    let hardware = open_hardware(&config, offsets).context("Failed to open GPIO lines")?;
    info!(
        "GPIO: buzzer {}, exit {}, trigger {}",
        config.gpio.buzzer_pin, config.gpio.exit_pin, config.gpio.trigger_pin
    );

    let backend = OmxBackend::new(config.player.clone());
    let settings = SchedulerSettings::from_config(&config, &args.player_args);
    let mut scheduler = Scheduler::new(settings, Box::new(backend), sequences, hardware);

    let code = scheduler.run(shutdown_signal()).await;
    if let Some(message) = scheduler.error() {
        warn!("Stopped after error: {}", message);
    }
    info!("Shutdown complete");
    Ok(code)
}

#[cfg(target_os = "linux")]
fn open_hardware(config: &BoothConfig, offsets: TriggerOffsets) -> Result<Hardware, GpioError> {
    use photomat_ctl::gpio::cdev;
    use photomat_ctl::playback::TriggerBinding;

    let lines = cdev::open_lines(&config.gpio)?;
    Ok(Hardware {
        buzzer: Box::new(lines.buzzer),
        exit_button: Box::new(lines.exit_button),
        trigger: Some(TriggerBinding::new(Box::new(lines.trigger), offsets)),
    })
}

#[cfg(not(target_os = "linux"))]
fn open_hardware(_config: &BoothConfig, _offsets: TriggerOffsets) -> Result<Hardware, GpioError> {
    Err(GpioError::Unsupported)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
