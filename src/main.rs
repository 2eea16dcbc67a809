//! # Thrust Stand
//!
//! Log motor test-stand telemetry (thrust, torque, PWM, RPM, cell voltages)
//! streamed over a serial link, and plot the resulting CSV log.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use thrust_stand::acquisition::{self, Acquisition};
use thrust_stand::config::Config;
use thrust_stand::console::{self, Console};
use thrust_stand::control::ControlSurface;
use thrust_stand::plot;
use thrust_stand::serial::{self, TransportGuard};
use thrust_stand::telemetry::{LogSink, SessionState};

/// Default configuration file location
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (built-in defaults are used if it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial device, overrides the configuration file
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overrides the configuration file
    #[arg(short, long)]
    baud: Option<u32>,

    /// Telemetry log file, overrides the configuration file
    #[arg(short, long)]
    output: Option<String>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Connect to the test stand and log telemetry (default)
    Run,
    /// Render a finished log to an image
    Plot {
        /// Log to read (defaults to the configured log file)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Image to write (defaults to the configured plot file)
        #[arg(long)]
        image: Option<String>,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(output) = &self.output {
            config.logging.output_file = output.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Main entry point for the thrust stand logger
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up non-blocking logging to stderr
///    - Open the serial port and wait for the controller to reset
///    - Truncate the log file and write its header
///
/// 2. **Running**
///    - Acquisition task drains the serial line continuously
///    - Operator commands are read from stdin (`help` lists them)
///    - Live RPM is reported at `status_interval_ms`
///
/// 3. **Shutdown** (on `quit`, end of input, or Ctrl+C)
///    - Close the serial port
///    - Close the log file
///
/// # Examples
///
/// ```bash
/// cargo run --release -- --port /dev/tty.usbmodem101
/// cargo run --release -- plot --input thrust_data.csv
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let (log_writer, _log_guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_writer(log_writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    match &cli.mode {
        Some(Mode::Plot { input, image }) => {
            let input = input
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.logging.output_file));
            let mut plot_config = config.plot.clone();
            if let Some(image) = image {
                plot_config.output_file = image.clone();
            }
            let output = plot::render_log(&input, &plot_config)?;
            println!("Plot saved to {}", output.display());
            Ok(())
        }
        Some(Mode::Run) | None => run(config).await,
    }
}

async fn run(config: Config) -> Result<()> {
    info!("Thrust Stand v{} starting...", env!("CARGO_PKG_VERSION"));

    let transport = serial::open(&config.serial).await?;
    let sink = LogSink::create(&config.logging.output_file)?;

    let session = Arc::new(SessionState::new());
    let guard = TransportGuard::new(transport, config.serial.command_response_delay());

    let acquisition_task = Acquisition::new(session.clone(), sink).spawn(guard.clone());
    tokio::spawn(acquisition::report_status(
        session.clone(),
        Duration::from_millis(config.logging.status_interval_ms),
    ));

    let control = ControlSurface::new(guard, session);
    let operator_console = Console::new(control, &config.logging.output_file, config.plot.clone());
    let mut stdout = std::io::stdout();

    tokio::select! {
        result = operator_console.run(console::spawn_stdin_reader(), &mut stdout) => {
            if let Err(e) = result {
                warn!("Console error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    acquisition_task.shutdown().await?;
    info!("Log saved to {}", config.logging.output_file);
    Ok(())
}
