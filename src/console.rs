//! # Operator Console
//!
//! Line-based stand-in for the control panel. Reads commands from stdin on
//! a dedicated thread and drives the [`ControlSurface`].

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::PlotConfig;
use crate::control::ControlSurface;
use crate::plot;

const HELP: &str = "\
Commands:
  pwm <value>   set ESC pulse width (integer, microseconds)
  start         start logging
  stop          stop logging
  status        show live RPM and logging state
  plot          render the log to an image
  help          show this message
  quit          close the log and exit";

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Raw operator text; validated by the control surface
    SetPwm(String),
    Start,
    Stop,
    Status,
    Plot,
    Help,
    Quit,
    Unknown(String),
}

impl ConsoleCommand {
    /// Parse a console line; `None` for a blank line
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "pwm" => ConsoleCommand::SetPwm(rest.to_string()),
            "start" => ConsoleCommand::Start,
            "stop" => ConsoleCommand::Stop,
            "status" => ConsoleCommand::Status,
            "plot" => ConsoleCommand::Plot,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => ConsoleCommand::Unknown(line.to_string()),
        };
        Some(command)
    }
}

/// Whether the console keeps reading after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    Continue,
    Quit,
}

/// Executes console commands
#[derive(Debug)]
pub struct Console {
    control: ControlSurface,
    log_path: PathBuf,
    plot: PlotConfig,
}

impl Console {
    pub fn new(control: ControlSurface, log_path: impl Into<PathBuf>, plot: PlotConfig) -> Self {
        Self {
            control,
            log_path: log_path.into(),
            plot,
        }
    }

    /// Run one command, writing operator-facing replies to `out`
    pub async fn execute<W: Write>(
        &self,
        command: ConsoleCommand,
        out: &mut W,
    ) -> io::Result<ConsoleAction> {
        match command {
            ConsoleCommand::SetPwm(text) => match self.control.set_pwm(&text) {
                Ok((command, _)) => writeln!(out, "Sending {}", command)?,
                Err(e) => writeln!(out, "{}. Enter a valid PWM value.", e)?,
            },
            ConsoleCommand::Start => {
                self.control.start_logging();
                writeln!(out, "Logging started")?;
            }
            ConsoleCommand::Stop => {
                self.control.stop_logging();
                writeln!(out, "Logging stopped")?;
            }
            ConsoleCommand::Status => {
                let session = self.control.session();
                writeln!(
                    out,
                    "RPM: {:.1}  logging: {}",
                    session.latest_rpm(),
                    if session.is_logging() { "on" } else { "off" }
                )?;
            }
            ConsoleCommand::Plot => {
                let input = self.log_path.clone();
                let config = self.plot.clone();
                let rendered =
                    tokio::task::spawn_blocking(move || plot::render_log(&input, &config)).await;
                match rendered {
                    Ok(Ok(path)) => writeln!(out, "Plot saved to {}", path.display())?,
                    Ok(Err(e)) => writeln!(out, "Plot failed: {}", e)?,
                    Err(e) => {
                        error!("Plot task failed: {}", e);
                        writeln!(out, "Plot failed")?;
                    }
                }
            }
            ConsoleCommand::Help => writeln!(out, "{}", HELP)?,
            ConsoleCommand::Quit => return Ok(ConsoleAction::Quit),
            ConsoleCommand::Unknown(line) => {
                writeln!(out, "Unknown command {:?}. Type 'help' for commands.", line)?
            }
        }
        out.flush()?;
        Ok(ConsoleAction::Continue)
    }

    /// Execute lines from `lines` until `quit` or the sender goes away
    pub async fn run<W: Write>(
        &self,
        mut lines: mpsc::Receiver<String>,
        out: &mut W,
    ) -> io::Result<()> {
        writeln!(out, "{}", HELP)?;
        while let Some(line) = lines.recv().await {
            let Some(command) = ConsoleCommand::parse(&line) else {
                continue;
            };
            if self.execute(command, out).await? == ConsoleAction::Quit {
                info!("Quit requested");
                break;
            }
        }
        Ok(())
    }
}

/// Forward stdin lines to a channel from a detached thread
///
/// Blocking stdin reads cannot be cancelled, so they live on a plain thread
/// that simply ends with the process.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
