//! # Control Module
//!
//! Operator commands for the test stand.
//!
//! Commands go out as newline-terminated text: `PWM:<value>`, `START`, `STOP`.
//! Each one is dispatched on its own task so the caller never waits on
//! serial I/O. A dispatched command has no ordering guarantee relative to
//! acquisition reads: it lands between two reads, whenever the transport
//! lock comes free.

use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{Result, ThrustStandError};
use crate::serial::TransportGuard;
use crate::telemetry::SessionState;

/// Outbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set the ESC pulse width in microseconds
    SetPwm(u16),
    /// Begin a logging session on the controller
    Start,
    /// End the logging session
    Stop,
}

impl Command {
    /// Validate operator text as a PWM command
    ///
    /// # Errors
    ///
    /// Returns [`ThrustStandError::InvalidPwm`] unless the trimmed text is an
    /// unsigned 16-bit integer
    ///
    /// # Examples
    ///
    /// ```
    /// use thrust_stand::control::Command;
    ///
    /// assert_eq!(Command::pwm_from_text("1500").unwrap().to_string(), "PWM:1500");
    /// assert!(Command::pwm_from_text("abc").is_err());
    /// ```
    pub fn pwm_from_text(text: &str) -> Result<Self> {
        text.trim()
            .parse()
            .map(Command::SetPwm)
            .map_err(|_| ThrustStandError::InvalidPwm(text.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetPwm(value) => write!(f, "PWM:{}", value),
            Command::Start => f.write_str("START"),
            Command::Stop => f.write_str("STOP"),
        }
    }
}

/// The operations an operator can trigger
#[derive(Debug, Clone)]
pub struct ControlSurface {
    transport: TransportGuard,
    session: Arc<SessionState>,
}

impl ControlSurface {
    pub fn new(transport: TransportGuard, session: Arc<SessionState>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Validate `text` and send it as a PWM command
    ///
    /// Validation happens before anything touches the transport. Returns the
    /// command as sent along with its dispatch task.
    ///
    /// # Errors
    ///
    /// Returns [`ThrustStandError::InvalidPwm`] for input that is not a pulse width
    pub fn set_pwm(&self, text: &str) -> Result<(Command, JoinHandle<()>)> {
        let command = Command::pwm_from_text(text)?;
        Ok((command, self.dispatch(command)))
    }

    /// Arm logging, clear the elapsed-time anchor and send `START`
    pub fn start_logging(&self) -> JoinHandle<()> {
        self.session.arm();
        info!(
            "Logging armed at {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.dispatch(Command::Start)
    }

    /// Disarm logging and send `STOP`
    pub fn stop_logging(&self) -> JoinHandle<()> {
        self.session.disarm();
        info!("Logging stopped");
        self.dispatch(Command::Stop)
    }

    /// Send a command on a background task and report the outcome there
    ///
    /// The returned handle may be dropped; the task runs to completion anyway.
    pub fn dispatch(&self, command: Command) -> JoinHandle<()> {
        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.send_command(&command.to_string()).await {
                Ok(Some(response)) => info!("Controller: {}", response),
                Ok(None) => warn!("No response from controller to {}", command),
                Err(e) => error!("Failed to send {}: {}", command, e),
            }
        })
    }
}
