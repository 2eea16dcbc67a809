//! # Acquisition Module
//!
//! The long-lived task that drains the serial link.
//!
//! Each cycle takes the transport lock for one line read, then processes
//! the line outside the lock:
//! - blank lines and lines without seven fields are dropped
//! - the RPM field updates the live status on every frame
//! - while logging is armed the frame is anchored, written and flushed
//!
//! Nothing on this path is fatal. The loop only ends once shutdown has
//! closed the transport, and then hands the log sink back for closing.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::error::{Result, ThrustStandError};
use crate::serial::TransportGuard;
use crate::telemetry::{Frame, LogSink, SessionState};

/// Pause after a failed read before the next cycle
const READ_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// What happened to one inbound line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineOutcome {
    /// Blank line or read timeout
    Empty,
    /// Not a seven-field frame
    Malformed,
    /// Well-formed frame seen while logging is off
    Observed { rpm: f64 },
    /// Frame written to the log
    Logged { elapsed_ms: i64 },
}

/// Line processor that owns the log sink
#[derive(Debug)]
pub struct Acquisition<W: Write> {
    session: Arc<SessionState>,
    sink: LogSink<W>,
}

impl<W: Write> Acquisition<W> {
    pub fn new(session: Arc<SessionState>, sink: LogSink<W>) -> Self {
        Self { session, sink }
    }

    /// Process one line from the transport
    ///
    /// # Errors
    ///
    /// Only armed frames can fail: a field that does not parse as its column
    /// type, an elapsed time out of range, or a failed write to the log. No
    /// partial row is written in any case.
    pub fn process_line(&mut self, line: &str) -> Result<LineOutcome> {
        if line.trim().is_empty() {
            return Ok(LineOutcome::Empty);
        }

        let Some(frame) = Frame::parse(line) else {
            trace!("Ignoring non-telemetry line: {:?}", line);
            return Ok(LineOutcome::Malformed);
        };

        let rpm = frame.rpm();
        self.session.set_latest_rpm(rpm);
        debug!("Current RPM: {:.1}", rpm);

        if !self.session.is_logging() {
            return Ok(LineOutcome::Observed { rpm });
        }

        let record = frame.to_record()?;
        let elapsed_ms = self.session.elapsed_since_start(record.timestamp_ms)?;
        self.sink.write_row(frame.log_row(elapsed_ms))?;
        debug!("DATA: {}", line);

        Ok(LineOutcome::Logged { elapsed_ms })
    }

    /// Read and process lines until the transport is closed
    pub async fn run(mut self, transport: TransportGuard) -> LogSink<W> {
        info!("Acquisition started");

        loop {
            let line = match transport.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(ThrustStandError::TransportClosed) => break,
                Err(e) => {
                    error!("Error reading serial data: {}", e);
                    tokio::time::sleep(READ_ERROR_PAUSE).await;
                    continue;
                }
            };

            if let Err(e) = self.process_line(&line) {
                error!("Dropped frame {:?}: {}", line, e);
            }
        }

        info!("Acquisition stopped ({} rows logged)", self.sink.rows());
        self.sink
    }

    /// Spawn [`run`](Self::run) as a background task
    pub fn spawn(self, transport: TransportGuard) -> AcquisitionTask<W>
    where
        W: Send + 'static,
    {
        let handle = tokio::spawn(self.run(transport.clone()));
        AcquisitionTask { transport, handle }
    }
}

/// Handle to the running acquisition loop
#[derive(Debug)]
pub struct AcquisitionTask<W: Write> {
    transport: TransportGuard,
    handle: JoinHandle<LogSink<W>>,
}

impl<W: Write> AcquisitionTask<W> {
    /// Close the transport, wait for the loop to finish its current cycle,
    /// then close the log sink
    ///
    /// Consumes the handle, so the sink and transport are closed exactly once.
    pub async fn shutdown(self) -> Result<W> {
        self.transport.close().await;

        let sink = self.handle.await.map_err(|e| {
            ThrustStandError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        sink.close()
    }
}

/// Publish the live RPM at a fixed interval
///
/// Only reports when the value has changed since the last report.
pub async fn report_status(session: Arc<SessionState>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    let mut last_reported = None;

    loop {
        ticker.tick().await;
        let rpm = session.latest_rpm();
        if rpm_changed(last_reported, rpm) {
            info!(
                "Current RPM: {:.1}{}",
                rpm,
                if session.is_logging() { " (logging)" } else { "" }
            );
            last_reported = Some(rpm.to_bits());
        }
    }
}

/// Compare bitwise so a NaN reading is only reported once
fn rpm_changed(last_reported: Option<u64>, rpm: f64) -> bool {
    last_reported != Some(rpm.to_bits())
}
