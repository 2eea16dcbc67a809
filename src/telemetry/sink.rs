//! CSV log sink
//!
//! One header row, then one row per logged frame. Every row is flushed as
//! soon as it is written so a crash loses at most the row in flight.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use super::frame::FIELD_COUNT;
use crate::error::{Result, ThrustStandError};

/// Column names of the log file, elapsed time first
pub const LOG_HEADER: [&str; FIELD_COUNT] = [
    "Time(ms)",
    "Thrust (kg)",
    "Torque (N*m)",
    "PWM",
    "RPM",
    "Cell2",
    "Cell3",
];

/// Append-only telemetry log
#[derive(Debug)]
pub struct LogSink<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl LogSink<File> {
    /// Create (or truncate) the log file and write the header
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or the header cannot be written
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        info!("Logging telemetry to {}", path.as_ref().display());
        Self::from_writer(file)
    }
}

impl<W: Write> LogSink<W> {
    /// Wrap any writer and write the header
    pub fn from_writer(writer: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(LOG_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    /// Append one row and flush it through to the underlying writer
    pub fn write_row<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(row)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written since the sink was opened
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and release the underlying writer
    pub fn close(mut self) -> Result<W> {
        self.writer.flush()?;
        let rows = self.rows;
        let inner = self
            .writer
            .into_inner()
            .map_err(|e| ThrustStandError::Io(e.into_error()))?;
        info!("Telemetry log closed ({} rows)", rows);
        Ok(inner)
    }
}
