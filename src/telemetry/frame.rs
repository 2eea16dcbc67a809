//! Inbound telemetry frames
//!
//! The controller streams one frame per line:
//!
//! ```text
//! timestamp_ms,thrust_kg,torque_Nm,pwm,rpm,cell2_v,cell3_v
//! ```
//!
//! A line is a frame only if it has exactly [`FIELD_COUNT`] comma-separated
//! fields. Anything else (command responses, boot banners, noise) is dropped.

use serde::Deserialize;
use std::str::FromStr;

use crate::error::{Result, ThrustStandError};

/// Fields per telemetry line
pub const FIELD_COUNT: usize = 7;

const TIMESTAMP: usize = 0;
const THRUST: usize = 1;
const TORQUE: usize = 2;
const PWM: usize = 3;
const RPM: usize = 4;
const CELL2: usize = 5;
const CELL3: usize = 6;

/// A well-formed line split into its raw fields
///
/// The raw text is kept so that logged rows reproduce the controller's
/// formatting exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    fields: [String; FIELD_COUNT],
}

/// One fully typed telemetry sample
///
/// Also the row type of the log file, where `timestamp_ms` holds the
/// elapsed time since the session anchor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TelemetryRecord {
    #[serde(rename = "Time(ms)")]
    pub timestamp_ms: i64,
    #[serde(rename = "Thrust (kg)")]
    pub thrust_kg: f64,
    #[serde(rename = "Torque (N*m)")]
    pub torque_nm: f64,
    /// Pulse width in microseconds
    #[serde(rename = "PWM")]
    pub pwm: u16,
    #[serde(rename = "RPM")]
    pub rpm: f64,
    #[serde(rename = "Cell2")]
    pub cell2_v: f64,
    #[serde(rename = "Cell3")]
    pub cell3_v: f64,
}

impl TelemetryRecord {
    pub fn time_s(&self) -> f64 {
        self.timestamp_ms as f64 / 1000.0
    }
}

impl Frame {
    /// Split a line into a frame
    ///
    /// Returns `None` for an empty line or a field count other than seven.
    ///
    /// # Examples
    ///
    /// ```
    /// use thrust_stand::telemetry::Frame;
    ///
    /// assert!(Frame::parse("0,1.0,0.1,1500,1000,4.0,4.1").is_some());
    /// assert!(Frame::parse("1,2,3").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        let fields: [String; FIELD_COUNT] = parts
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .try_into()
            .ok()?;

        Some(Self { fields })
    }

    /// Raw text of every field, in wire order
    pub fn fields(&self) -> &[String; FIELD_COUNT] {
        &self.fields
    }

    /// Motor speed, or 0.0 when the field is not a number
    pub fn rpm(&self) -> f64 {
        self.fields[RPM].parse().unwrap_or(0.0)
    }

    /// Controller timestamp in milliseconds
    ///
    /// # Errors
    ///
    /// Returns [`ThrustStandError::InvalidTimestamp`] if the field is not an integer
    pub fn timestamp_ms(&self) -> Result<i64> {
        let raw = &self.fields[TIMESTAMP];
        raw.parse()
            .map_err(|_| ThrustStandError::InvalidTimestamp(raw.clone()))
    }

    /// Log row for this frame: elapsed time followed by fields 1..=6 verbatim
    ///
    /// An RPM field that is not a number is logged as its 0.0 fallback.
    pub fn log_row(&self, elapsed_ms: i64) -> [String; FIELD_COUNT] {
        let mut row = self.fields.clone();
        row[TIMESTAMP] = elapsed_ms.to_string();
        if row[RPM].parse::<f64>().is_err() {
            row[RPM] = "0.0".to_string();
        }
        row
    }

    /// Parse every field into a [`TelemetryRecord`]
    ///
    /// RPM keeps its 0.0 fallback; every other field must parse as its
    /// column type, so any row built from this frame reads back as a record.
    ///
    /// # Errors
    ///
    /// * [`ThrustStandError::InvalidTimestamp`] for a non-integer timestamp
    /// * [`ThrustStandError::InvalidField`] naming the first other bad field
    pub fn to_record(&self) -> Result<TelemetryRecord> {
        Ok(TelemetryRecord {
            timestamp_ms: self.timestamp_ms()?,
            thrust_kg: self.field(THRUST, "thrust")?,
            torque_nm: self.field(TORQUE, "torque")?,
            pwm: self.field(PWM, "pwm")?,
            rpm: self.rpm(),
            cell2_v: self.field(CELL2, "cell2")?,
            cell3_v: self.field(CELL3, "cell3")?,
        })
    }

    fn field<T: FromStr>(&self, idx: usize, name: &'static str) -> Result<T> {
        let raw = &self.fields[idx];
        raw.parse().map_err(|_| ThrustStandError::InvalidField {
            field: name,
            value: raw.clone(),
        })
    }
}
