//! # Telemetry Module
//!
//! Handles telemetry frames from the test stand and their CSV log.
//!
//! This module handles:
//! - Splitting inbound lines into seven-field frames
//! - Tracking logging mode, the elapsed-time anchor and live RPM
//! - Writing flushed rows to the CSV log

pub mod frame;
pub mod session;
pub mod sink;

pub use frame::{Frame, TelemetryRecord, FIELD_COUNT};
pub use session::SessionState;
pub use sink::{LogSink, LOG_HEADER};
