//! # Thrust Stand Library
//!
//! Log motor test-stand telemetry streamed over a serial link.
//!
//! A background task drains the serial line, parses seven-field telemetry
//! frames and, while logging is armed, appends time-normalized rows to a
//! CSV file. Operator commands (`PWM:<value>`, `START`, `STOP`) share the
//! same link through a [`serial::TransportGuard`] and never stall
//! acquisition. Finished logs can be rendered to a PNG with [`plot`].

pub mod acquisition;
pub mod config;
pub mod console;
pub mod control;
pub mod error;
pub mod plot;
pub mod serial;
pub mod telemetry;
