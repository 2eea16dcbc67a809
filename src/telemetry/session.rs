//! Session state shared between the acquisition loop and the control surface
//!
//! Every field is written by a single party at a time and read by others
//! that tolerate staleness, so plain atomics are enough. The elapsed-time
//! anchor sits behind a short-lived mutex because "set if unset" has to be
//! one step.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{Result, ThrustStandError};

/// Process-wide state for one run
#[derive(Debug)]
pub struct SessionState {
    logging_enabled: AtomicBool,
    session_start_ms: Mutex<Option<i64>>,
    /// `f64` bits of the most recent RPM reading
    latest_rpm: AtomicU64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            logging_enabled: AtomicBool::new(false),
            session_start_ms: Mutex::new(None),
            latest_rpm: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    /// Enable logging and clear the anchor so the next frame starts at 0 ms
    pub fn arm(&self) {
        *self.anchor_slot() = None;
        self.logging_enabled.store(true, Ordering::SeqCst);
    }

    /// Disable logging; the anchor is left for inspection until the next `arm`
    pub fn disarm(&self) {
        self.logging_enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_logging(&self) -> bool {
        self.logging_enabled.load(Ordering::SeqCst)
    }

    /// Timestamp of the first frame logged since the last `arm`
    pub fn session_start_ms(&self) -> Option<i64> {
        *self.anchor_slot()
    }

    /// Anchor the session on `timestamp_ms` if it has no anchor yet, and
    /// return the time elapsed since the anchor
    ///
    /// # Errors
    ///
    /// Returns [`ThrustStandError::InvalidTimestamp`] when the difference
    /// does not fit in an `i64`
    pub fn elapsed_since_start(&self, timestamp_ms: i64) -> Result<i64> {
        let mut slot = self.anchor_slot();
        let start = *slot.get_or_insert(timestamp_ms);
        timestamp_ms
            .checked_sub(start)
            .ok_or_else(|| ThrustStandError::InvalidTimestamp(timestamp_ms.to_string()))
    }

    pub fn latest_rpm(&self) -> f64 {
        f64::from_bits(self.latest_rpm.load(Ordering::Relaxed))
    }

    pub fn set_latest_rpm(&self, rpm: f64) {
        self.latest_rpm.store(rpm.to_bits(), Ordering::Relaxed);
    }

    fn anchor_slot(&self) -> std::sync::MutexGuard<'_, Option<i64>> {
        // The guarded value is a plain Option, so a poisoned lock is still usable
        self.session_start_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let session = SessionState::new();
        assert!(!session.is_logging());
        assert_eq!(session.session_start_ms(), None);
        assert_eq!(session.latest_rpm(), 0.0);
    }

    #[test]
    fn test_first_timestamp_anchors() {
        let session = SessionState::new();
        session.arm();
        assert_eq!(session.elapsed_since_start(4000).unwrap(), 0);
        assert_eq!(session.elapsed_since_start(4050).unwrap(), 50);
        assert_eq!(session.session_start_ms(), Some(4000));
    }

    #[test]
    fn test_arm_clears_anchor() {
        let session = SessionState::new();
        session.arm();
        session.elapsed_since_start(100).unwrap();
        session.disarm();
        assert_eq!(session.session_start_ms(), Some(100));

        session.arm();
        assert_eq!(session.session_start_ms(), None);
        assert_eq!(session.elapsed_since_start(900).unwrap(), 0);
    }

    #[test]
    fn test_elapsed_overflow_is_error() {
        let session = SessionState::new();
        session.arm();
        assert_eq!(session.elapsed_since_start(i64::MIN).unwrap(), 0);

        let result = session.elapsed_since_start(1);
        assert!(matches!(result, Err(ThrustStandError::InvalidTimestamp(ref raw)) if raw == "1"));
        // Anchor is untouched by the failed row
        assert_eq!(session.session_start_ms(), Some(i64::MIN));
        assert_eq!(session.elapsed_since_start(i64::MIN + 5).unwrap(), 5);
    }

    #[test]
    fn test_latest_rpm_roundtrips_f64() {
        let session = SessionState::new();
        session.set_latest_rpm(1234.5);
        assert_eq!(session.latest_rpm(), 1234.5);
    }
}
