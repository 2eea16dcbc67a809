//! Exclusive access to the single serial channel
//!
//! Both the acquisition loop and command dispatch go through a
//! [`TransportGuard`]. Each operation holds the lock for one complete
//! exchange, so a command can land between two acquisition reads but
//! never inside one. The lock is released when the guard value drops,
//! which covers early returns and errors.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::port_trait::LineTransport;
use crate::error::{Result, ThrustStandError};

type SharedTransport = Arc<Mutex<Option<Box<dyn LineTransport>>>>;

/// Cloneable handle to the shared transport
#[derive(Clone)]
pub struct TransportGuard {
    inner: SharedTransport,
    response_delay: Duration,
}

impl std::fmt::Debug for TransportGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportGuard")
            .field("response_delay", &self.response_delay)
            .finish_non_exhaustive()
    }
}

impl TransportGuard {
    /// Wrap a transport
    ///
    /// # Arguments
    ///
    /// * `transport` - The open channel to the controller
    /// * `response_delay` - Wait between writing a command and reading its reply
    pub fn new<T: LineTransport + 'static>(transport: T, response_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::new(transport)))),
            response_delay,
        }
    }

    /// Read one line under the lock
    ///
    /// # Errors
    ///
    /// * [`ThrustStandError::TransportClosed`] after [`close`](Self::close)
    /// * [`ThrustStandError::Io`] on a failed read
    pub async fn read_line(&self) -> Result<Option<String>> {
        let mut slot = self.inner.lock().await;
        let transport = slot.as_mut().ok_or(ThrustStandError::TransportClosed)?;
        Ok(transport.read_line().await?)
    }

    /// Write a command, wait for the controller, and read one response line
    ///
    /// The lock is held for the whole exchange so the response cannot be
    /// consumed by the acquisition loop. `Ok(None)` means no response arrived.
    pub async fn send_command(&self, command: &str) -> Result<Option<String>> {
        let mut slot = self.inner.lock().await;
        let transport = slot.as_mut().ok_or(ThrustStandError::TransportClosed)?;

        transport.write_line(command).await?;
        tokio::time::sleep(self.response_delay).await;
        Ok(transport.read_line().await?)
    }

    /// Drop the transport, closing the port
    ///
    /// Waits for any in-flight exchange to finish. Returns `false` if the
    /// transport was already closed.
    pub async fn close(&self) -> bool {
        let closed = self.inner.lock().await.take().is_some();
        if closed {
            debug!("Transport closed");
        }
        closed
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}
