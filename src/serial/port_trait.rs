//! Trait abstraction for line-oriented serial I/O to enable testing

use async_trait::async_trait;
use std::io;

/// Trait for a newline-delimited duplex text channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LineTransport: Send {
    /// Write `line` followed by a newline and flush
    async fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Read one line, trimmed of surrounding whitespace.
    ///
    /// Returns `Ok(None)` when the read timeout elapses before a full line arrives.
    async fn read_line(&mut self) -> io::Result<Option<String>>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted reply for one `read_line` call
    #[derive(Debug, Clone)]
    pub enum ScriptedRead {
        Line(String),
        Timeout,
        Error(io::ErrorKind),
    }

    /// Mock transport that replays scripted reads and records writes
    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        pub reads: Arc<Mutex<VecDeque<ScriptedRead>>>,
        pub written: Arc<Mutex<Vec<String>>>,
        pub reply: Arc<Mutex<Option<String>>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_lines(lines: &[&str]) -> Self {
            let transport = Self::new();
            for line in lines {
                transport.push_line(line);
            }
            transport
        }

        pub fn push_line(&self, line: &str) {
            self.push(ScriptedRead::Line(line.to_string()));
        }

        pub fn push(&self, read: ScriptedRead) {
            self.reads.lock().unwrap().push_back(read);
        }

        /// Queue `line` at the front of the script when the next write arrives
        pub fn reply_once(&self, line: &str) {
            *self.reply.lock().unwrap() = Some(line.to_string());
        }

        pub fn written(&self) -> Vec<String> {
            self.written.lock().unwrap().clone()
        }

        pub fn remaining_reads(&self) -> usize {
            self.reads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LineTransport for ScriptedTransport {
        async fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.written.lock().unwrap().push(line.to_string());
            if let Some(reply) = self.reply.lock().unwrap().take() {
                self.reads.lock().unwrap().push_front(ScriptedRead::Line(reply));
            }
            Ok(())
        }

        async fn read_line(&mut self) -> io::Result<Option<String>> {
            // An exhausted script behaves like an idle port
            let next = self.reads.lock().unwrap().pop_front();
            match next {
                Some(ScriptedRead::Line(line)) => Ok(Some(line)),
                Some(ScriptedRead::Error(kind)) => Err(io::Error::new(kind, "Mock read error")),
                Some(ScriptedRead::Timeout) | None => {
                    tokio::task::yield_now().await;
                    Ok(None)
                }
            }
        }
    }
}
