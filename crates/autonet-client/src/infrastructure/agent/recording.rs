//! In-memory messaging agent.
//!
//! Records every URI it is started with instead of connecting anywhere.
//! Clones share the same record, so a test can keep one clone while the
//! broadcaster owns the other.
//!
//! # `should_fail` flag
//!
//! Set `should_fail = true` to make `start` return an error, which exercises
//! the broadcaster's failure path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::application::discovery::{AgentError, MessagingAgent};

#[derive(Debug, Clone, Default)]
pub struct RecordingAgent {
    /// URIs passed to `start`, in call order.
    pub started: Arc<Mutex<Vec<String>>>,
    pub should_fail: bool,
}

impl RecordingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned record is still a complete list of pushes.
    fn record(&self) -> MutexGuard<'_, Vec<String>> {
        self.started.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the recorded URIs.
    pub fn uris(&self) -> Vec<String> {
        self.record().clone()
    }
}

impl MessagingAgent for RecordingAgent {
    fn start(&mut self, uri: &str) -> Result<(), AgentError> {
        self.record().push(uri.to_string());
        if self.should_fail {
            return Err(AgentError::Start("injected failure".to_string()));
        }
        Ok(())
    }
}
