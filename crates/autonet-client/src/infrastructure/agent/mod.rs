//! Messaging agent adapters.
//!
//! The broadcaster hands the accepted rendezvous URI to a
//! [`MessagingAgent`].  This crate does not embed a messaging client, so the
//! binary uses [`UriPrinter`], which writes the URI as a single line for the
//! process that owns the real messaging connection.
//!
//! - **`recording`** – [`recording::RecordingAgent`], an in-memory agent for
//!   tests and embedding.

pub mod recording;

use std::io::Write;

use tracing::info;

use crate::application::discovery::{AgentError, MessagingAgent};

/// Agent that publishes the rendezvous URI by writing it to `W`.
#[derive(Debug)]
pub struct UriPrinter<W> {
    out: W,
    started: Option<String>,
}

impl<W: Write + Send> UriPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out, started: None }
    }

    /// URI written by the last successful `start`.
    pub fn started_uri(&self) -> Option<&str> {
        self.started.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> MessagingAgent for UriPrinter<W> {
    fn start(&mut self, uri: &str) -> Result<(), AgentError> {
        writeln!(self.out, "{uri}")
            .and_then(|()| self.out.flush())
            .map_err(|e| AgentError::Start(e.to_string()))?;
        info!("messaging uri published: {uri}");
        self.started = Some(uri.to_string());
        Ok(())
    }
}
