use std::fmt;

use ethlink_transport::FrameTransport;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::retry::{receive_until, Stage};
use crate::session::TransferSession;

/// Which side of the rendezvous a peer plays.
///
/// The initiator keeps announcing itself until answered and then transmits
/// first. The responder waits to be found. Peers agree on roles out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Initiator,
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "initiator"),
            Role::Responder => write!(f, "responder"),
        }
    }
}

impl<T: FrameTransport> TransferSession<T> {
    /// Announce with a filler frame until the peer answers with one.
    ///
    /// Returns the number of announcements it took.
    pub(crate) fn sync_as_initiator(&mut self) -> Result<u32> {
        let min_frame = self.config.frame.min_frame;
        let mut retrier = self.config.retry.start(Stage::Handshake);
        loop {
            self.send_filler()?;
            // A single receive per announcement: a missed answer means
            // announcing again, not waiting longer.
            let outcome = self
                .transport
                .attempt_receive(&mut self.scratch.rx[..min_frame], self.config.timeout_units)?;
            if outcome.is_received() {
                let attempts = retrier.attempts();
                debug!(attempts, "handshake answered");
                return Ok(attempts);
            }
            self.stats.record(outcome);
            retrier.failed()?;
        }
    }

    /// Wait for an announcement, then answer it with one filler frame.
    pub(crate) fn sync_as_responder(&mut self) -> Result<u32> {
        let min_frame = self.config.frame.min_frame;
        let mut retrier = self.config.retry.start(Stage::Handshake);
        receive_until(
            &mut self.transport,
            &mut self.scratch.rx[..min_frame],
            min_frame,
            false,
            self.config.timeout_units,
            &mut retrier,
            &mut self.stats,
        )?;
        self.send_filler()?;
        let attempts = retrier.attempts();
        debug!(attempts, "handshake answered");
        Ok(attempts)
    }
}
