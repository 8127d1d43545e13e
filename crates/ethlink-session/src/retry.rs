use std::fmt;
use std::time::Duration;

use ethlink_frame::is_filler;
use ethlink_transport::{FrameTransport, RecvOutcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, SessionError};

/// Where in a session a blocking receive is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Handshake,
    SizeExchange,
    Chunk(usize),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Handshake => write!(f, "handshake"),
            Stage::SizeExchange => write!(f, "size exchange"),
            Stage::Chunk(index) => write!(f, "chunk {index}"),
        }
    }
}

/// Delay inserted between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Wait the same delay after every failure.
    Fixed { delay_ms: u64 },
    /// Double the delay after every failure, starting at `initial_ms` and
    /// capped at `max_ms`.
    Exponential { initial_ms: u64, max_ms: u64 },
}

impl Backoff {
    /// Delay after the `failures`-th consecutive failure (1-based).
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { initial_ms, max_ms } => {
                let shift = failures.saturating_sub(1).min(63);
                let grown = initial_ms.saturating_mul(1u64 << shift);
                Duration::from_millis(grown.min(max_ms))
            }
        }
    }
}

/// How blocking receives react to timeouts, bad checksums and stale frames.
///
/// The default retries forever without delay, which is how the protocol
/// behaves on a healthy point-to-point link. Bound it when a broken link
/// must surface as an error instead of blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per blocking receive, the first included. `None` never gives up.
    pub max_attempts: Option<u32>,
    /// Delay between attempts.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Retry forever, immediately.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Give up after `max_attempts` attempts.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff: Backoff::None,
        }
    }

    /// Replace the backoff.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(SessionError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn start(&self, stage: Stage) -> Retrier {
        Retrier {
            policy: *self,
            stage,
            failures: 0,
        }
    }
}

/// Attempt bookkeeping for one blocking receive.
#[derive(Debug)]
pub(crate) struct Retrier {
    policy: RetryPolicy,
    stage: Stage,
    failures: u32,
}

impl Retrier {
    /// Record a failed attempt, then back off. Errors once the policy is spent.
    pub(crate) fn failed(&mut self) -> Result<()> {
        self.failures = self.failures.saturating_add(1);
        if let Some(max) = self.policy.max_attempts {
            if self.failures >= max {
                return Err(SessionError::RetriesExhausted {
                    stage: self.stage,
                    attempts: self.failures,
                });
            }
        }
        let delay = self.policy.backoff.delay(self.failures);
        if !delay.is_zero() {
            trace!(stage = %self.stage, ?delay, "backing off");
            std::thread::sleep(delay);
        }
        Ok(())
    }

    /// Attempts made so far, including the one in flight.
    pub(crate) fn attempts(&self) -> u32 {
        self.failures.saturating_add(1)
    }
}

/// Counters for receive attempts that did not deliver the expected frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Receives that saw no frame within the timeout.
    pub timeouts: u64,
    /// Frames rejected by the link's checksum.
    pub checksum_failures: u64,
    /// Frames discarded as leftovers: too short for the awaited frame, or a
    /// duplicate handshake filler.
    pub stale_frames: u64,
}

impl LinkStats {
    /// Total failed attempts.
    pub fn retries(&self) -> u64 {
        self.timeouts + self.checksum_failures + self.stale_frames
    }

    pub(crate) fn record(&mut self, outcome: RecvOutcome) {
        match outcome {
            RecvOutcome::TimedOut => self.timeouts += 1,
            RecvOutcome::ChecksumInvalid => self.checksum_failures += 1,
            RecvOutcome::Received { .. } => self.stale_frames += 1,
        }
    }
}

/// Receive into `buf` until a frame of at least `min_len` bytes arrives.
///
/// With `skip_filler` set, frames carrying the handshake filler marker are
/// discarded as well. `buf` must then span the whole frame for the marker to
/// be visible.
///
/// Returns the on-wire length of the accepted frame.
pub(crate) fn receive_until<T: FrameTransport>(
    transport: &mut T,
    buf: &mut [u8],
    min_len: usize,
    skip_filler: bool,
    timeout_units: u32,
    retrier: &mut Retrier,
    stats: &mut LinkStats,
) -> Result<usize> {
    loop {
        let outcome = transport.attempt_receive(buf, timeout_units)?;
        match outcome {
            RecvOutcome::Received { len }
                if skip_filler && is_filler(&buf[..len.min(buf.len())]) =>
            {
                debug!(stage = %retrier.stage, len, "discarding duplicate filler");
            }
            RecvOutcome::Received { len } if len >= min_len => return Ok(len),
            RecvOutcome::Received { len } => {
                debug!(stage = %retrier.stage, len, min_len, "discarding stale frame");
            }
            RecvOutcome::ChecksumInvalid => {
                debug!(stage = %retrier.stage, attempt = retrier.attempts(), "bad checksum; retrying");
            }
            RecvOutcome::TimedOut => {
                trace!(stage = %retrier.stage, attempt = retrier.attempts(), "receive timed out");
            }
        }
        stats.record(outcome);
        retrier.failed()?;
    }
}
