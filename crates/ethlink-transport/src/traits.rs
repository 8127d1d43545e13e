use std::time::Duration;

use crate::error::Result;

/// Default wall-clock length of one timeout unit.
pub const DEFAULT_TICK: Duration = Duration::from_millis(1);

/// Result of a single receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    /// A frame arrived intact. `len` is its on-wire payload length, which
    /// may differ from the caller's buffer length.
    Received { len: usize },
    /// No frame arrived within the timeout.
    TimedOut,
    /// A frame arrived but failed its checksum. The link has already
    /// acknowledged it at its own level.
    ChecksumInvalid,
}

impl RecvOutcome {
    /// Returns true for [`RecvOutcome::Received`].
    pub fn is_received(&self) -> bool {
        matches!(self, RecvOutcome::Received { .. })
    }
}

/// A link that moves discrete, size-bounded frames between two fixed peers.
///
/// Frames may be lost, corrupted or delayed. Implementations block the
/// calling thread; there is no internal queueing guarantee beyond what the
/// underlying medium offers.
pub trait FrameTransport {
    /// Largest payload accepted by [`FrameTransport::transmit`].
    fn max_payload(&self) -> usize;

    /// Send one frame, blocking until the link accepts it.
    fn transmit(&mut self, frame: &[u8]) -> Result<()>;

    /// Wait up to `timeout_units` ticks for one frame and copy up to
    /// `buf.len()` bytes of its payload into `buf`.
    fn attempt_receive(&mut self, buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome>;
}

impl<T: FrameTransport + ?Sized> FrameTransport for &mut T {
    fn max_payload(&self) -> usize {
        (**self).max_payload()
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        (**self).transmit(frame)
    }

    fn attempt_receive(&mut self, buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome> {
        (**self).attempt_receive(buf, timeout_units)
    }
}

impl<T: FrameTransport + ?Sized> FrameTransport for Box<T> {
    fn max_payload(&self) -> usize {
        (**self).max_payload()
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        (**self).transmit(frame)
    }

    fn attempt_receive(&mut self, buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome> {
        (**self).attempt_receive(buf, timeout_units)
    }
}

/// Convert a number of timeout units into wall time, never returning zero.
///
/// Socket read timeouts reject a zero duration, so a zero-unit wait is
/// rounded up to a single tick.
pub fn units_to_duration(tick: Duration, timeout_units: u32) -> Duration {
    tick.saturating_mul(timeout_units.max(1))
}
