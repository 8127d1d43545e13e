use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{units_to_duration, FrameTransport, RecvOutcome, DEFAULT_TICK};

/// Maximum payload of an in-memory link, matching an Ethernet payload.
pub const DEFAULT_MEMORY_MAX_PAYLOAD: usize = 1500;

/// One end of a lossless in-process link.
///
/// Frames are queued in order and never corrupted, so receives only ever
/// report `Received` or `TimedOut`.
#[derive(Debug)]
pub struct MemoryLink {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    tick: Duration,
    max_payload: usize,
}

impl MemoryLink {
    /// Create a connected pair of link ends.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_max_payload(DEFAULT_MEMORY_MAX_PAYLOAD)
    }

    /// Create a connected pair with an explicit payload limit.
    pub fn pair_with_max_payload(max_payload: usize) -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::channel();
        let (right_tx, left_rx) = mpsc::channel();
        let left = Self {
            tx: left_tx,
            rx: left_rx,
            tick: DEFAULT_TICK,
            max_payload,
        };
        let right = Self {
            tx: right_tx,
            rx: right_rx,
            tick: DEFAULT_TICK,
            max_payload,
        };
        (left, right)
    }

    /// Override the wall-clock length of one timeout unit.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Wall-clock length of one timeout unit.
    pub fn tick(&self) -> Duration {
        self.tick
    }
}

impl FrameTransport for MemoryLink {
    fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() > self.max_payload {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                max: self.max_payload,
            });
        }
        trace!(len = frame.len(), "memory link transmit");
        self.tx
            .send(frame.to_vec())
            .map_err(|_| TransportError::Disconnected)
    }

    fn attempt_receive(&mut self, buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome> {
        match self
            .rx
            .recv_timeout(units_to_duration(self.tick, timeout_units))
        {
            Ok(frame) => {
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                trace!(len = frame.len(), "memory link receive");
                Ok(RecvOutcome::Received { len: frame.len() })
            }
            Err(RecvTimeoutError::Timeout) => Ok(RecvOutcome::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_cross_in_order() {
        let (mut left, mut right) = MemoryLink::pair();
        left.transmit(b"one").unwrap();
        left.transmit(b"two").unwrap();

        let mut buf = [0u8; 3];
        assert_eq!(
            right.attempt_receive(&mut buf, 10).unwrap(),
            RecvOutcome::Received { len: 3 }
        );
        assert_eq!(&buf, b"one");
        assert_eq!(
            right.attempt_receive(&mut buf, 10).unwrap(),
            RecvOutcome::Received { len: 3 }
        );
        assert_eq!(&buf, b"two");
    }

    #[test]
    fn short_buffer_gets_prefix() {
        let (mut left, mut right) = MemoryLink::pair();
        left.transmit(b"abcdef").unwrap();

        let mut buf = [0u8; 2];
        let outcome = right.attempt_receive(&mut buf, 10).unwrap();
        assert_eq!(outcome, RecvOutcome::Received { len: 6 });
        assert_eq!(&buf, b"ab");
    }

    #[test]
    fn empty_queue_times_out() {
        let (_left, mut right) = MemoryLink::pair();
        let mut buf = [0u8; 4];
        assert_eq!(
            right.attempt_receive(&mut buf, 1).unwrap(),
            RecvOutcome::TimedOut
        );
    }

    #[test]
    fn dropped_peer_reports_disconnect() {
        let (left, mut right) = MemoryLink::pair();
        drop(left);
        let mut buf = [0u8; 4];
        assert!(matches!(
            right.attempt_receive(&mut buf, 1),
            Err(TransportError::Disconnected)
        ));
        assert!(matches!(
            right.transmit(b"x"),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn oversized_frame_rejected() {
        let (mut left, _right) = MemoryLink::pair_with_max_payload(8);
        assert!(matches!(
            left.transmit(&[0u8; 9]),
            Err(TransportError::FrameTooLarge { len: 9, max: 8 })
        ));
    }

    #[test]
    fn tick_scales_the_timeout() {
        let (_left, right) = MemoryLink::pair();
        assert_eq!(right.tick(), DEFAULT_TICK);

        let mut right = right.with_tick(Duration::from_millis(20));
        let mut buf = [0u8; 4];
        let started = std::time::Instant::now();
        assert_eq!(
            right.attempt_receive(&mut buf, 3).unwrap(),
            RecvOutcome::TimedOut
        );
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn works_across_threads() {
        let (mut left, mut right) = MemoryLink::pair();
        let echo = std::thread::spawn(move || {
            let mut buf = [0u8; 5];
            let outcome = right.attempt_receive(&mut buf, 1000).unwrap();
            assert!(outcome.is_received());
            right.transmit(&buf).unwrap();
        });

        left.transmit(b"hello").unwrap();
        let mut buf = [0u8; 5];
        assert!(left.attempt_receive(&mut buf, 1000).unwrap().is_received());
        assert_eq!(&buf, b"hello");
        echo.join().unwrap();
    }
}
