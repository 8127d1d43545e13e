use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use ethlink_transport::{FrameTransport, RecvOutcome, Result};

/// Deterministic payload bytes.
pub(crate) fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

/// What a [`FaultyLink`] does on one receive.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Fault {
    /// Receive normally.
    Pass,
    /// Report this outcome without touching the inner link.
    Outcome(RecvOutcome),
    /// Receive normally, then flip one byte of the delivered payload.
    Corrupt { byte: usize },
}

/// Wraps a link and scripts the outcome of successive receives.
/// Once the script runs out every receive passes through.
#[derive(Debug)]
pub(crate) struct FaultyLink<T> {
    inner: T,
    script: VecDeque<Fault>,
    transmitted: usize,
    first_transmit_delay: Option<Duration>,
}

impl<T> FaultyLink<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner,
            script: VecDeque::new(),
            transmitted: 0,
            first_transmit_delay: None,
        }
    }

    /// Hold back the first outgoing frame by `delay`.
    pub(crate) fn delay_first_transmit(mut self, delay: Duration) -> Self {
        self.first_transmit_delay = Some(delay);
        self
    }

    pub(crate) fn then(mut self, fault: Fault) -> Self {
        self.script.push_back(fault);
        self
    }

    pub(crate) fn repeat(mut self, n: usize, fault: Fault) -> Self {
        self.script.extend(std::iter::repeat(fault).take(n));
        self
    }

    pub(crate) fn pass(self, n: usize) -> Self {
        self.repeat(n, Fault::Pass)
    }

    pub(crate) fn transmitted(&self) -> usize {
        self.transmitted
    }
}

impl<T: FrameTransport> FrameTransport for FaultyLink<T> {
    fn max_payload(&self) -> usize {
        self.inner.max_payload()
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        if let Some(delay) = self.first_transmit_delay.take() {
            thread::sleep(delay);
        }
        self.transmitted += 1;
        self.inner.transmit(frame)
    }

    fn attempt_receive(&mut self, buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome> {
        match self.script.pop_front().unwrap_or(Fault::Pass) {
            Fault::Pass => self.inner.attempt_receive(buf, timeout_units),
            Fault::Outcome(outcome) => Ok(outcome),
            Fault::Corrupt { byte } => {
                let outcome = self.inner.attempt_receive(buf, timeout_units)?;
                if let RecvOutcome::Received { len } = outcome {
                    if byte < len.min(buf.len()) {
                        buf[byte] ^= 0xFF;
                    }
                }
                Ok(outcome)
            }
        }
    }
}

/// A link where nothing ever arrives. Records every wait.
#[derive(Debug, Default)]
pub(crate) struct Silent {
    pub waited: Vec<u32>,
    pub transmitted: usize,
}

impl FrameTransport for Silent {
    fn max_payload(&self) -> usize {
        1500
    }

    fn transmit(&mut self, _frame: &[u8]) -> Result<()> {
        self.transmitted += 1;
        Ok(())
    }

    fn attempt_receive(&mut self, _buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome> {
        self.waited.push(timeout_units);
        Ok(RecvOutcome::TimedOut)
    }
}
