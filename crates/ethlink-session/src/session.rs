use std::fmt;
use std::time::Instant;

use bytes::BytesMut;
use ethlink_frame::{decode_size, encode_filler, encode_size_frame, size_field};
use ethlink_transport::{FrameTransport, RecvOutcome};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::handshake::Role;
use crate::retry::{receive_until, LinkStats, Stage};

/// Where a session is in its protocol run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Handshaking,
    SizeExchange,
    Transferring { chunk: usize },
    Done,
}

/// Which way the payload moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => write!(f, "send"),
            Direction::Receive => write!(f, "receive"),
        }
    }
}

/// Snapshot passed to the progress callback after every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Index of the chunk just completed.
    pub chunk: usize,
    /// Chunks in the whole transfer.
    pub chunks: usize,
    /// Payload bytes completed so far.
    pub bytes: usize,
    /// Payload size.
    pub total: usize,
}

/// Summary of one completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub direction: Direction,
    pub role: Role,
    /// Payload size, announced or given.
    pub total_size: usize,
    /// Payload bytes moved.
    pub bytes: usize,
    pub chunks: usize,
    /// Echoed bytes that differed from what was sent. Always zero on the
    /// receive side.
    pub mismatches: u64,
    /// Receive attempts the handshake took.
    pub handshake_attempts: u32,
    #[serde(flatten)]
    pub link: LinkStats,
    pub elapsed_ms: u64,
}

/// Outcome of [`TransferSession::recv_fixed`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum RecvStatus {
    /// The sender showed up and the payload was received.
    Received(TransferReport),
    /// Nothing arrived within the rendezvous wait.
    NoData,
    /// A frame arrived within the wait but failed its checksum.
    InvalidCrc,
}

/// Counters produced by one run of the chunk engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ChunkOutcome {
    pub bytes: usize,
    pub chunks: usize,
    pub mismatches: u64,
}

/// Buffers reused across frames.
#[derive(Debug)]
pub(crate) struct Scratch {
    /// Receive buffer for echoes and control frames.
    pub rx: Vec<u8>,
    /// Outgoing control frames.
    pub tx: BytesMut,
    /// Padded copies of short chunks.
    pub pad: BytesMut,
}

type ProgressFn = Box<dyn FnMut(&Progress) + Send>;

/// One end of a point-to-point transfer over a [`FrameTransport`].
///
/// The session owns the transport and every buffer it needs. Each entry
/// point runs a complete protocol exchange: handshake, optional size
/// negotiation, then the chunked lockstep transfer.
///
/// ```no_run
/// use ethlink_session::{Role, SessionConfig, TransferSession};
/// use ethlink_transport::MemoryLink;
///
/// let (a, _b) = MemoryLink::pair();
/// let mut sender = TransferSession::new(a, Role::Initiator, SessionConfig::default())?;
/// let report = sender.send_variable(b"hello")?;
/// assert_eq!(report.bytes, 5);
/// # Ok::<(), ethlink_session::SessionError>(())
/// ```
pub struct TransferSession<T> {
    pub(crate) transport: T,
    pub(crate) role: Role,
    pub(crate) config: SessionConfig,
    pub(crate) scratch: Scratch,
    pub(crate) state: SessionState,
    pub(crate) stats: LinkStats,
    pub(crate) progress: Option<ProgressFn>,
}

impl<T: FrameTransport> TransferSession<T> {
    /// Create a session. Fails if `config` is invalid or its frame geometry
    /// does not fit the transport.
    pub fn new(transport: T, role: Role, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        config.frame.validate_for(transport.max_payload())?;

        let rx_len = config.frame.max_chunk.max(config.frame.min_frame);
        Ok(Self {
            transport,
            role,
            scratch: Scratch {
                rx: vec![0; rx_len],
                tx: BytesMut::with_capacity(config.frame.min_frame),
                pad: BytesMut::with_capacity(config.frame.min_frame),
            },
            config,
            state: SessionState::Idle,
            stats: LinkStats::default(),
            progress: None,
        })
    }

    /// Install a callback fired after every chunk.
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: FnMut(&Progress) + Send + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give the transport back.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send a payload whose size the receiver already knows.
    pub fn send_fixed(&mut self, data: &[u8]) -> Result<TransferReport> {
        self.require(Role::Initiator, "send_fixed")?;
        let started = self.begin(Direction::Send, data.len());

        let handshake_attempts = self.sync_as_initiator()?;
        let outcome = self.send_chunks(data, data.len())?;

        Ok(self.finish(Direction::Send, data.len(), handshake_attempts, outcome, started))
    }

    /// Receive `size` bytes into the front of `out`.
    ///
    /// The wait for the sender is a single receive of `timeout_units`: if it
    /// expires or delivers a corrupt frame the call returns
    /// [`RecvStatus::NoData`] or [`RecvStatus::InvalidCrc`] without
    /// answering, so the caller can poll. Once the sender is seen the
    /// transfer runs to completion under the session's retry policy.
    ///
    /// A frame shorter than `min_frame` cannot be an announcement; it is
    /// counted as stale and reported as [`RecvStatus::NoData`].
    pub fn recv_fixed(
        &mut self,
        out: &mut [u8],
        size: usize,
        timeout_units: u32,
    ) -> Result<RecvStatus> {
        self.require(Role::Responder, "recv_fixed")?;
        if size > out.len() {
            return Err(SessionError::BufferTooSmall {
                needed: size,
                capacity: out.len(),
            });
        }
        let started = self.begin(Direction::Receive, size);

        let min_frame = self.config.frame.min_frame;
        let outcome = self
            .transport
            .attempt_receive(&mut self.scratch.rx[..min_frame], timeout_units)?;
        match outcome {
            RecvOutcome::Received { len } if len >= min_frame => {}
            RecvOutcome::Received { len } => {
                self.stats.record(outcome);
                self.state = SessionState::Idle;
                debug!(len, min_frame, "rendezvous frame too short");
                return Ok(RecvStatus::NoData);
            }
            RecvOutcome::TimedOut => {
                self.state = SessionState::Idle;
                debug!(timeout_units, "no sender within rendezvous wait");
                return Ok(RecvStatus::NoData);
            }
            RecvOutcome::ChecksumInvalid => {
                self.state = SessionState::Idle;
                debug!("rendezvous frame failed its checksum");
                return Ok(RecvStatus::InvalidCrc);
            }
        }
        self.send_filler()?;

        let outcome = self.recv_chunks(&mut out[..size], size)?;
        Ok(RecvStatus::Received(self.finish(
            Direction::Receive,
            size,
            1,
            outcome,
            started,
        )))
    }

    /// Send a payload, announcing its size first.
    pub fn send_variable(&mut self, data: &[u8]) -> Result<TransferReport> {
        self.require(Role::Initiator, "send_variable")?;
        let size = size_field(data.len())?;
        let started = self.begin(Direction::Send, data.len());

        let handshake_attempts = self.sync_as_initiator()?;

        self.state = SessionState::SizeExchange;
        let min_frame = self.config.frame.min_frame;
        encode_size_frame(size, min_frame, &mut self.scratch.tx);
        self.transport.transmit(&self.scratch.tx)?;
        let mut retrier = self.config.retry.start(Stage::SizeExchange);
        receive_until(
            &mut self.transport,
            &mut self.scratch.rx[..min_frame],
            min_frame,
            true,
            self.config.timeout_units,
            &mut retrier,
            &mut self.stats,
        )?;
        debug!(size, "size acknowledged");

        let outcome = self.send_chunks(data, data.len())?;
        Ok(self.finish(Direction::Send, data.len(), handshake_attempts, outcome, started))
    }

    /// Receive a payload whose size the sender announces. `out` is resized
    /// to the announced size.
    ///
    /// Sizes above `config.max_variable_size` (default
    /// [`DEFAULT_MAX_VARIABLE_SIZE`](crate::DEFAULT_MAX_VARIABLE_SIZE), 64 MiB)
    /// fail with [`SessionError::SizeLimit`]. The size frame is already
    /// acknowledged by then, so the sender keeps waiting for an echo until
    /// its retry policy or the link gives up. Raise the limit before
    /// receiving larger payloads.
    pub fn recv_variable(&mut self, out: &mut Vec<u8>) -> Result<TransferReport> {
        self.require(Role::Responder, "recv_variable")?;
        let started = self.begin(Direction::Receive, 0);

        let handshake_attempts = self.sync_as_responder()?;

        self.state = SessionState::SizeExchange;
        let min_frame = self.config.frame.min_frame;
        let mut retrier = self.config.retry.start(Stage::SizeExchange);
        receive_until(
            &mut self.transport,
            &mut self.scratch.rx[..min_frame],
            min_frame,
            true,
            self.config.timeout_units,
            &mut retrier,
            &mut self.stats,
        )?;
        self.transport.transmit(&self.scratch.rx[..min_frame])?;

        let size = decode_size(&self.scratch.rx[..min_frame])?;
        if size > self.config.max_variable_size {
            self.state = SessionState::Idle;
            return Err(SessionError::SizeLimit {
                size,
                max: self.config.max_variable_size,
            });
        }
        let total = size as usize;
        debug!(size = total, "size announced");

        out.clear();
        out.resize(total, 0);
        let outcome = self.recv_chunks(out, total)?;
        Ok(self.finish(Direction::Receive, total, handshake_attempts, outcome, started))
    }

    /// Receive one frame outside any protocol exchange.
    pub fn receive_frame(&mut self, buf: &mut [u8], timeout_units: u32) -> Result<RecvOutcome> {
        Ok(self.transport.attempt_receive(buf, timeout_units)?)
    }

    pub(crate) fn send_filler(&mut self) -> Result<()> {
        encode_filler(self.config.frame.min_frame, &mut self.scratch.tx);
        self.transport.transmit(&self.scratch.tx)?;
        Ok(())
    }

    pub(crate) fn report_progress(&mut self, progress: Progress) {
        if let Some(callback) = self.progress.as_mut() {
            callback(&progress);
        }
    }

    fn require(&self, required: Role, operation: &'static str) -> Result<()> {
        if self.role != required {
            return Err(SessionError::RoleMismatch {
                operation,
                required,
                actual: self.role,
            });
        }
        Ok(())
    }

    fn begin(&mut self, direction: Direction, total: usize) -> Instant {
        self.stats = LinkStats::default();
        self.state = SessionState::Handshaking;
        info!(%direction, role = %self.role, total, "transfer starting");
        Instant::now()
    }

    fn finish(
        &mut self,
        direction: Direction,
        total_size: usize,
        handshake_attempts: u32,
        outcome: ChunkOutcome,
        started: Instant,
    ) -> TransferReport {
        self.state = SessionState::Done;
        let report = TransferReport {
            direction,
            role: self.role,
            total_size,
            bytes: outcome.bytes,
            chunks: outcome.chunks,
            mismatches: outcome.mismatches,
            handshake_attempts,
            link: self.stats,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            %direction,
            bytes = report.bytes,
            chunks = report.chunks,
            mismatches = report.mismatches,
            retries = report.link.retries(),
            elapsed_ms = report.elapsed_ms,
            "transfer complete"
        );
        report
    }
}

impl<T> fmt::Debug for TransferSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferSession")
            .field("role", &self.role)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}
