//! Reliable payload transfer over an unreliable frame link.
//!
//! A [`TransferSession`] drives one end of a strictly half-duplex lockstep
//! exchange:
//!
//! 1. a rendezvous handshake that decides who transmits first,
//! 2. for variable-size transfers, an acknowledged size announcement,
//! 3. the payload in frame-sized chunks, each echoed back by the receiver.
//!
//! Failed receives are retried under a [`RetryPolicy`]; by default forever.

pub mod config;
pub mod error;
pub mod handshake;
pub mod retry;
pub mod session;
mod transfer;

#[cfg(test)]
mod test_util;

pub use config::{SessionConfig, DEFAULT_MAX_VARIABLE_SIZE, DEFAULT_TIMEOUT_UNITS};
pub use error::{Result, SessionError};
pub use handshake::Role;
pub use retry::{Backoff, LinkStats, RetryPolicy, Stage};
pub use session::{Direction, Progress, RecvStatus, SessionState, TransferReport, TransferSession};
