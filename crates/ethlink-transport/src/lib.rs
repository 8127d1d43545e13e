//! Frame transport abstraction for ethlink.
//!
//! A frame transport moves one discrete, size-bounded frame at a time between
//! two fixed peers and may drop, corrupt or delay any of them:
//! - [`MemoryLink`]: in-process pair, lossless (tests, loopback)
//! - [`DatagramLink`]: Unix datagram sockets with a CRC-32 trailer (Unix)
//! - [`RawEthernetLink`]: `AF_PACKET` raw Ethernet frames (Linux)
//!
//! This is the lowest layer of ethlink. Everything else is generic over the
//! [`FrameTransport`] trait provided here.

pub mod error;
pub mod fcs;
pub mod mac;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod datagram;

#[cfg(target_os = "linux")]
pub mod raw;

pub use error::{Result, TransportError};
pub use mac::MacAddr;
pub use memory::MemoryLink;
pub use traits::{FrameTransport, RecvOutcome, DEFAULT_TICK};

#[cfg(unix)]
pub use datagram::DatagramLink;

#[cfg(target_os = "linux")]
pub use raw::RawEthernetLink;
