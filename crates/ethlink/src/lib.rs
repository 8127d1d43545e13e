//! Reliable file transfer over a raw link-layer frame transport.
//!
//! ethlink moves an arbitrary byte payload between two fixed peers over a
//! link that delivers discrete frames and may drop, corrupt or delay them.
//! Reliability comes from a lockstep echo protocol: every chunk is sent back
//! by the receiver before the next one goes out.
//!
//! # Crate Structure
//!
//! - [`transport`]: the `FrameTransport` trait and concrete links
//! - [`frame`]: frame geometry, size codec, chunk planning
//! - [`session`]: handshake and transfer sessions (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use ethlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use ethlink_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use ethlink_session::*;
}
