use crate::handshake::Role;
use crate::retry::Stage;

/// Errors that can occur in transfer sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] ethlink_transport::TransportError),

    /// Frame geometry or size encoding error.
    #[error("frame error: {0}")]
    Frame(#[from] ethlink_frame::FrameError),

    /// The retry policy gave up.
    #[error("{stage}: gave up after {attempts} attempts")]
    RetriesExhausted { stage: Stage, attempts: u32 },

    /// The operation needs the other handshake role.
    #[error("{operation} requires the {required} role (session is {actual})")]
    RoleMismatch {
        operation: &'static str,
        required: Role,
        actual: Role,
    },

    /// The caller's buffer cannot hold the transfer.
    #[error("buffer too small ({capacity} bytes, need {needed})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// The peer announced a payload above the configured limit.
    #[error("announced size {size} exceeds limit {max}")]
    SizeLimit { size: u32, max: u32 },

    /// Invalid session configuration.
    #[error("invalid session config: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
