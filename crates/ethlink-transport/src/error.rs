use std::path::PathBuf;

/// Errors that can occur in frame transport operations.
///
/// These are hard failures of the link itself. Lost or corrupted frames are
/// not errors; they are reported through [`crate::RecvOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The frame exceeds the link's maximum payload.
    #[error("frame too large ({len} bytes, max {max})")]
    FrameTooLarge { len: usize, max: usize },

    /// The network interface could not be resolved or opened.
    #[error("interface {name}: {source}")]
    Interface {
        name: String,
        source: std::io::Error,
    },

    /// A MAC address string could not be parsed.
    #[error("invalid MAC address '{0}'")]
    InvalidMac(String),

    /// The other end of the link has gone away.
    #[error("link disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;
