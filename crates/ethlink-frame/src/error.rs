/// Errors that can occur in frame geometry and size encoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer is too short to hold the value.
    #[error("buffer too short ({len} bytes, need {needed})")]
    ShortBuffer { len: usize, needed: usize },

    /// The payload exceeds what the size field can describe.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame geometry is inconsistent.
    #[error("invalid frame config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
