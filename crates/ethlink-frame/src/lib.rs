//! Frame geometry for the ethlink transfer protocol.
//!
//! Every frame on the link is at least [`MIN_FRAME`] and at most
//! [`MAX_CHUNK`] bytes. This crate provides:
//! - the little-endian size codec used by variable-size transfers
//! - zero padding of short frames
//! - the handshake filler and its marker
//! - chunk planning for payloads larger than one frame

pub mod chunk;
pub mod codec;
pub mod error;

pub use chunk::{Chunk, ChunkPlan, Chunks};
pub use codec::{
    decode_size, encode_filler, encode_size, encode_size_frame, is_filler, pad_frame, size_field,
    FrameConfig, FILLER_BYTE, MAX_CHUNK, MIN_FRAME, SIZE_FIELD_LEN,
};
pub use error::{FrameError, Result};
