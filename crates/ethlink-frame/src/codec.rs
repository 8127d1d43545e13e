use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Largest chunk carried by one frame: a full Ethernet payload.
pub const MAX_CHUNK: usize = 1500;

/// Smallest frame the link carries: a 64-byte Ethernet frame minus the
/// 14-byte header and 4-byte FCS.
pub const MIN_FRAME: usize = 64 - 18;

/// Width of the size field in a size control frame.
pub const SIZE_FIELD_LEN: usize = 4;

/// Marker byte filling a handshake frame after its first [`SIZE_FIELD_LEN`]
/// bytes. A size frame carries zeros there, so the two never collide.
pub const FILLER_BYTE: u8 = 0xFF;

/// Write `value` little-endian into the first four bytes of `dst`.
pub fn encode_size(value: u32, dst: &mut [u8]) -> Result<()> {
    if dst.len() < SIZE_FIELD_LEN {
        return Err(FrameError::ShortBuffer {
            len: dst.len(),
            needed: SIZE_FIELD_LEN,
        });
    }
    let mut field = &mut dst[..SIZE_FIELD_LEN];
    field.put_u32_le(value);
    Ok(())
}

/// Read a little-endian `u32` from the first four bytes of `src`.
pub fn decode_size(src: &[u8]) -> Result<u32> {
    if src.len() < SIZE_FIELD_LEN {
        return Err(FrameError::ShortBuffer {
            len: src.len(),
            needed: SIZE_FIELD_LEN,
        });
    }
    let mut field = &src[..SIZE_FIELD_LEN];
    Ok(field.get_u32_le())
}

/// Build a size control frame into `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────────────────┐
/// │ Size (4B LE) │ Zero padding up to min_frame │
/// └──────────────┴──────────────────────────────┘
/// ```
pub fn encode_size_frame(value: u32, min_frame: usize, dst: &mut BytesMut) {
    dst.clear();
    dst.reserve(min_frame.max(SIZE_FIELD_LEN));
    dst.put_u32_le(value);
    if dst.len() < min_frame {
        dst.resize(min_frame, 0);
    }
}

/// Build a handshake filler frame into `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────────────────┐
/// │ 4 zero bytes │ 0xFF marker up to min_frame  │
/// └──────────────┴──────────────────────────────┘
/// ```
pub fn encode_filler(min_frame: usize, dst: &mut BytesMut) {
    dst.clear();
    dst.resize(min_frame.min(SIZE_FIELD_LEN), 0);
    if min_frame > SIZE_FIELD_LEN {
        dst.resize(min_frame, FILLER_BYTE);
    }
}

/// True when `frame` carries the handshake filler marker.
///
/// Only frames longer than the size field can carry it.
pub fn is_filler(frame: &[u8]) -> bool {
    frame.len() > SIZE_FIELD_LEN && frame[SIZE_FIELD_LEN..].iter().all(|b| *b == FILLER_BYTE)
}

/// Convert a payload length into the size field value.
pub fn size_field(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: u32::MAX as usize,
    })
}

/// Return `frame` unchanged when it already meets `min_frame`, otherwise a
/// zero-padded copy held in `scratch`.
pub fn pad_frame<'a>(frame: &'a [u8], min_frame: usize, scratch: &'a mut BytesMut) -> &'a [u8] {
    if frame.len() >= min_frame {
        return frame;
    }
    scratch.clear();
    scratch.reserve(min_frame);
    scratch.put_slice(frame);
    scratch.resize(min_frame, 0);
    &scratch[..]
}

/// Frame geometry shared by both peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Largest chunk per frame. Default: 1500.
    pub max_chunk: usize,
    /// Smallest frame sent, control frames included. Default: 46.
    pub min_frame: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_chunk: MAX_CHUNK,
            min_frame: MIN_FRAME,
        }
    }
}

impl FrameConfig {
    /// Check the geometry is self-consistent.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk == 0 {
            return Err(FrameError::InvalidConfig(
                "max_chunk must be greater than zero".to_string(),
            ));
        }
        if self.min_frame <= SIZE_FIELD_LEN {
            return Err(FrameError::InvalidConfig(format!(
                "min_frame {} cannot hold the {SIZE_FIELD_LEN}-byte size field and a filler marker",
                self.min_frame
            )));
        }
        if self.min_frame > self.max_chunk {
            return Err(FrameError::InvalidConfig(format!(
                "min_frame {} exceeds max_chunk {}",
                self.min_frame, self.max_chunk
            )));
        }
        Ok(())
    }

    /// Check the geometry fits a link carrying at most `max_payload` bytes.
    pub fn validate_for(&self, max_payload: usize) -> Result<()> {
        self.validate()?;
        if self.max_chunk > max_payload {
            return Err(FrameError::InvalidConfig(format!(
                "max_chunk {} exceeds link payload {}",
                self.max_chunk, max_payload
            )));
        }
        Ok(())
    }
}
