//! Frame check sequence (IEEE 802.3 CRC-32) for links that carry their own.

use bytes::{Buf, BufMut, BytesMut};
use crc_any::CRCu32;

/// FCS length in bytes.
pub const FCS_LEN: usize = 4;

/// CRC-32 over `payload`, as used for the Ethernet FCS.
pub fn checksum(payload: &[u8]) -> u32 {
    let mut crc = CRCu32::crc32();
    crc.digest(payload);
    crc.get_crc()
}

/// Append `payload` followed by its little-endian FCS to `dst`.
pub fn seal(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + FCS_LEN);
    dst.put_slice(payload);
    dst.put_u32_le(checksum(payload));
}

/// Split a sealed frame into its payload, or `None` when the FCS is missing
/// or wrong.
pub fn open(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < FCS_LEN {
        return None;
    }
    let (payload, mut trailer) = frame.split_at(frame.len() - FCS_LEN);
    if trailer.get_u32_le() == checksum(payload) {
        Some(payload)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_check_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn seal_then_open() {
        let mut buf = BytesMut::new();
        seal(b"chunk", &mut buf);
        assert_eq!(buf.len(), 5 + FCS_LEN);
        assert_eq!(open(&buf), Some(&b"chunk"[..]));
    }

    #[test]
    fn corrupted_frame_rejected() {
        let mut buf = BytesMut::new();
        seal(b"chunk", &mut buf);
        buf[1] ^= 0x40;
        assert_eq!(open(&buf), None);
    }

    #[test]
    fn truncated_frame_rejected() {
        assert_eq!(open(&[0x01, 0x02]), None);
    }
}
