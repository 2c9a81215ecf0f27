//! Wire codec for the 12-byte ACK frame: `(head: u64, bitmap: u32)`.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Encoded size of an [`AckFrame`] in bytes.
pub const ENCODED_LEN: usize = 12;

/// A SACK acknowledgment as it travels on the wire: the highest sequence
/// seen plus the 32-bit sliding window of sequences behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    pub head: u64,
    pub bitmap: u32,
}

impl AckFrame {
    pub fn new(head: u64, bitmap: u32) -> Self {
        Self { head, bitmap }
    }

    /// Encodes this frame as 12 big-endian bytes: 8 bytes of `head` followed
    /// by 4 bytes of `bitmap`.
    pub fn encode(&self, out: &mut [u8; ENCODED_LEN]) {
        BigEndian::write_u64(&mut out[0..8], self.head);
        BigEndian::write_u32(&mut out[8..12], self.bitmap);
    }

    /// Encodes this frame into a freshly-allocated buffer.
    pub fn to_bytes(&self) -> [u8; ENCODED_LEN] {
        let mut buf = [0u8; ENCODED_LEN];
        self.encode(&mut buf);
        buf
    }

    /// Decodes an [`AckFrame`] from `buf`. Fails with [`Error::ProtocolError`]
    /// if `buf` is shorter than [`ENCODED_LEN`].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < ENCODED_LEN {
            return Err(Error::ProtocolError);
        }
        let head = BigEndian::read_u64(&buf[0..8]);
        let bitmap = BigEndian::read_u32(&buf[8..12]);
        Ok(Self { head, bitmap })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let frame = AckFrame::new(0x0102_0304_0506_0708, 0x1234_5678);
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), ENCODED_LEN);
        let decoded = AckFrame::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn encoding_is_big_endian() {
        let frame = AckFrame::new(1, 1);
        let bytes = frame.to_bytes();
        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 1]);
    }

    #[test]
    fn decode_rejects_short_buffers() {
        assert_eq!(AckFrame::decode(&[0u8; 11]).unwrap_err(), Error::ProtocolError);
        assert_eq!(AckFrame::decode(&[]).unwrap_err(), Error::ProtocolError);
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let frame = AckFrame::new(42, 7);
        let mut bytes = frame.to_bytes().to_vec();
        bytes.extend_from_slice(b"trailing garbage");
        let decoded = AckFrame::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn roundtrip_at_wraparound_values() {
        let frame = AckFrame::new(u64::MAX, 0xFFFF_FFFF);
        let decoded = AckFrame::decode(&frame.to_bytes()).unwrap();
        assert_eq!(decoded, frame);
    }
}
