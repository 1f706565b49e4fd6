use bytes::{Buf, BufMut, BytesMut};

use crate::error::{ImsgError, Result};

/// Header size: type (4) + length (2) + flags (2) + peer_id (4) + pid (4) = 16 bytes.
pub const HEADER_SIZE: usize = 16;

/// Largest payload a single frame may carry.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024;

/// Largest total frame, header included.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_MESSAGE_SIZE;

/// Metadata preceding every imsg payload on the wire.
///
/// Wire format:
/// ```text
/// ┌───────────┬───────────┬──────────┬───────────┬───────────┬──────────────────┐
/// │ Type      │ Length    │ Flags    │ Peer ID   │ PID       │ Payload          │
/// │ (4B LE)   │ (2B LE)   │ (2B LE)  │ (4B LE)   │ (4B LE)   │ (Length-16 bytes)│
/// └───────────┴───────────┴──────────┴───────────┴───────────┴──────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Header {
    /// Message kind, interpreted by the caller.
    pub msg_type: u32,
    /// Total frame length in bytes, header included.
    pub length: u16,
    /// Caller-defined flag bits.
    pub flags: u16,
    /// Caller-defined peer or routing identifier.
    pub peer_id: u32,
    /// Process id of the sender.
    pub pid: u32,
}

impl Header {
    /// Build the header for a frame carrying `payload_len` bytes.
    pub fn new(
        msg_type: u32,
        flags: u16,
        peer_id: u32,
        pid: u32,
        payload_len: usize,
    ) -> Result<Self> {
        if payload_len > MAX_MESSAGE_SIZE {
            return Err(ImsgError::SizeExceeded {
                size: payload_len,
                max: MAX_MESSAGE_SIZE,
            });
        }

        Ok(Self {
            msg_type,
            // MAX_FRAME_SIZE fits in u16.
            length: (HEADER_SIZE + payload_len) as u16,
            flags,
            peer_id,
            pid,
        })
    }

    /// Append the 16-byte encoding to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_slice(&self.to_bytes());
    }

    /// The 16-byte encoding as a fixed array.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let mut dst = &mut out[..];
        dst.put_u32_le(self.msg_type);
        dst.put_u16_le(self.length);
        dst.put_u16_le(self.flags);
        dst.put_u32_le(self.peer_id);
        dst.put_u32_le(self.pid);
        out
    }

    /// Decode a header from the first `HEADER_SIZE` bytes of `src`.
    ///
    /// Field values are not validated; bytes past the header are ignored.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < HEADER_SIZE {
            return Err(ImsgError::Format { len: src.len() });
        }

        let mut buf = &src[..HEADER_SIZE];
        Ok(Self {
            msg_type: buf.get_u32_le(),
            length: buf.get_u16_le(),
            flags: buf.get_u16_le(),
            peer_id: buf.get_u32_le(),
            pid: buf.get_u32_le(),
        })
    }

    /// Payload length implied by `length`, saturating at zero.
    pub fn payload_len(&self) -> usize {
        usize::from(self.length).saturating_sub(HEADER_SIZE)
    }

    /// Payload length for a received header, rejecting lengths no sender produces.
    ///
    /// A zero `length` is rejected as well, even though some imsg peers
    /// treat it as an empty message.
    pub(crate) fn checked_payload_len(&self) -> Result<usize> {
        let length = usize::from(self.length);
        if !(HEADER_SIZE..=MAX_FRAME_SIZE).contains(&length) {
            return Err(ImsgError::InvalidLength {
                length: self.length,
            });
        }
        Ok(length - HEADER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample() -> Header {
        Header {
            msg_type: 0xDEAD_BEEF,
            length: 42,
            flags: 0x8001,
            peer_id: 7,
            pid: 31337,
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let header = sample();
        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(Header::decode(&buf).unwrap(), header);
    }

    #[test]
    fn to_bytes_matches_encode() {
        let header = sample();
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(header.to_bytes().as_slice(), buf.as_ref());
    }

    #[test]
    fn field_layout_is_little_endian() {
        let header = Header {
            msg_type: 1,
            length: 18,
            flags: 0,
            peer_id: 0,
            pid: 42,
        };
        assert_eq!(
            header.to_bytes(),
            [
                0x01, 0x00, 0x00, 0x00, // type
                0x12, 0x00, // length
                0x00, 0x00, // flags
                0x00, 0x00, 0x00, 0x00, // peer_id
                0x2A, 0x00, 0x00, 0x00, // pid
            ]
        );
    }

    #[test]
    fn decode_short_buffer_fails() {
        let bytes = sample().to_bytes();
        for len in 0..HEADER_SIZE {
            let err = Header::decode(&bytes[..len]).unwrap_err();
            assert!(matches!(err, ImsgError::Format { len: got } if got == len));
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let mut wire = sample().to_bytes().to_vec();
        wire.extend_from_slice(b"payload");
        assert_eq!(Header::decode(&wire).unwrap(), sample());
    }

    #[test]
    fn decode_is_repeatable() {
        let bytes = [0xFFu8; HEADER_SIZE];
        let first = Header::decode(&bytes).unwrap();
        let second = Header::decode(&bytes).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.length, u16::MAX);
    }

    #[test]
    fn decode_does_not_validate_length() {
        let header = Header {
            length: 3,
            ..sample()
        };
        let decoded = Header::decode(&header.to_bytes()).unwrap();
        assert_eq!(decoded.length, 3);
        assert_eq!(decoded.payload_len(), 0);
    }

    #[test]
    fn new_sets_total_length() {
        let header = Header::new(5, 1, 2, 3, 10).unwrap();
        assert_eq!(header.length as usize, HEADER_SIZE + 10);
        assert_eq!(header.payload_len(), 10);

        let empty = Header::new(5, 0, 0, 0, 0).unwrap();
        assert_eq!(empty.length as usize, HEADER_SIZE);
        assert_eq!(empty.payload_len(), 0);
    }

    #[test]
    fn new_accepts_max_and_rejects_beyond() {
        let max = Header::new(1, 0, 0, 0, MAX_MESSAGE_SIZE).unwrap();
        assert_eq!(max.length as usize, MAX_FRAME_SIZE);

        let err = Header::new(1, 0, 0, 0, MAX_MESSAGE_SIZE + 1).unwrap_err();
        assert!(matches!(
            err,
            ImsgError::SizeExceeded { size, max } if size == MAX_MESSAGE_SIZE + 1 && max == MAX_MESSAGE_SIZE
        ));
    }

    #[test]
    fn checked_payload_len_bounds() {
        let at = |length: u16| Header { length, ..sample() }.checked_payload_len();

        assert_eq!(at(HEADER_SIZE as u16).unwrap(), 0);
        assert_eq!(at(MAX_FRAME_SIZE as u16).unwrap(), MAX_MESSAGE_SIZE);
        assert!(matches!(at(0), Err(ImsgError::InvalidLength { length: 0 })));
        assert!(matches!(
            at(HEADER_SIZE as u16 - 1),
            Err(ImsgError::InvalidLength { .. })
        ));
        assert!(matches!(
            at(MAX_FRAME_SIZE as u16 + 1),
            Err(ImsgError::InvalidLength { .. })
        ));
    }

    proptest! {
        #[test]
        fn any_header_roundtrips(
            msg_type in any::<u32>(),
            length in any::<u16>(),
            flags in any::<u16>(),
            peer_id in any::<u32>(),
            pid in any::<u32>(),
        ) {
            let header = Header { msg_type, length, flags, peer_id, pid };
            let mut buf = BytesMut::new();
            header.encode(&mut buf);

            prop_assert_eq!(buf.len(), HEADER_SIZE);
            prop_assert_eq!(Header::decode(&buf).unwrap(), header);
        }
    }
}
