use bytes::Bytes;

use crate::header::Header;

/// One received imsg: the decoded header and its complete payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Header as read from the wire.
    pub header: Header,
    /// Payload bytes, exactly `header.length - HEADER_SIZE` long.
    pub payload: Bytes,
}

impl Message {
    /// Pair a header with its payload.
    pub fn new(header: Header, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    pub fn msg_type(&self) -> u32 {
        self.header.msg_type
    }

    pub fn flags(&self) -> u16 {
        self.header.flags
    }

    pub fn peer_id(&self) -> u32 {
        self.header.peer_id
    }

    pub fn pid(&self) -> u32 {
        self.header.pid
    }

    /// The total wire size of this message (header + payload).
    pub fn wire_size(&self) -> usize {
        usize::from(self.header.length)
    }

    /// Split into header and payload.
    pub fn into_parts(self) -> (Header, Bytes) {
        (self.header, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_SIZE;

    #[test]
    fn accessors_mirror_header() {
        let header = Header::new(9, 0x10, 3, 1234, 4).unwrap();
        let msg = Message::new(header, Bytes::from_static(b"test"));

        assert_eq!(msg.msg_type(), 9);
        assert_eq!(msg.flags(), 0x10);
        assert_eq!(msg.peer_id(), 3);
        assert_eq!(msg.pid(), 1234);
        assert_eq!(msg.wire_size(), HEADER_SIZE + 4);
    }

    #[test]
    fn into_parts_returns_both_halves() {
        let header = Header::new(1, 0, 0, 1, 2).unwrap();
        let (h, payload) = Message::new(header, vec![0xAA, 0xBB]).into_parts();
        assert_eq!(h, header);
        assert_eq!(payload.as_ref(), &[0xAA, 0xBB]);
    }
}
