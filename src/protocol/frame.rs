use byteorder::{BigEndian, ByteOrder};
use bytes::{Bytes, BytesMut};

use super::{HEADER_LEN, MAGIC, MAX_PAYLOAD_LEN, MediaId, MsgType, ParticipantId, ProtoError};

/// Decoded 24-byte header.
///
/// The type tag is kept raw so a frame with an unknown type can still be
/// skipped by its length without losing stream sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub src: ParticipantId,
    pub dest: ParticipantId,
    pub type_tag: u32,
    pub media: MediaId,
    pub length: u32,
}

impl FrameHeader {
    /// Parse and validate a header. Fails before any payload is looked at
    /// if the magic or the declared length is wrong.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtoError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtoError::Truncated);
        }

        let magic = BigEndian::read_u32(&buf[0..4]);
        if magic != MAGIC {
            return Err(ProtoError::BadMagic(magic));
        }

        let length = BigEndian::read_u32(&buf[20..24]);
        if length as usize > MAX_PAYLOAD_LEN {
            return Err(ProtoError::TooLarge {
                max: MAX_PAYLOAD_LEN,
                actual: length as usize,
            });
        }

        Ok(Self {
            src: BigEndian::read_u32(&buf[4..8]),
            dest: BigEndian::read_u32(&buf[8..12]),
            type_tag: BigEndian::read_u32(&buf[12..16]),
            media: BigEndian::read_u32(&buf[16..20]),
            length,
        })
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        BigEndian::write_u32(&mut header[0..4], MAGIC);
        BigEndian::write_u32(&mut header[4..8], self.src);
        BigEndian::write_u32(&mut header[8..12], self.dest);
        BigEndian::write_u32(&mut header[12..16], self.type_tag);
        BigEndian::write_u32(&mut header[16..20], self.media);
        BigEndian::write_u32(&mut header[20..24], self.length);
        header
    }

    pub fn msg_type(&self) -> Result<MsgType, ProtoError> {
        MsgType::from_u32(self.type_tag)
    }
}

/// One signaling message as it travels on the wire.
///
/// The payload is kept as raw bytes: the hub relays frames without
/// interpreting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub src: ParticipantId,
    pub dest: ParticipantId,
    pub msg_type: MsgType,
    pub media: MediaId,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(
        src: ParticipantId,
        dest: ParticipantId,
        msg_type: MsgType,
        media: MediaId,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            src,
            dest,
            msg_type,
            media,
            payload: payload.into(),
        }
    }

    /// Combine a validated header with its payload.
    pub fn from_parts(header: FrameHeader, payload: Bytes) -> Result<Self, ProtoError> {
        if payload.len() != header.length as usize {
            return Err(ProtoError::Truncated);
        }
        Ok(Self {
            src: header.src,
            dest: header.dest,
            msg_type: header.msg_type()?,
            media: header.media,
            payload,
        })
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            src: self.src,
            dest: self.dest,
            type_tag: self.msg_type.as_u32(),
            media: self.media,
            length: self.payload.len() as u32,
        }
    }

    /// Header followed by payload, as one contiguous buffer.
    pub fn encode(&self) -> Result<Bytes, ProtoError> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtoError::TooLarge {
                max: MAX_PAYLOAD_LEN,
                actual: self.payload.len(),
            });
        }
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.header().encode());
        buf.extend_from_slice(&self.payload);
        Ok(buf.freeze())
    }

    /// Decode exactly one frame from `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtoError> {
        let header = FrameHeader::decode(buf)?;
        let body = &buf[HEADER_LEN..];
        let len = header.length as usize;
        if body.len() < len {
            return Err(ProtoError::Truncated);
        }
        if body.len() > len {
            return Err(ProtoError::InvalidFormat("trailing bytes after frame"));
        }
        Self::from_parts(header, Bytes::copy_from_slice(body))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn header_layout_is_big_endian() {
        let frame = Frame::new(2, 1, MsgType::Intro, 0, &b"alice"[..]);
        let bytes = frame.encode().unwrap();

        assert_eq!(bytes.len(), HEADER_LEN + 5);
        assert_eq!(&bytes[0..4], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 2]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 1]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 5]);
        assert_eq!(&bytes[16..20], &[0, 0, 0, 0]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 5]);
        assert_eq!(&bytes[24..], b"alice");
    }

    #[test]
    fn decode_inverts_encode_for_every_type() {
        let cases = [
            Frame::new(0, 1, MsgType::Intro, 0, &b"bob"[..]),
            Frame::new(3, 1, MsgType::Codec, 1, &b"96 H263-1998 1 90000 1|"[..]),
            Frame::new(3, 4, MsgType::CodecsDone, 2, Bytes::new()),
            Frame::new(5, 7, MsgType::Candidate, 1, &b"a|b|1|10.0.0.1|5000|10.0.0.1|5000|0|100|0||"[..]),
            Frame::new(7, 5, MsgType::CandidatesDone, 0, Bytes::new()),
            Frame::new(u32::MAX, u32::MAX, MsgType::Error, u32::MAX, Bytes::new()),
        ];
        for frame in cases {
            let bytes = frame.encode().unwrap();
            assert_eq!(Frame::decode(&bytes).unwrap(), frame);
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = Frame::new(9, 4, MsgType::Candidate, 1, &b"x"[..]);
        let b = a.clone();
        assert_eq!(a.encode().unwrap(), b.encode().unwrap());
    }

    #[test]
    fn bad_magic_is_rejected_before_payload() {
        let mut bytes = Frame::new(2, 1, MsgType::Intro, 0, &b"alice"[..])
            .encode()
            .unwrap()
            .to_vec();
        bytes[0] = 0xBA;
        // Only the header is needed to detect the corruption.
        assert!(matches!(
            FrameHeader::decode(&bytes[..HEADER_LEN]),
            Err(ProtoError::BadMagic(_))
        ));
        assert!(Frame::decode(&bytes).unwrap_err().is_fatal());
    }

    #[test]
    fn oversized_length_is_fatal() {
        let mut header = FrameHeader {
            src: 2,
            dest: 1,
            type_tag: 5,
            media: 0,
            length: 0,
        }
        .encode();
        BigEndian::write_u32(&mut header[20..24], (MAX_PAYLOAD_LEN + 1) as u32);
        let err = FrameHeader::decode(&header).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn unknown_type_is_not_fatal() {
        let header = FrameHeader {
            src: 2,
            dest: 1,
            type_tag: 42,
            media: 0,
            length: 0,
        };
        let err = Frame::from_parts(header, Bytes::new()).unwrap_err();
        assert_eq!(err, ProtoError::UnknownType(42));
        assert!(!err.is_fatal());
    }

    #[test]
    fn short_buffers_are_truncated() {
        let bytes = Frame::new(2, 1, MsgType::Intro, 0, &b"alice"[..])
            .encode()
            .unwrap();
        assert_eq!(Frame::decode(&bytes[..10]), Err(ProtoError::Truncated));
        assert_eq!(
            Frame::decode(&bytes[..bytes.len() - 1]),
            Err(ProtoError::Truncated)
        );
    }
}
