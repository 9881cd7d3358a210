use bytes::BytesMut;

use crate::protocol::{Frame, FrameHeader, HEADER_LEN, ProtoError};

#[derive(Debug, Clone, Copy)]
enum Phase {
    AwaitHeader,
    AwaitPayload(FrameHeader),
}

/// Outcome of feeding bytes to the assembler.
#[derive(Debug, PartialEq, Eq)]
pub enum Assembled {
    /// The current phase still needs more bytes.
    Pending,
    Frame(Frame),
    /// A whole frame was consumed but could not be accepted.
    Rejected(ProtoError),
}

/// Sans-IO frame reassembly.
///
/// Header bytes accumulate until all 24 are present, the header is validated
/// (magic first), then payload bytes accumulate until `length` are present.
/// A zero-length frame completes straight from the header.
///
/// Fatal errors (bad magic, oversized length) poison the assembler: every
/// later `push` returns the same error.
#[derive(Debug)]
pub struct FrameAssembler {
    phase: Phase,
    buf: BytesMut,
    poisoned: Option<ProtoError>,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            phase: Phase::AwaitHeader,
            buf: BytesMut::with_capacity(HEADER_LEN),
            poisoned: None,
        }
    }

    /// Bytes still missing for the current phase. Never 0.
    pub fn bytes_needed(&self) -> usize {
        let target = match self.phase {
            Phase::AwaitHeader => HEADER_LEN,
            Phase::AwaitPayload(header) => header.length as usize,
        };
        target - self.buf.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Append up to `bytes_needed()` bytes of `data`.
    ///
    /// Returns how many bytes were consumed together with the outcome; the
    /// caller feeds the rest of `data` in a further call.
    pub fn push(&mut self, data: &[u8]) -> Result<(usize, Assembled), ProtoError> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone());
        }

        let take = data.len().min(self.bytes_needed());
        self.buf.extend_from_slice(&data[..take]);
        if self.bytes_needed() > 0 {
            return Ok((take, Assembled::Pending));
        }

        match self.phase {
            Phase::AwaitHeader => {
                let header = match FrameHeader::decode(&self.buf) {
                    Ok(h) => h,
                    Err(e) => {
                        self.buf.clear();
                        self.poisoned = Some(e.clone());
                        return Err(e);
                    }
                };
                self.buf.clear();
                if header.length == 0 {
                    return Ok((take, Self::complete(header, BytesMut::new())));
                }
                self.buf.reserve(header.length as usize);
                self.phase = Phase::AwaitPayload(header);
                Ok((take, Assembled::Pending))
            }
            Phase::AwaitPayload(header) => {
                let payload = self.buf.split();
                self.phase = Phase::AwaitHeader;
                Ok((take, Self::complete(header, payload)))
            }
        }
    }

    fn complete(header: FrameHeader, payload: BytesMut) -> Assembled {
        match Frame::from_parts(header, payload.freeze()) {
            Ok(frame) => Assembled::Frame(frame),
            Err(e) => Assembled::Rejected(e),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::MsgType;
    use byteorder::{BigEndian, ByteOrder};
    use bytes::Bytes;

    /// Feed a whole buffer, collecting every non-pending outcome.
    fn feed(asm: &mut FrameAssembler, mut data: &[u8]) -> Result<Vec<Assembled>, ProtoError> {
        let mut out = Vec::new();
        while !data.is_empty() {
            let (used, step) = asm.push(data)?;
            data = &data[used..];
            if step != Assembled::Pending {
                out.push(step);
            }
        }
        Ok(out)
    }

    fn sample() -> Frame {
        Frame::new(
            5,
            7,
            MsgType::Candidate,
            1,
            Bytes::from_static(b"L1|1|1|10.0.0.1|5000|10.0.0.1|5000|0|100|0|u|p"),
        )
    }

    #[test]
    fn whole_frame_at_once() {
        let bytes = sample().encode().unwrap();
        let mut asm = FrameAssembler::new();
        assert_eq!(feed(&mut asm, &bytes).unwrap(), vec![Assembled::Frame(sample())]);
        assert_eq!(asm.bytes_needed(), HEADER_LEN);
    }

    #[test]
    fn one_byte_at_a_time_gives_the_same_frame() {
        let bytes = sample().encode().unwrap();
        let mut asm = FrameAssembler::new();
        let mut got = Vec::new();
        for b in bytes.iter() {
            let (used, step) = asm.push(std::slice::from_ref(b)).unwrap();
            assert_eq!(used, 1);
            if step != Assembled::Pending {
                got.push(step);
            }
        }
        assert_eq!(got, vec![Assembled::Frame(sample())]);
    }

    #[test]
    fn bytes_needed_tracks_the_phase() {
        let bytes = sample().encode().unwrap();
        let mut asm = FrameAssembler::new();
        assert_eq!(asm.bytes_needed(), HEADER_LEN);
        asm.push(&bytes[..10]).unwrap();
        assert_eq!(asm.bytes_needed(), HEADER_LEN - 10);
        asm.push(&bytes[10..HEADER_LEN]).unwrap();
        assert_eq!(asm.bytes_needed(), sample().payload.len());
    }

    #[test]
    fn zero_length_frame_completes_from_header() {
        let done = Frame::new(2, 3, MsgType::CodecsDone, 0, Bytes::new());
        let mut asm = FrameAssembler::new();
        let (used, step) = asm.push(&done.encode().unwrap()).unwrap();
        assert_eq!(used, HEADER_LEN);
        assert_eq!(step, Assembled::Frame(done));
    }

    #[test]
    fn back_to_back_frames_in_one_buffer() {
        let a = Frame::new(0, 1, MsgType::Intro, 0, Bytes::from_static(b"alice"));
        let b = Frame::new(2, 1, MsgType::CandidatesDone, 1, Bytes::new());
        let mut bytes = a.encode().unwrap().to_vec();
        bytes.extend_from_slice(&b.encode().unwrap());

        let mut asm = FrameAssembler::new();
        assert_eq!(
            feed(&mut asm, &bytes).unwrap(),
            vec![Assembled::Frame(a), Assembled::Frame(b)]
        );
    }

    #[test]
    fn bad_magic_poisons_the_stream() {
        let mut bytes = sample().encode().unwrap().to_vec();
        BigEndian::write_u32(&mut bytes[0..4], 0xCAFE_BABE);

        let mut asm = FrameAssembler::new();
        let err = feed(&mut asm, &bytes).unwrap_err();
        assert_eq!(err, ProtoError::BadMagic(0xCAFE_BABE));
        assert!(asm.is_poisoned());
        assert_eq!(asm.push(b"more").unwrap_err(), err);
    }

    #[test]
    fn unknown_type_is_skipped_and_stream_stays_in_sync() {
        let mut odd = Frame::new(2, 1, MsgType::Intro, 0, Bytes::from_static(b"zz"))
            .encode()
            .unwrap()
            .to_vec();
        BigEndian::write_u32(&mut odd[12..16], 77);
        let next = Frame::new(2, 1, MsgType::CodecsDone, 0, Bytes::new());
        odd.extend_from_slice(&next.encode().unwrap());

        let mut asm = FrameAssembler::new();
        assert_eq!(
            feed(&mut asm, &odd).unwrap(),
            vec![
                Assembled::Rejected(ProtoError::UnknownType(77)),
                Assembled::Frame(next)
            ]
        );
    }
}
