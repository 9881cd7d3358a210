use std::str;

use bytes::Bytes;

use super::{Candidate, Codec, Frame, MediaId, MsgType, ParticipantId, ProtoError};

// ---- Public message enum --------------------------------------------------

/// Decoded payload of a frame, one variant per wire message kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingMsg {
    /// Announces a display name. Sent to the hub by a newcomer, by the hub
    /// about a newcomer, and between peers.
    Intro { name: String },
    Codec(Codec),
    CodecsDone,
    Candidate(Candidate),
    CandidatesDone,
}

impl SignalingMsg {
    pub fn msg_type(&self) -> MsgType {
        match self {
            Self::Intro { .. } => MsgType::Intro,
            Self::Codec(_) => MsgType::Codec,
            Self::CodecsDone => MsgType::CodecsDone,
            Self::Candidate(_) => MsgType::Candidate,
            Self::CandidatesDone => MsgType::CandidatesDone,
        }
    }

    pub fn encode_payload(&self) -> Result<Bytes, ProtoError> {
        Ok(match self {
            Self::Intro { name } => Bytes::copy_from_slice(name.as_bytes()),
            Self::Codec(codec) => Bytes::from(codec.encode()?),
            Self::Candidate(cand) => Bytes::from(cand.encode()?),
            Self::CodecsDone | Self::CandidatesDone => Bytes::new(),
        })
    }

    pub fn decode(msg_type: MsgType, payload: &[u8]) -> Result<Self, ProtoError> {
        let msg = match msg_type {
            MsgType::Error => return Err(ProtoError::LocalOnlyType),
            MsgType::Intro => Self::Intro {
                name: utf8(payload)?.to_owned(),
            },
            MsgType::Codec => Self::Codec(Codec::decode(utf8(payload)?)?),
            MsgType::Candidate => Self::Candidate(Candidate::decode(utf8(payload)?)?),
            MsgType::CodecsDone => {
                expect_empty(payload)?;
                Self::CodecsDone
            }
            MsgType::CandidatesDone => {
                expect_empty(payload)?;
                Self::CandidatesDone
            }
        };
        Ok(msg)
    }
}

fn utf8(payload: &[u8]) -> Result<&str, ProtoError> {
    str::from_utf8(payload).map_err(|_| ProtoError::InvalidUtf8)
}

fn expect_empty(payload: &[u8]) -> Result<(), ProtoError> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(ProtoError::InvalidFormat("trailing bytes in message body"))
    }
}

/// A decoded message plus its routing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub src: ParticipantId,
    pub dest: ParticipantId,
    pub media: MediaId,
    pub msg: SignalingMsg,
}

impl Envelope {
    pub fn new(src: ParticipantId, dest: ParticipantId, media: MediaId, msg: SignalingMsg) -> Self {
        Self {
            src,
            dest,
            media,
            msg,
        }
    }

    pub fn to_frame(&self) -> Result<Frame, ProtoError> {
        Ok(Frame::new(
            self.src,
            self.dest,
            self.msg.msg_type(),
            self.media,
            self.msg.encode_payload()?,
        ))
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, ProtoError> {
        Ok(Self {
            src: frame.src,
            dest: frame.dest,
            media: frame.media,
            msg: SignalingMsg::decode(frame.msg_type, &frame.payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::protocol::{MediaType, candidate::COMPONENT_RTP};

    #[test]
    fn intro_payload_is_the_raw_name() {
        let env = Envelope::new(0, 1, 0, SignalingMsg::Intro { name: "alice".into() });
        let frame = env.to_frame().unwrap();
        assert_eq!(frame.msg_type, MsgType::Intro);
        assert_eq!(&frame.payload[..], b"alice");
        assert_eq!(Envelope::from_frame(&frame).unwrap(), env);
    }

    #[test]
    fn done_markers_have_empty_payloads() {
        for msg in [SignalingMsg::CodecsDone, SignalingMsg::CandidatesDone] {
            let frame = Envelope::new(2, 3, 1, msg.clone()).to_frame().unwrap();
            assert!(frame.payload.is_empty());
            assert_eq!(Envelope::from_frame(&frame).unwrap().msg, msg);
        }
        assert!(SignalingMsg::decode(MsgType::CodecsDone, b"x").is_err());
    }

    #[test]
    fn records_survive_the_envelope() {
        let codec = Codec::new(0, "PCMU", MediaType::Audio, 8000).with_channels(1);
        let cand = Candidate::host("L1", COMPONENT_RTP, "10.0.0.2", 7078);
        for msg in [SignalingMsg::Codec(codec), SignalingMsg::Candidate(cand)] {
            let env = Envelope::new(4, 2, 0, msg);
            assert_eq!(Envelope::from_frame(&env.to_frame().unwrap()).unwrap(), env);
        }
    }

    #[test]
    fn error_tag_never_decodes() {
        assert_eq!(
            SignalingMsg::decode(MsgType::Error, b""),
            Err(ProtoError::LocalOnlyType)
        );
    }

    #[test]
    fn non_utf8_intro_is_rejected() {
        assert_eq!(
            SignalingMsg::decode(MsgType::Intro, &[0xff, 0xfe]),
            Err(ProtoError::InvalidUtf8)
        );
    }
}
