// ---- Message type tag -----------------------------------------------------

use super::ProtoError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum MsgType {
    Error = 0,
    Codec = 1,
    CodecsDone = 2,
    Candidate = 3,
    CandidatesDone = 4,
    Intro = 5,
}

impl MsgType {
    pub fn from_u32(v: u32) -> Result<MsgType, ProtoError> {
        use MsgType::*;
        match v {
            0 => Ok(Error),
            1 => Ok(Codec),
            2 => Ok(CodecsDone),
            3 => Ok(Candidate),
            4 => Ok(CandidatesDone),
            5 => Ok(Intro),
            other => Err(ProtoError::UnknownType(other)),
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Short name for logging.
    pub fn name(self) -> &'static str {
        use MsgType::*;
        match self {
            Error => "ERROR",
            Codec => "CODEC",
            CodecsDone => "CODECS_DONE",
            Candidate => "CANDIDATE",
            CandidatesDone => "CANDIDATES_DONE",
            Intro => "INTRO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_wire_values() {
        for (v, t) in [
            (0, MsgType::Error),
            (1, MsgType::Codec),
            (2, MsgType::CodecsDone),
            (3, MsgType::Candidate),
            (4, MsgType::CandidatesDone),
            (5, MsgType::Intro),
        ] {
            assert_eq!(MsgType::from_u32(v), Ok(t));
            assert_eq!(t.as_u32(), v);
        }
        assert_eq!(MsgType::from_u32(6), Err(ProtoError::UnknownType(6)));
    }
}
