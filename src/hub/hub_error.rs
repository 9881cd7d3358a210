use std::fmt;

use crate::hub::SessionKey;
use crate::protocol::{MsgType, ParticipantId, ProtoError};

/// Protocol violations detected by the hub. Each one rejects a single frame;
/// the session stays open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    Proto(ProtoError),
    UnknownSession(SessionKey),
    /// Anything but a self-introduction from a session without an id.
    NotIntroduced {
        session: SessionKey,
        msg_type: MsgType,
    },
    /// `src` differs from the id bound to the session.
    SpoofedSource {
        claimed: ParticipantId,
        bound: ParticipantId,
    },
    AlreadyIntroduced(ParticipantId),
    UnknownParticipant(ParticipantId),
    IdsExhausted,
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proto(e) => write!(f, "protocol error: {e}"),
            Self::UnknownSession(s) => write!(f, "unknown session {s}"),
            Self::NotIntroduced { session, msg_type } => write!(
                f,
                "session {session} sent {} before introducing itself",
                msg_type.name()
            ),
            Self::SpoofedSource { claimed, bound } => {
                write!(f, "participant {bound} claimed to be {claimed}")
            }
            Self::AlreadyIntroduced(id) => write!(f, "participant {id} introduced itself twice"),
            Self::UnknownParticipant(id) => write!(f, "no participant with id {id}"),
            Self::IdsExhausted => write!(f, "participant id space exhausted"),
        }
    }
}

impl std::error::Error for HubError {}

impl From<ProtoError> for HubError {
    fn from(e: ProtoError) -> Self {
        Self::Proto(e)
    }
}
