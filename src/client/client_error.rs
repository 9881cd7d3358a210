use std::fmt;

use crate::connection::ConnectionError;
use crate::protocol::{ParticipantId, ProtoError};

#[derive(Debug)]
pub enum ClientError {
    Proto(ProtoError),
    Connection(ConnectionError),
    /// A peer spoke before the hub assigned our id.
    NotWelcomed { src: ParticipantId },
    /// A second welcome with a different id.
    Rewelcomed {
        current: ParticipantId,
        offered: ParticipantId,
    },
    /// Frame addressed to someone else.
    Misrouted { dest: ParticipantId },
    /// Message from a participant that never introduced itself.
    UnknownParticipant(ParticipantId),
    /// The hub connection is gone.
    Disconnected,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proto(e) => write!(f, "protocol error: {e}"),
            Self::Connection(e) => write!(f, "connection error: {e}"),
            Self::NotWelcomed { src } => {
                write!(f, "message from {src} before the hub assigned an id")
            }
            Self::Rewelcomed { current, offered } => {
                write!(f, "hub offered id {offered} but we already are {current}")
            }
            Self::Misrouted { dest } => write!(f, "frame addressed to {dest}, not to us"),
            Self::UnknownParticipant(id) => write!(f, "unknown participant {id}"),
            Self::Disconnected => write!(f, "disconnected from the hub"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ProtoError> for ClientError {
    fn from(e: ProtoError) -> Self {
        Self::Proto(e)
    }
}

impl From<ConnectionError> for ClientError {
    fn from(e: ConnectionError) -> Self {
        Self::Connection(e)
    }
}
