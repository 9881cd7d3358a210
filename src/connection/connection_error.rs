use std::{fmt, io};

use crate::protocol::{MsgType, ProtoError};

/// Errors that end a connection or refuse a send.
#[derive(Debug)]
pub enum ConnectionError {
    Io(io::Error),
    /// The peer's byte stream can no longer be framed.
    Corrupted(ProtoError),
    /// A message could not be encoded.
    Proto(ProtoError),
    /// Only INTRO may be sent before an id has been assigned.
    AnonymousSource(MsgType),
    /// The peer stopped draining and this many frames are already queued.
    Backlogged(usize),
    /// The writer task is gone.
    Closed,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Corrupted(e) => write!(f, "stream corrupted: {e}"),
            Self::Proto(e) => write!(f, "protocol error: {e}"),
            Self::AnonymousSource(t) => {
                write!(f, "cannot send {} from the anonymous id", t.name())
            }
            Self::Backlogged(n) => write!(f, "peer is not reading, {n} frames already queued"),
            Self::Closed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for ConnectionError {}

impl From<io::Error> for ConnectionError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ProtoError> for ConnectionError {
    fn from(e: ProtoError) -> Self {
        Self::Proto(e)
    }
}
