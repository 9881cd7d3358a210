use std::fmt;

/// Protocol-level errors (framing and payload format issues).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// Header sentinel mismatch: the byte stream is out of sync.
    BadMagic(u32),
    TooLarge { max: usize, actual: usize },
    UnknownType(u32),
    /// `ERROR` is a local-only tag and never valid on the wire.
    LocalOnlyType,
    Truncated,
    InvalidUtf8,
    InvalidFormat(&'static str),
    InvalidNumber(&'static str),
}

impl ProtoError {
    /// Fatal errors mean the stream can no longer be framed and the
    /// connection must be aborted. Everything else rejects one frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BadMagic(_) | Self::TooLarge { .. })
    }
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic(m) => write!(f, "bad frame magic 0x{m:08X} (stream corrupted)"),
            Self::TooLarge { max, actual } => {
                write!(f, "payload of {actual} bytes exceeds limit of {max}")
            }
            Self::UnknownType(t) => write!(f, "unknown message type {t}"),
            Self::LocalOnlyType => write!(f, "ERROR frames cannot be sent over the wire"),
            Self::Truncated => write!(f, "truncated frame"),
            Self::InvalidUtf8 => write!(f, "payload is not valid UTF-8"),
            Self::InvalidFormat(what) => write!(f, "invalid format: {what}"),
            Self::InvalidNumber(what) => write!(f, "invalid number in {what}"),
        }
    }
}

impl std::error::Error for ProtoError {}
