use crate::connection::ConnectionError;
use crate::protocol::{Frame, ProtoError};

/// Everything a connection reports to its owner.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A complete, well-formed frame.
    Frame(Frame),
    /// A frame was skipped (e.g. unknown type tag); the stream is still in sync.
    Rejected(ProtoError),
    /// The peer closed the socket (zero-byte read).
    Closed,
    /// Socket error or stream corruption. The connection is dead.
    Failed(ConnectionError),
}

impl ConnectionEvent {
    /// `Closed` and `Failed` end the connection; at most one of them is
    /// ever reported per connection.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}
