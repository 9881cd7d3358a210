use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;

use crate::connection::ConnectionEvent;
use crate::hub::SessionKey;

/// Events sent *to* the central hub loop.
#[derive(Debug)]
pub enum HubEvent {
    /// The listener accepted a socket.
    Accepted { stream: TcpStream, addr: SocketAddr },
    /// Something happened on a session's connection.
    Connection {
        session: SessionKey,
        event: ConnectionEvent,
    },
    /// The accept loop died; the hub cannot take new participants.
    ListenerFailed(io::Error),
}
