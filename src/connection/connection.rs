use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::connection::{Assembled, ConnectionError, ConnectionEvent, FrameAssembler};
use crate::protocol::{
    ANONYMOUS_ID, Frame, MediaId, MsgType, ParticipantId, SignalingMsg,
};

/// Upper bound for a single read while a large payload is pending.
const READ_CHUNK: usize = 16 * 1024;
/// Frames queued for a peer that is not draining its socket. A full queue
/// fails the connection instead of buffering without limit.
pub const OUTBOUND_QUEUE_CAP: usize = 256;

type EventFn = Box<dyn Fn(ConnectionEvent) + Send + Sync>;

/// Shared by the reader task, the writer task and the senders so that only
/// the first terminal event reaches the owner.
struct EventSink {
    on_event: EventFn,
    finished: AtomicBool,
}

impl EventSink {
    fn emit(&self, ev: ConnectionEvent) {
        if ev.is_terminal() && self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        (self.on_event)(ev);
    }
}

/// Owns one signaling socket.
///
/// Reads run in a reader task that reassembles frames and hands every
/// outcome to the `on_event` callback. Sends are queued to a writer task as
/// one contiguous header+payload buffer each; at most
/// [`OUTBOUND_QUEUE_CAP`] of them wait at once. Dropping the `Connection`
/// aborts both tasks and closes the socket.
pub struct Connection {
    local_id: ParticipantId,
    peer_addr: Option<SocketAddr>,
    outbound: mpsc::Sender<Bytes>,
    sink: Arc<EventSink>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Start the reader/writer tasks for `stream`.
    ///
    /// `local_id` is the default `src` of outgoing messages. Must be called
    /// from within a tokio runtime.
    pub fn spawn<F>(stream: TcpStream, local_id: ParticipantId, on_event: F) -> Self
    where
        F: Fn(ConnectionEvent) + Send + Sync + 'static,
    {
        let peer_addr = stream.peer_addr().ok();
        // Small signaling frames: don't let Nagle hold them back.
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::channel::<Bytes>(OUTBOUND_QUEUE_CAP);

        let sink = Arc::new(EventSink {
            on_event: Box::new(on_event),
            finished: AtomicBool::new(false),
        });

        let reader = tokio::spawn(read_loop(read_half, sink.clone()));
        let writer = tokio::spawn(write_loop(write_half, outbound_rx, sink.clone()));

        Self {
            local_id,
            peer_addr,
            outbound,
            sink,
            reader,
            writer,
        }
    }

    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    /// Change the default `src` (a client learns its id from the hub).
    pub fn set_local_id(&mut self, id: ParticipantId) {
        self.local_id = id;
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Send `msg` to `dest` from this connection's local id.
    pub fn send(
        &self,
        dest: ParticipantId,
        media: MediaId,
        msg: &SignalingMsg,
    ) -> Result<(), ConnectionError> {
        self.send_from(self.local_id, dest, media, msg)
    }

    /// Send `msg` with an explicit `src`.
    pub fn send_from(
        &self,
        src: ParticipantId,
        dest: ParticipantId,
        media: MediaId,
        msg: &SignalingMsg,
    ) -> Result<(), ConnectionError> {
        let frame = Frame::new(src, dest, msg.msg_type(), media, msg.encode_payload()?);
        self.send_frame(&frame)
    }

    /// Queue an already built frame, e.g. one being relayed untouched.
    ///
    /// Never waits. When the peer has stopped draining and the queue is
    /// full, the connection fails: the owner gets a terminal
    /// [`ConnectionEvent::Failed`] and this call returns
    /// [`ConnectionError::Backlogged`].
    pub fn send_frame(&self, frame: &Frame) -> Result<(), ConnectionError> {
        if frame.src == ANONYMOUS_ID && frame.msg_type != MsgType::Intro {
            return Err(ConnectionError::AnonymousSource(frame.msg_type));
        }
        let bytes = frame.encode()?;
        match self.outbound.try_send(bytes) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.writer.abort();
                let failed = ConnectionError::Backlogged(OUTBOUND_QUEUE_CAP);
                self.sink.emit(ConnectionEvent::Failed(failed));
                Err(ConnectionError::Backlogged(OUTBOUND_QUEUE_CAP))
            }
            Err(TrySendError::Closed(_)) => Err(ConnectionError::Closed),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop(mut reader: OwnedReadHalf, sink: Arc<EventSink>) {
    let mut assembler = FrameAssembler::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        // Read no more than what the current phase still needs.
        let want = assembler.bytes_needed().min(READ_CHUNK);
        let n = match reader.read(&mut chunk[..want]).await {
            Ok(0) => {
                sink.emit(ConnectionEvent::Closed);
                return;
            }
            Ok(n) => n,
            Err(e) => {
                sink.emit(ConnectionEvent::Failed(ConnectionError::Io(e)));
                return;
            }
        };

        match assembler.push(&chunk[..n]) {
            Ok((_, Assembled::Pending)) => {}
            Ok((_, Assembled::Frame(frame))) => sink.emit(ConnectionEvent::Frame(frame)),
            Ok((_, Assembled::Rejected(e))) => sink.emit(ConnectionEvent::Rejected(e)),
            Err(e) => {
                sink.emit(ConnectionEvent::Failed(ConnectionError::Corrupted(e)));
                return;
            }
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Bytes>,
    sink: Arc<EventSink>,
) {
    while let Some(buf) = outbound.recv().await {
        if let Err(e) = writer.write_all(&buf).await {
            sink.emit(ConnectionEvent::Failed(ConnectionError::Io(e)));
            return;
        }
    }
    let _ = writer.shutdown().await;
}
