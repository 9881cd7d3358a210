//! One framed signaling socket: incremental reassembly of frames from
//! partial reads, typed event dispatch and queued writes.

pub mod connection;
pub mod connection_error;
pub mod connection_event;
pub mod frame_assembler;

pub use connection::Connection;
pub use connection_error::ConnectionError;
pub use connection_event::ConnectionEvent;
pub use frame_assembler::{Assembled, FrameAssembler};
