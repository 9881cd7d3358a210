//! Wire protocol: the 24-byte frame header, the message type tag and the
//! token-delimited payload records carried inside frames.

pub mod candidate;
pub mod codec;
pub mod constants;
pub mod errors;
pub mod frame;
pub mod msg;
pub mod msg_type;
pub mod types;

pub use candidate::{Candidate, CandidateType, NetworkProtocol};
pub use codec::{CODEC_ID_ANY, CODEC_ID_DISABLE, Codec, MediaType};
pub use constants::{
    ANONYMOUS_ID, DEFAULT_HUB_PORT, FIRST_ASSIGNED_ID, HEADER_LEN, HUB_ID, MAGIC, MAX_PAYLOAD_LEN,
};
pub use errors::ProtoError;
pub use frame::{Frame, FrameHeader};
pub use msg::{Envelope, SignalingMsg};
pub use msg_type::MsgType;
pub use types::{MediaId, ParticipantId};
