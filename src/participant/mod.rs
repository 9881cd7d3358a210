//! The seam between signaling and the media layer: per-participant handlers
//! that own the per-media session state.

pub mod negotiating_participant;
pub mod participant;

pub use negotiating_participant::{
    MediaConfig, NegotiatingFactory, NegotiatingParticipant, SessionCodecs, negotiate_codecs,
};
pub use participant::{Participant, ParticipantFactory, ParticipantInfo, PeerOutbox};
