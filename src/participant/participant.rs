use crate::protocol::{
    Candidate, Codec, Envelope, Frame, HUB_ID, MediaId, ParticipantId, ProtoError, SignalingMsg,
};

/// Who a handler talks to, and as whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    /// Remote participant id.
    pub id: ParticipantId,
    /// Remote display name.
    pub name: String,
    /// Id of the process owning the handler (1 on the hub).
    pub local_id: ParticipantId,
}

impl ParticipantInfo {
    pub fn is_hub(&self) -> bool {
        self.id == HUB_ID
    }

    pub fn local_is_hub(&self) -> bool {
        self.local_id == HUB_ID
    }
}

/// Messages a handler wants delivered to its remote participant.
///
/// The owner stamps `src`/`dest` and sends them after the handler returns.
#[derive(Debug, Default)]
pub struct PeerOutbox {
    queued: Vec<(MediaId, SignalingMsg)>,
}

impl PeerOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, media: MediaId, msg: SignalingMsg) {
        self.queued.push((media, msg));
    }

    pub fn codec(&mut self, media: MediaId, codec: Codec) {
        self.send(media, SignalingMsg::Codec(codec));
    }

    pub fn codecs_done(&mut self, media: MediaId) {
        self.send(media, SignalingMsg::CodecsDone);
    }

    pub fn candidate(&mut self, media: MediaId, candidate: Candidate) {
        self.send(media, SignalingMsg::Candidate(candidate));
    }

    pub fn candidates_done(&mut self, media: MediaId) {
        self.send(media, SignalingMsg::CandidatesDone);
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Turn the queued messages into frames from `src` to `dest`.
    pub fn into_frames(
        self,
        src: ParticipantId,
        dest: ParticipantId,
    ) -> Result<Vec<Frame>, ProtoError> {
        self.queued
            .into_iter()
            .map(|(media, msg)| Envelope::new(src, dest, media, msg).to_frame())
            .collect()
    }

    pub fn into_messages(self) -> Vec<(MediaId, SignalingMsg)> {
        self.queued
    }
}

/// Per-participant handler owning the per-media session state.
///
/// The hub holds one for every connected peer, a client holds one for the
/// hub and one for every other peer. Handlers are only ever called from the
/// reactor thread.
pub trait Participant: Send {
    /// One remote codec for `media`.
    fn codec(&mut self, media: MediaId, codec: Codec, out: &mut PeerOutbox);
    /// The remote side finished sending codecs for `media`.
    fn codecs_done(&mut self, media: MediaId, out: &mut PeerOutbox);
    /// One remote candidate for `media`.
    fn candidate(&mut self, media: MediaId, candidate: Candidate, out: &mut PeerOutbox);
    /// The remote side finished sending candidates for `media`.
    fn candidates_done(&mut self, media: MediaId, out: &mut PeerOutbox);
    /// Push the locally available codecs to the remote side.
    fn send_local_codecs(&mut self, out: &mut PeerOutbox);
    /// The connection carrying this participant's traffic is gone. The
    /// handler is dropped right after.
    fn error(&mut self) {}
}

/// Creates handlers for newly introduced participants.
///
/// The outbox lets a new handler start talking immediately (e.g. push its
/// local candidates).
pub trait ParticipantFactory: Send {
    fn create(&mut self, info: &ParticipantInfo, out: &mut PeerOutbox) -> Box<dyn Participant>;
}

impl<F> ParticipantFactory for F
where
    F: FnMut(&ParticipantInfo, &mut PeerOutbox) -> Box<dyn Participant> + Send,
{
    fn create(&mut self, info: &ParticipantInfo, out: &mut PeerOutbox) -> Box<dyn Participant> {
        self(info, out)
    }
}
