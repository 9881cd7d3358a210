use std::sync::Arc;

use crate::client::{ClientError, Directory};
use crate::log::LogSink;
use crate::participant::{ParticipantFactory, ParticipantInfo, PeerOutbox};
use crate::protocol::{
    ANONYMOUS_ID, Envelope, Frame, HUB_ID, MediaId, ParticipantId, ProtoError, SignalingMsg,
};
use crate::{sink_debug, sink_info, sink_warn};

const INTRO_MEDIA: MediaId = 0;

/// Sans-IO peer state machine.
///
/// Starts anonymous, adopts the id the hub's welcome names, and keeps one
/// handler per participant that introduced itself. Every call returns the
/// frames to send to the hub.
pub struct Client {
    name: String,
    local_id: ParticipantId,
    directory: Directory,
    factory: Box<dyn ParticipantFactory>,
    log: Arc<dyn LogSink>,
}

impl Client {
    pub fn new(
        name: impl Into<String>,
        factory: Box<dyn ParticipantFactory>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            name: name.into(),
            local_id: ANONYMOUS_ID,
            directory: Directory::new(),
            factory,
            log,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Our id, [`ANONYMOUS_ID`] until the hub's welcome arrived.
    pub fn local_id(&self) -> ParticipantId {
        self.local_id
    }

    pub fn is_welcomed(&self) -> bool {
        self.local_id != ANONYMOUS_ID
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// The first frame on a fresh connection: our name, to the hub, from
    /// nobody.
    pub fn intro_frame(&self) -> Result<Frame, ProtoError> {
        self.intro_to(HUB_ID)
    }

    pub fn handle_frame(&mut self, frame: Frame) -> Result<Vec<Frame>, ClientError> {
        let env = Envelope::from_frame(&frame)?;

        if !self.is_welcomed() && env.src != HUB_ID {
            return Err(ClientError::NotWelcomed { src: env.src });
        }

        match env.msg {
            SignalingMsg::Intro { name } => self.handle_intro(env.src, env.dest, name),
            msg => {
                if env.dest != self.local_id {
                    return Err(ClientError::Misrouted { dest: env.dest });
                }
                let src = env.src;
                let entry = self
                    .directory
                    .get_mut(src)
                    .ok_or(ClientError::UnknownParticipant(src))?;

                let mut outbox = PeerOutbox::new();
                let handler = &mut entry.handler;
                match msg {
                    SignalingMsg::Codec(codec) => handler.codec(env.media, codec, &mut outbox),
                    SignalingMsg::CodecsDone => handler.codecs_done(env.media, &mut outbox),
                    SignalingMsg::Candidate(cand) => {
                        handler.candidate(env.media, cand, &mut outbox)
                    }
                    SignalingMsg::CandidatesDone => {
                        handler.candidates_done(env.media, &mut outbox)
                    }
                    SignalingMsg::Intro { .. } => {}
                }
                Ok(outbox.into_frames(self.local_id, src)?)
            }
        }
    }

    /// The hub connection is gone: tell the hub's handler, which owns the
    /// negotiation state, then release every handler.
    pub fn handle_connection_lost(&mut self) {
        sink_warn!(self.log, "[{}] lost the connection to the hub", self.name);
        if let Some(hub) = self.directory.get_mut(HUB_ID) {
            hub.handler.error();
        }
        self.directory.clear();
    }

    fn handle_intro(
        &mut self,
        src: ParticipantId,
        dest: ParticipantId,
        name: String,
    ) -> Result<Vec<Frame>, ClientError> {
        if src == HUB_ID {
            if self.is_welcomed() && dest != self.local_id {
                return Err(ClientError::Rewelcomed {
                    current: self.local_id,
                    offered: dest,
                });
            }
            if !self.is_welcomed() {
                self.local_id = dest;
                sink_info!(self.log, "[{}] hub assigned id {}", self.name, dest);
            }
        } else if dest != self.local_id {
            return Err(ClientError::Misrouted { dest });
        }

        let info = ParticipantInfo {
            id: src,
            name: name.clone(),
            local_id: self.local_id,
        };
        let mut outbox = PeerOutbox::new();
        let factory = &mut self.factory;
        let (_, created) = self
            .directory
            .get_or_create(src, &name, || factory.create(&info, &mut outbox));

        let mut out = Vec::new();
        if created {
            sink_info!(self.log, "[{}] met participant {} '{}'", self.name, src, name);
            // Answer peers so they learn about us; the hub already knows.
            if src != HUB_ID {
                out.push(self.intro_to(src)?);
            }
        } else {
            sink_debug!(self.log, "[{}] repeated intro from {}", self.name, src);
        }
        out.extend(outbox.into_frames(self.local_id, src)?);
        Ok(out)
    }

    fn intro_to(&self, dest: ParticipantId) -> Result<Frame, ProtoError> {
        Envelope::new(
            self.local_id,
            dest,
            INTRO_MEDIA,
            SignalingMsg::Intro {
                name: self.name.clone(),
            },
        )
        .to_frame()
    }
}
