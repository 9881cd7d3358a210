use std::collections::HashSet;
use std::sync::Arc;

use crate::hub::{HubError, ParticipantEntry, ParticipantTable, SessionKey};
use crate::log::LogSink;
use crate::participant::{ParticipantFactory, ParticipantInfo, PeerOutbox};
use crate::protocol::{
    ANONYMOUS_ID, Envelope, Frame, HUB_ID, MsgType, ParticipantId, ProtoError, SignalingMsg,
};
use crate::{sink_debug, sink_info, sink_trace};

/// Media id carried by INTRO frames.
const INTRO_MEDIA: u32 = 0;

/// A frame the hub wants written to one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub target: SessionKey,
    pub frame: Frame,
}

/// Sans-IO hub engine.
///
/// Owns the participant table and one handler per participant (the hub's own
/// view of that peer). Every call returns the frames to send; the caller
/// owns the sockets.
pub struct Hub {
    name: String,
    table: ParticipantTable,
    sessions: HashSet<SessionKey>,
    factory: Box<dyn ParticipantFactory>,
    log: Arc<dyn LogSink>,
}

impl Hub {
    pub fn new(
        name: impl Into<String>,
        factory: Box<dyn ParticipantFactory>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            name: name.into(),
            table: ParticipantTable::new(),
            sessions: HashSet::new(),
            factory,
            log,
        }
    }

    /// Display name sent to newcomers in the welcome INTRO.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A socket was accepted. Its peer stays anonymous until it introduces
    /// itself.
    pub fn open_session(&mut self, session: SessionKey) {
        self.sessions.insert(session);
        sink_debug!(self.log, "session {} opened", session);
    }

    /// Route one frame received on `session`.
    pub fn handle_frame(
        &mut self,
        session: SessionKey,
        frame: Frame,
    ) -> Result<Vec<Outgoing>, HubError> {
        if !self.sessions.contains(&session) {
            return Err(HubError::UnknownSession(session));
        }
        if frame.msg_type == MsgType::Error {
            return Err(ProtoError::LocalOnlyType.into());
        }

        let Some(bound) = self.table.id_for_session(session) else {
            let is_self_intro = frame.msg_type == MsgType::Intro
                && frame.src == ANONYMOUS_ID
                && frame.dest == HUB_ID;
            if !is_self_intro {
                return Err(HubError::NotIntroduced {
                    session,
                    msg_type: frame.msg_type,
                });
            }
            return self.introduce(session, &frame);
        };

        if frame.src != bound {
            return Err(HubError::SpoofedSource {
                claimed: frame.src,
                bound,
            });
        }
        if frame.dest == HUB_ID {
            self.deliver_local(bound, &frame)
        } else {
            self.relay(frame)
        }
    }

    /// The connection of `session` is gone. Drops its participant, if any,
    /// without telling the others.
    pub fn handle_disconnect(&mut self, session: SessionKey) -> Option<ParticipantId> {
        self.sessions.remove(&session);
        let mut entry = self.table.remove_session(session)?;
        entry.handler.error();
        sink_info!(
            self.log,
            "participant {} '{}' left ({} remaining)",
            entry.id,
            entry.name,
            self.table.len()
        );
        Some(entry.id)
    }

    /// Ids of the introduced participants, ascending.
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.table.ids()
    }

    pub fn participant_name(&self, id: ParticipantId) -> Option<&str> {
        self.table.get(id).map(|e| e.name.as_str())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Self-introduction of a newcomer.
    ///
    /// Order of the returned frames: the welcome naming the new id, one
    /// announcement per existing participant, then whatever the hub's own
    /// handler for the newcomer wants to send (candidates, local codecs).
    fn introduce(&mut self, session: SessionKey, frame: &Frame) -> Result<Vec<Outgoing>, HubError> {
        let SignalingMsg::Intro { name } = SignalingMsg::decode(MsgType::Intro, &frame.payload)?
        else {
            return Err(ProtoError::InvalidFormat("intro payload").into());
        };
        let id = self.table.allocate_id().ok_or(HubError::IdsExhausted)?;

        let mut out = Vec::with_capacity(self.table.len() + 1);
        out.push(Outgoing {
            target: session,
            frame: intro(HUB_ID, id, &self.name)?,
        });
        for existing in self.table.iter() {
            out.push(Outgoing {
                target: existing.session,
                frame: intro(id, existing.id, &name)?,
            });
        }

        let info = ParticipantInfo {
            id,
            name: name.clone(),
            local_id: HUB_ID,
        };
        let mut outbox = PeerOutbox::new();
        let mut handler = self.factory.create(&info, &mut outbox);
        handler.send_local_codecs(&mut outbox);

        self.table.insert(ParticipantEntry {
            id,
            name,
            session,
            handler,
        });
        sink_info!(
            self.log,
            "participant {} '{}' joined on session {} ({} total)",
            id,
            info.name,
            session,
            self.table.len()
        );

        out.extend(
            outbox
                .into_frames(HUB_ID, id)?
                .into_iter()
                .map(|frame| Outgoing {
                    target: session,
                    frame,
                }),
        );
        Ok(out)
    }

    /// A message addressed to the hub's own view of participant `src`.
    fn deliver_local(&mut self, src: ParticipantId, frame: &Frame) -> Result<Vec<Outgoing>, HubError> {
        let env = Envelope::from_frame(frame)?;
        let entry = self
            .table
            .get_mut(src)
            .ok_or(HubError::UnknownParticipant(src))?;

        let mut outbox = PeerOutbox::new();
        let handler = &mut entry.handler;
        match env.msg {
            SignalingMsg::Intro { .. } => return Err(HubError::AlreadyIntroduced(src)),
            SignalingMsg::Codec(codec) => handler.codec(env.media, codec, &mut outbox),
            SignalingMsg::CodecsDone => handler.codecs_done(env.media, &mut outbox),
            SignalingMsg::Candidate(cand) => handler.candidate(env.media, cand, &mut outbox),
            SignalingMsg::CandidatesDone => handler.candidates_done(env.media, &mut outbox),
        }

        let session = entry.session;
        Ok(outbox
            .into_frames(HUB_ID, src)?
            .into_iter()
            .map(|frame| Outgoing {
                target: session,
                frame,
            })
            .collect())
    }

    /// Forward a frame untouched to the session owning `dest`.
    fn relay(&self, frame: Frame) -> Result<Vec<Outgoing>, HubError> {
        let target = self
            .table
            .session_for(frame.dest)
            .ok_or(HubError::UnknownParticipant(frame.dest))?;
        sink_trace!(
            self.log,
            "relay {} {} -> {} (media {}, {} bytes)",
            frame.msg_type.name(),
            frame.src,
            frame.dest,
            frame.media,
            frame.payload.len()
        );
        Ok(vec![Outgoing { target, frame }])
    }
}

fn intro(src: ParticipantId, dest: ParticipantId, name: &str) -> Result<Frame, ProtoError> {
    Envelope::new(
        src,
        dest,
        INTRO_MEDIA,
        SignalingMsg::Intro {
            name: name.to_owned(),
        },
    )
    .to_frame()
}
