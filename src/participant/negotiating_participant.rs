use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::log::LogSink;
use crate::participant::{Participant, ParticipantFactory, ParticipantInfo, PeerOutbox};
use crate::protocol::{CODEC_ID_ANY, Candidate, Codec, MediaId, ParticipantId};
use crate::{sink_debug, sink_info, sink_warn};

/// What this process offers for one media id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaConfig {
    pub media: MediaId,
    pub codecs: Vec<Codec>,
    pub candidates: Vec<Candidate>,
}

/// Intersect the remote codec list with the local one.
///
/// Remote order wins. A pair matches on media type, encoding name (ignoring
/// case) and clock rate, where 0 on either side accepts any rate. Disabled
/// codecs on either side never match. The result keeps the remote codec,
/// takes the local id and clock rate when the remote leaves them open, and
/// inherits local parameters the remote did not set.
#[must_use]
pub fn negotiate_codecs(local: &[Codec], remote: &[Codec]) -> Vec<Codec> {
    let mut out = Vec::new();
    for r in remote.iter().filter(|c| !c.is_disabled()) {
        let Some(l) = local.iter().filter(|c| !c.is_disabled()).find(|l| {
            l.media_type == r.media_type
                && l.encoding_name.eq_ignore_ascii_case(&r.encoding_name)
                && (l.clock_rate == 0 || r.clock_rate == 0 || l.clock_rate == r.clock_rate)
        }) else {
            continue;
        };

        let mut codec = r.clone();
        if codec.id == CODEC_ID_ANY {
            codec.id = l.id;
        }
        if codec.clock_rate == 0 {
            codec.clock_rate = l.clock_rate;
        }
        if codec.channels == 0 {
            codec.channels = l.channels;
        }
        for (k, v) in &l.params {
            if codec.param(k).is_none() {
                codec.params.push((k.clone(), v.clone()));
            }
        }
        out.push(codec);
    }
    out
}

#[derive(Debug, Default)]
struct MediaState {
    local: MediaConfig,
    pending_codecs: Vec<Codec>,
    remote_codecs: Vec<Codec>,
    negotiated: Vec<Codec>,
    remote_candidates: Vec<Candidate>,
    candidates_complete: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    negotiated: BTreeMap<MediaId, Vec<Codec>>,
    /// Remote candidates complete, still missing session codecs.
    waiting: BTreeMap<ParticipantId, String>,
    ready: BTreeSet<ParticipantId>,
}

impl SessionState {
    fn has_codecs(&self, media: MediaId) -> bool {
        self.negotiated.get(&media).is_some_and(|c| !c.is_empty())
    }

    fn mark_ready(&mut self, log: &dyn LogSink, id: ParticipantId, name: &str, media: usize) {
        self.waiting.remove(&id);
        if self.ready.insert(id) {
            sink_info!(
                log,
                "[{}] participant {} ready: codecs and candidates complete for {} media",
                name,
                id,
                media
            );
        }
    }
}

/// Codecs agreed with the hub, per media id, shared by every handler of one
/// process.
///
/// Codecs only travel between a peer and the hub, so a handler for another
/// peer takes its codecs from here and only brings its own candidates.
#[derive(Debug, Clone, Default)]
pub struct SessionCodecs(Arc<Mutex<SessionState>>);

impl SessionCodecs {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last set agreed with the hub for `media`, empty if none yet.
    pub fn negotiated(&self, media: MediaId) -> Vec<Codec> {
        self.lock().negotiated.get(&media).cloned().unwrap_or_default()
    }

    /// Participants whose media session may start, ascending.
    pub fn ready_participants(&self) -> Vec<ParticipantId> {
        self.lock().ready.iter().copied().collect()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reference handler: negotiates codecs against a local configuration and
/// collects the remote candidates for every configured media id.
pub struct NegotiatingParticipant {
    info: ParticipantInfo,
    media: BTreeMap<MediaId, MediaState>,
    session: SessionCodecs,
    log: Arc<dyn LogSink>,
}

impl NegotiatingParticipant {
    /// Create the handler and queue the local candidates for every media.
    pub fn new(
        info: ParticipantInfo,
        config: &[MediaConfig],
        session: SessionCodecs,
        log: Arc<dyn LogSink>,
        out: &mut PeerOutbox,
    ) -> Self {
        let mut media = BTreeMap::new();
        for m in config {
            for c in &m.candidates {
                out.candidate(m.media, c.clone());
            }
            out.candidates_done(m.media);
            media.insert(
                m.media,
                MediaState {
                    local: m.clone(),
                    ..MediaState::default()
                },
            );
        }
        Self {
            info,
            media,
            session,
            log,
        }
    }

    pub fn info(&self) -> &ParticipantInfo {
        &self.info
    }

    /// Codecs for `media`: the set agreed with this participant, or the
    /// session set when it sent none.
    pub fn negotiated_codecs(&self, media: MediaId) -> Option<Vec<Codec>> {
        let state = self.media.get(&media)?;
        if state.negotiated.is_empty() {
            Some(self.session.negotiated(media))
        } else {
            Some(state.negotiated.clone())
        }
    }

    pub fn remote_codecs(&self, media: MediaId) -> Option<&[Codec]> {
        self.media.get(&media).map(|m| m.remote_codecs.as_slice())
    }

    pub fn remote_candidates(&self, media: MediaId) -> Option<&[Candidate]> {
        self.media.get(&media).map(|m| m.remote_candidates.as_slice())
    }

    /// Every media has a negotiated codec and the remote candidate list.
    pub fn is_ready(&self) -> bool {
        self.is_ready_with(&self.session.lock())
    }

    fn is_ready_with(&self, session: &SessionState) -> bool {
        !self.media.is_empty()
            && self.media.iter().all(|(id, m)| {
                m.candidates_complete && (!m.negotiated.is_empty() || session.has_codecs(*id))
            })
    }

    fn candidates_complete(&self) -> bool {
        self.media.values().all(|m| m.candidates_complete)
    }

    fn state(&mut self, media: MediaId) -> Option<&mut MediaState> {
        let state = self.media.get_mut(&media);
        if state.is_none() {
            sink_debug!(
                self.log,
                "[{}] ignoring message for unconfigured media {}",
                self.info.name,
                media
            );
        }
        state
    }

    fn send_codecs(state: &MediaState, out: &mut PeerOutbox) {
        let media = state.local.media;
        let codecs = if state.negotiated.is_empty() {
            &state.local.codecs
        } else {
            &state.negotiated
        };
        for c in codecs.iter().filter(|c| !c.is_disabled()) {
            out.codec(media, c.clone());
        }
        out.codecs_done(media);
    }

    fn check_ready(&self) {
        let mut session = self.session.lock();
        if session.ready.contains(&self.info.id) {
            return;
        }
        if self.is_ready_with(&session) {
            session.mark_ready(self.log.as_ref(), self.info.id, &self.info.name, self.media.len());
        } else if self.candidates_complete() {
            session
                .waiting
                .insert(self.info.id, self.info.name.clone());
        }
    }

    /// Make `codecs` the session set for `media` and release the peers that
    /// only waited for it.
    fn publish(&self, media: MediaId, codecs: &[Codec]) {
        let mut session = self.session.lock();
        session.negotiated.insert(media, codecs.to_vec());
        if !self.media.keys().all(|m| session.has_codecs(*m)) {
            return;
        }
        let waiting = std::mem::take(&mut session.waiting);
        for (id, name) in waiting {
            session.mark_ready(self.log.as_ref(), id, &name, self.media.len());
        }
    }
}

impl Participant for NegotiatingParticipant {
    fn codec(&mut self, media: MediaId, codec: Codec, _out: &mut PeerOutbox) {
        if let Some(state) = self.state(media) {
            state.pending_codecs.push(codec);
        }
    }

    fn codecs_done(&mut self, media: MediaId, out: &mut PeerOutbox) {
        let hub_involved = self.info.is_hub() || self.info.local_is_hub();
        let (name, id) = (self.info.name.clone(), self.info.id);
        let log = self.log.clone();
        let Some(state) = self.state(media) else {
            return;
        };
        let mut agreed = None;

        // An empty round keeps what the remote offered before.
        if !state.pending_codecs.is_empty() {
            state.remote_codecs = std::mem::take(&mut state.pending_codecs);
        }

        let negotiated = negotiate_codecs(&state.local.codecs, &state.remote_codecs);
        if negotiated.is_empty() {
            sink_warn!(
                log,
                "no common codec with {} ({}) for media {}",
                name,
                id,
                media
            );
        }
        if negotiated != state.negotiated {
            state.negotiated = negotiated;
            if hub_involved && !state.negotiated.is_empty() {
                Self::send_codecs(state, out);
                agreed = Some(state.negotiated.clone());
            }
        }
        if let Some(codecs) = agreed {
            self.publish(media, &codecs);
        }
        self.check_ready();
    }

    fn candidate(&mut self, media: MediaId, candidate: Candidate, _out: &mut PeerOutbox) {
        if let Some(state) = self.state(media) {
            state.remote_candidates.push(candidate);
        }
    }

    fn candidates_done(&mut self, media: MediaId, _out: &mut PeerOutbox) {
        if let Some(state) = self.state(media) {
            state.candidates_complete = true;
        }
        self.check_ready();
    }

    fn send_local_codecs(&mut self, out: &mut PeerOutbox) {
        for state in self.media.values() {
            Self::send_codecs(state, out);
        }
    }

    fn error(&mut self) {
        let mut session = self.session.lock();
        session.waiting.remove(&self.info.id);
        session.ready.remove(&self.info.id);
        drop(session);
        sink_info!(
            self.log,
            "connection to {} ({}) lost, dropping media state",
            self.info.name,
            self.info.id
        );
    }
}

/// Builds a [`NegotiatingParticipant`] per introduced participant, all
/// sharing the same local media configuration and [`SessionCodecs`].
/// Clones share both.
#[derive(Clone)]
pub struct NegotiatingFactory {
    media: Arc<Vec<MediaConfig>>,
    session: SessionCodecs,
    log: Arc<dyn LogSink>,
}

impl NegotiatingFactory {
    pub fn new(media: Vec<MediaConfig>, log: Arc<dyn LogSink>) -> Self {
        Self {
            media: Arc::new(media),
            session: SessionCodecs::new(),
            log,
        }
    }

    pub fn session(&self) -> &SessionCodecs {
        &self.session
    }
}

impl ParticipantFactory for NegotiatingFactory {
    fn create(&mut self, info: &ParticipantInfo, out: &mut PeerOutbox) -> Box<dyn Participant> {
        Box::new(NegotiatingParticipant::new(
            info.clone(),
            &self.media,
            self.session.clone(),
            self.log.clone(),
            out,
        ))
    }
}
