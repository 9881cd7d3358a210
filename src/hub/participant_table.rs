use std::collections::{BTreeMap, HashMap};

use crate::participant::Participant;
use crate::protocol::{FIRST_ASSIGNED_ID, ParticipantId};

/// Identifies one accepted connection for the lifetime of the hub.
pub type SessionKey = u64;

/// One introduced participant as the hub sees it.
pub struct ParticipantEntry {
    pub id: ParticipantId,
    pub name: String,
    pub session: SessionKey,
    pub handler: Box<dyn Participant>,
}

/// Authoritative id -> participant map plus the session binding.
///
/// Ids start at 2 and are never handed out twice, even after the
/// participant holding one has left.
pub struct ParticipantTable {
    by_id: BTreeMap<ParticipantId, ParticipantEntry>,
    by_session: HashMap<SessionKey, ParticipantId>,
    next_id: Option<ParticipantId>,
}

impl Default for ParticipantTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantTable {
    pub fn new() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_session: HashMap::new(),
            next_id: Some(FIRST_ASSIGNED_ID),
        }
    }

    /// Hand out the next id, `None` once the id space is used up.
    pub fn allocate_id(&mut self) -> Option<ParticipantId> {
        let id = self.next_id?;
        self.next_id = id.checked_add(1);
        Some(id)
    }

    pub fn insert(&mut self, entry: ParticipantEntry) {
        self.by_session.insert(entry.session, entry.id);
        self.by_id.insert(entry.id, entry);
    }

    /// Unbind a session; returns the participant it carried, if any.
    pub fn remove_session(&mut self, session: SessionKey) -> Option<ParticipantEntry> {
        let id = self.by_session.remove(&session)?;
        self.by_id.remove(&id)
    }

    pub fn id_for_session(&self, session: SessionKey) -> Option<ParticipantId> {
        self.by_session.get(&session).copied()
    }

    pub fn session_for(&self, id: ParticipantId) -> Option<SessionKey> {
        self.by_id.get(&id).map(|e| e.session)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&ParticipantEntry> {
        self.by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut ParticipantEntry> {
        self.by_id.get_mut(&id)
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.by_id.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticipantEntry> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::participant::PeerOutbox;
    use crate::protocol::{Candidate, Codec, MediaId};

    struct Silent;

    impl Participant for Silent {
        fn codec(&mut self, _: MediaId, _: Codec, _: &mut PeerOutbox) {}
        fn codecs_done(&mut self, _: MediaId, _: &mut PeerOutbox) {}
        fn candidate(&mut self, _: MediaId, _: Candidate, _: &mut PeerOutbox) {}
        fn candidates_done(&mut self, _: MediaId, _: &mut PeerOutbox) {}
        fn send_local_codecs(&mut self, _: &mut PeerOutbox) {}
    }

    fn entry(id: ParticipantId, session: SessionKey) -> ParticipantEntry {
        ParticipantEntry {
            id,
            name: format!("p{id}"),
            session,
            handler: Box::new(Silent),
        }
    }

    #[test]
    fn ids_start_at_two_and_are_not_reused() {
        let mut t = ParticipantTable::new();
        let a = t.allocate_id().unwrap();
        t.insert(entry(a, 10));
        assert_eq!(a, 2);

        assert_eq!(t.remove_session(10).map(|e| e.id), Some(2));
        assert_eq!(t.allocate_id(), Some(3));
        assert!(t.is_empty());
    }

    #[test]
    fn session_and_id_lookups_agree() {
        let mut t = ParticipantTable::new();
        t.insert(entry(2, 7));
        t.insert(entry(3, 8));
        assert_eq!(t.id_for_session(8), Some(3));
        assert_eq!(t.session_for(2), Some(7));
        assert_eq!(t.ids(), vec![2, 3]);
        assert!(t.remove_session(99).is_none());
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn exhausted_id_space_stops_allocating() {
        let mut t = ParticipantTable::new();
        t.next_id = Some(ParticipantId::MAX);
        assert_eq!(t.allocate_id(), Some(ParticipantId::MAX));
        assert_eq!(t.allocate_id(), None);
    }
}
