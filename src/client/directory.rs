use std::collections::BTreeMap;

use crate::participant::Participant;
use crate::protocol::ParticipantId;

/// Participant handlers of a client, keyed by remote id.
#[derive(Default)]
pub struct Directory {
    entries: BTreeMap<ParticipantId, DirectoryEntry>,
}

pub struct DirectoryEntry {
    pub name: String,
    pub handler: Box<dyn Participant>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handler for `id`, creating it with `create` the first
    /// time. The flag is `true` when the handler was just created.
    pub fn get_or_create<F>(
        &mut self,
        id: ParticipantId,
        name: &str,
        create: F,
    ) -> (&mut DirectoryEntry, bool)
    where
        F: FnOnce() -> Box<dyn Participant>,
    {
        let mut created = false;
        let entry = self.entries.entry(id).or_insert_with(|| {
            created = true;
            DirectoryEntry {
                name: name.to_owned(),
                handler: create(),
            }
        });
        (entry, created)
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut DirectoryEntry> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn name(&self, id: ParticipantId) -> Option<&str> {
        self.entries.get(&id).map(|e| e.name.as_str())
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.entries.keys().copied().collect()
    }

    /// Drop every handler.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::participant::PeerOutbox;
    use crate::protocol::{Candidate, Codec, MediaId};

    struct Idle;

    impl Participant for Idle {
        fn codec(&mut self, _: MediaId, _: Codec, _: &mut PeerOutbox) {}
        fn codecs_done(&mut self, _: MediaId, _: &mut PeerOutbox) {}
        fn candidate(&mut self, _: MediaId, _: Candidate, _: &mut PeerOutbox) {}
        fn candidates_done(&mut self, _: MediaId, _: &mut PeerOutbox) {}
        fn send_local_codecs(&mut self, _: &mut PeerOutbox) {}
    }

    #[test]
    fn handler_is_created_once_per_id() {
        let mut dir = Directory::new();
        let mut made = 0;

        let (_, created) = dir.get_or_create(3, "bob", || {
            made += 1;
            Box::new(Idle)
        });
        assert!(created);
        let (entry, created) = dir.get_or_create(3, "renamed", || {
            made += 1;
            Box::new(Idle)
        });
        assert!(!created);
        assert_eq!(entry.name, "bob");
        assert_eq!(made, 1);

        dir.get_or_create(1, "hub", || Box::new(Idle));
        assert_eq!(dir.ids(), vec![1, 3]);
        assert!(dir.contains(1));
        assert!(dir.get_mut(9).is_none());
        assert_eq!(dir.name(3), Some("bob"));
    }
}
