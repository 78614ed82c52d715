//! Per-user interaction tracking
//!
//! Two counters with different meaning live side by side:
//! - the `(user, track)` membership is a set; recording twice is a no-op
//! - `TrackNode::interaction_count` counts every recording, repeats included

use std::collections::HashMap;

use chrono::Utc;

use crate::error::{GraphError, Result};
use crate::store::GraphStore;
use crate::types::{InteractionKind, InteractionRecord, Principal, TrackId};

#[derive(Debug, Default)]
pub struct InteractionTracker {
    by_user: HashMap<Principal, HashMap<TrackId, InteractionRecord>>,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `user` engaged with `track_id`
    ///
    /// Returns the track's interaction count after the increment.
    pub fn record_interaction(
        &mut self,
        store: &mut GraphStore,
        user: &Principal,
        track_id: TrackId,
        kind: InteractionKind,
    ) -> Result<u64> {
        if !store.track_exists(track_id) {
            return Err(GraphError::track_not_found(track_id));
        }

        let count = store.bump_interaction_count(track_id)?;

        let now = Utc::now();
        self.by_user
            .entry(user.clone())
            .or_default()
            .entry(track_id)
            .and_modify(|record| {
                record.kind = kind;
                record.last_at = now;
            })
            .or_insert_with(|| InteractionRecord {
                user: user.clone(),
                track_id,
                kind,
                first_at: now,
                last_at: now,
            });

        Ok(count)
    }

    pub fn has_interacted(&self, user: &Principal, track_id: TrackId) -> bool {
        self.by_user
            .get(user)
            .is_some_and(|tracks| tracks.contains_key(&track_id))
    }

    pub fn interaction(&self, user: &Principal, track_id: TrackId) -> Option<&InteractionRecord> {
        self.by_user.get(user).and_then(|tracks| tracks.get(&track_id))
    }

    /// Tracks `user` has engaged with, in no particular order
    pub fn interacted_tracks(&self, user: &Principal) -> Vec<TrackId> {
        self.by_user
            .get(user)
            .map(|tracks| tracks.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of distinct tracks `user` has engaged with
    pub fn user_track_count(&self, user: &Principal) -> usize {
        self.by_user.get(user).map_or(0, HashMap::len)
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &InteractionRecord> + '_ {
        self.by_user.values().flat_map(|tracks| tracks.values())
    }

    /// Drop every membership referencing `track_id`
    pub(crate) fn forget_track(&mut self, track_id: TrackId) {
        for tracks in self.by_user.values_mut() {
            tracks.remove(&track_id);
        }
        self.by_user.retain(|_, tracks| !tracks.is_empty());
    }

    pub(crate) fn from_records(records: Vec<InteractionRecord>) -> Self {
        let mut tracker = InteractionTracker::new();
        for record in records {
            tracker
                .by_user
                .entry(record.user.clone())
                .or_default()
                .insert(record.track_id, record);
        }
        tracker
    }
}
