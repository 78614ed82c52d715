//! Point-in-time copy of the whole graph
//!
//! Used to persist a graph outside the process and to rebuild it later.
//! Captured and restored under the graph lock, so a snapshot never contains
//! a partially applied mutation.

use serde::{Deserialize, Serialize};

use crate::interactions::InteractionTracker;
use crate::store::GraphStore;
use crate::types::{ArtistNode, Edge, InteractionRecord, TrackId, TrackNode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Global track counter (total registrations ever made)
    pub registered_total: u64,
    /// Live tracks in registration order
    pub tracks: Vec<TrackNode>,
    pub artists: Vec<ArtistNode>,
    /// All stored edges, dangling ones included
    pub edges: Vec<Edge>,
    /// Ids removed and not re-registered
    pub removed: Vec<TrackId>,
    pub interactions: Vec<InteractionRecord>,
}

impl GraphSnapshot {
    /// Capture a store and its interactions in a deterministic order
    pub(crate) fn capture(store: &GraphStore, tracker: &InteractionTracker) -> Self {
        let tracks: Vec<TrackNode> = store.tracks_in_order().cloned().collect();

        let mut artists: Vec<ArtistNode> = store.artists().cloned().collect();
        artists.sort_by(|a, b| a.identity.cmp(&b.identity));

        let mut edges: Vec<Edge> = store.raw_edges().collect();
        edges.sort_by_key(|e| (e.from, e.to));

        let mut removed: Vec<TrackId> = store.removed_ids().collect();
        removed.sort();

        let mut interactions: Vec<InteractionRecord> = tracker.records().cloned().collect();
        interactions.sort_by(|a, b| (&a.user, a.track_id).cmp(&(&b.user, b.track_id)));

        Self {
            registered_total: store.registered_total(),
            tracks,
            artists,
            edges,
            removed,
            interactions,
        }
    }

    /// Rebuild the store and tracker captured by [`GraphSnapshot::capture`]
    ///
    /// Interaction records for tracks that no longer exist are kept, matching
    /// the live behavior where removal leaves memberships alone.
    pub(crate) fn into_parts(self) -> (GraphStore, InteractionTracker) {
        let store = GraphStore::from_parts(
            self.tracks,
            self.artists,
            self.edges,
            self.removed,
            self.registered_total,
        );
        let tracker = InteractionTracker::from_records(self.interactions);
        (store, tracker)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
            && self.artists.is_empty()
            && self.edges.is_empty()
            && self.interactions.is_empty()
    }
}
