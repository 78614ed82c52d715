//! Graph store
//!
//! Owns every track, artist and edge. All structural invariants are enforced
//! here:
//! - track ids and artist identities are unique
//! - edge weights stay within [0, 100]
//! - edges are only created between tracks that exist at creation time
//!
//! Removing a track leaves edges that reference it in place. Readers go
//! through [`GraphStore::edge_exists`] / [`GraphStore::live_successors`],
//! which treat an edge with a missing endpoint as absent.
//!
//! The store itself is not synchronized; [`crate::TrackGraph`] wraps it in a
//! reader/writer lock.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::access::AccessController;
use crate::error::{GraphError, Result};
use crate::types::{ArtistNode, Edge, Principal, TrackId, TrackNode, MAX_WEIGHT};

/// Node and edge state
#[derive(Debug, Default)]
pub struct GraphStore {
    tracks: HashMap<TrackId, TrackNode>,
    /// Registration order: seq -> track id (live tracks only)
    order: BTreeMap<u64, TrackId>,
    /// Global track counter; total registrations ever made
    registered_total: u64,
    artists: HashMap<Principal, ArtistNode>,
    /// Outgoing adjacency, may contain dangling endpoints after removals
    edges: HashMap<TrackId, HashMap<TrackId, u8>>,
    /// Ids removed since they were last registered
    removed: HashSet<TrackId>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Register a track with `interaction_count = 0`
    ///
    /// Re-registering an id that was removed purges the stale edges that
    /// still reference it, so the new node starts without relations.
    pub fn add_track_node(&mut self, track_id: TrackId, metadata_uri: impl Into<String>) -> Result<()> {
        if self.tracks.contains_key(&track_id) {
            return Err(GraphError::AlreadyExists(format!("track {}", track_id)));
        }

        if self.removed.remove(&track_id) {
            self.purge_edges(track_id);
        }

        let seq = self.registered_total;
        self.registered_total = self.registered_total.saturating_add(1);

        self.tracks.insert(
            track_id,
            TrackNode {
                track_id,
                metadata_uri: metadata_uri.into(),
                interaction_count: 0,
                seq,
            },
        );
        self.order.insert(seq, track_id);

        debug!("Track {} registered (seq {})", track_id, seq);
        Ok(())
    }

    pub fn add_artist_node(&mut self, identity: Principal, metadata_uri: impl Into<String>) -> Result<()> {
        if self.artists.contains_key(&identity) {
            return Err(GraphError::AlreadyExists(format!("artist {}", identity)));
        }

        debug!("Artist {} registered", identity);
        self.artists.insert(
            identity.clone(),
            ArtistNode {
                identity,
                metadata_uri: metadata_uri.into(),
                track_count: 0,
            },
        );
        Ok(())
    }

    /// Credit an existing track to an existing artist
    ///
    /// Returns the artist's new track count.
    pub fn attribute_track(&mut self, identity: &Principal, track_id: TrackId) -> Result<u64> {
        if !self.tracks.contains_key(&track_id) {
            return Err(GraphError::track_not_found(track_id));
        }
        let artist = self
            .artists
            .get_mut(identity)
            .ok_or_else(|| GraphError::artist_not_found(identity))?;

        artist.track_count = artist.track_count.saturating_add(1);
        Ok(artist.track_count)
    }

    /// Owner-only node removal; edges are left dangling
    pub fn remove_track_node(
        &mut self,
        access: &AccessController,
        caller: &Principal,
        track_id: TrackId,
    ) -> Result<TrackNode> {
        access.authorize(caller)?;

        let node = self
            .tracks
            .remove(&track_id)
            .ok_or_else(|| GraphError::track_not_found(track_id))?;
        self.order.remove(&node.seq);
        self.removed.insert(track_id);

        debug!("Track {} removed by {}", track_id, caller);
        Ok(node)
    }

    /// Create or overwrite the edge `from -> to`
    pub fn add_track_edge(&mut self, from: TrackId, to: TrackId, weight: u32) -> Result<()> {
        if !self.tracks.contains_key(&from) {
            return Err(GraphError::track_not_found(from));
        }
        if !self.tracks.contains_key(&to) {
            return Err(GraphError::track_not_found(to));
        }
        let weight = u8::try_from(weight)
            .ok()
            .filter(|w| u32::from(*w) <= MAX_WEIGHT)
            .ok_or(GraphError::InvalidWeight(weight))?;

        let previous = self.edges.entry(from).or_default().insert(to, weight);
        debug!(
            "Edge {} -> {} set to {} (previous: {:?})",
            from, to, weight, previous
        );
        Ok(())
    }

    /// Increment a track's usage counter; only reachable through
    /// [`crate::InteractionTracker`]
    pub(crate) fn bump_interaction_count(&mut self, track_id: TrackId) -> Result<u64> {
        let node = self
            .tracks
            .get_mut(&track_id)
            .ok_or_else(|| GraphError::track_not_found(track_id))?;
        node.interaction_count = node.interaction_count.saturating_add(1);
        Ok(node.interaction_count)
    }

    fn purge_edges(&mut self, track_id: TrackId) {
        self.edges.remove(&track_id);
        for targets in self.edges.values_mut() {
            targets.remove(&track_id);
        }
        self.edges.retain(|_, targets| !targets.is_empty());
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn track_exists(&self, track_id: TrackId) -> bool {
        self.tracks.contains_key(&track_id)
    }

    pub fn artist_exists(&self, identity: &Principal) -> bool {
        self.artists.contains_key(identity)
    }

    /// True only when the edge was registered and both endpoints still exist
    pub fn edge_exists(&self, from: TrackId, to: TrackId) -> bool {
        self.edge_weight(from, to).is_some()
    }

    pub fn edge_weight(&self, from: TrackId, to: TrackId) -> Option<u8> {
        if !self.track_exists(from) || !self.track_exists(to) {
            return None;
        }
        self.edges.get(&from).and_then(|targets| targets.get(&to)).copied()
    }

    pub fn track(&self, track_id: TrackId) -> Option<&TrackNode> {
        self.tracks.get(&track_id)
    }

    pub fn artist(&self, identity: &Principal) -> Option<&ArtistNode> {
        self.artists.get(identity)
    }

    /// Live tracks in registration order
    pub fn tracks_in_order(&self) -> impl Iterator<Item = &TrackNode> + '_ {
        self.order.values().filter_map(move |id| self.tracks.get(id))
    }

    /// Live successors of `from` with their edge weights, in registration
    /// order of the successor
    pub fn live_successors(&self, from: TrackId) -> Vec<(&TrackNode, u8)> {
        let Some(targets) = self.edges.get(&from) else {
            return Vec::new();
        };

        let mut successors: Vec<(&TrackNode, u8)> = targets
            .iter()
            .filter_map(|(to, weight)| self.tracks.get(to).map(|node| (node, *weight)))
            .collect();
        successors.sort_by_key(|(node, _)| node.seq);
        successors
    }

    pub fn artists(&self) -> impl Iterator<Item = &ArtistNode> + '_ {
        self.artists.values()
    }

    /// Every stored edge, including ones left dangling by removals
    pub fn raw_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().flat_map(|(from, targets)| {
            targets.iter().map(move |(to, weight)| Edge {
                from: *from,
                to: *to,
                weight: *weight,
            })
        })
    }

    /// True if `track_id` was removed and has not been registered again
    pub fn was_removed(&self, track_id: TrackId) -> bool {
        self.removed.contains(&track_id)
    }

    pub fn removed_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.removed.iter().copied()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn artist_count(&self) -> usize {
        self.artists.len()
    }

    /// Number of edges whose endpoints both exist
    pub fn live_edge_count(&self) -> usize {
        self.raw_edges()
            .filter(|e| self.track_exists(e.from) && self.track_exists(e.to))
            .count()
    }

    pub fn registered_total(&self) -> u64 {
        self.registered_total
    }

    // ------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------

    /// Rebuild a store from previously captured parts without re-validating
    /// edge endpoints (dangling edges are part of the captured state)
    pub(crate) fn from_parts(
        tracks: Vec<TrackNode>,
        artists: Vec<ArtistNode>,
        edges: Vec<Edge>,
        removed: Vec<TrackId>,
        registered_total: u64,
    ) -> Self {
        let mut store = GraphStore::new();

        for node in tracks {
            store.registered_total = store.registered_total.max(node.seq.saturating_add(1));
            store.order.insert(node.seq, node.track_id);
            store.tracks.insert(node.track_id, node);
        }
        store.registered_total = store.registered_total.max(registered_total);

        for artist in artists {
            store.artists.insert(artist.identity.clone(), artist);
        }
        for edge in edges {
            let weight = edge.weight.min(MAX_WEIGHT as u8);
            store.edges.entry(edge.from).or_default().insert(edge.to, weight);
        }
        store.removed = removed
            .into_iter()
            .filter(|id| !store.tracks.contains_key(id))
            .collect();

        store
    }
}
