//! Shared graph handle
//!
//! [`TrackGraph`] owns one [`GraphStore`] and one [`InteractionTracker`]
//! behind a single reader/writer lock:
//! - mutations take the write lock, validate, then apply; an error leaves
//!   state untouched
//! - queries take the read lock and run concurrently with each other, always
//!   against a consistent state
//! - observers are notified after the write lock is released, in commit order
//!
//! Wrap in `Arc` to share between threads or tasks.

use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::access::AccessController;
use crate::error::Result;
use crate::events::{EventBus, GraphEvent, GraphObserver};
use crate::interactions::InteractionTracker;
use crate::recommend::{QueryBudget, RecommendationEngine, Recommendations};
use crate::snapshot::GraphSnapshot;
use crate::store::GraphStore;
use crate::types::{ArtistNode, InteractionKind, InteractionRecord, Principal, TrackId, TrackNode};

/// Default event buffer per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Construction-time settings
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Identity allowed to remove tracks
    pub owner: Principal,
    /// Budget applied by [`TrackGraph::get_recommendations`]
    pub default_budget: QueryBudget,
    pub event_capacity: usize,
}

impl GraphConfig {
    pub fn new(owner: impl Into<Principal>) -> Self {
        Self {
            owner: owner.into(),
            default_budget: QueryBudget::unbounded(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Counts for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub tracks: usize,
    pub artists: usize,
    pub edges: usize,
    pub users: usize,
    pub registered_total: u64,
}

struct GraphState {
    store: GraphStore,
    interactions: InteractionTracker,
    /// Committed mutations so far; each commit takes the next value as its
    /// delivery ticket
    commits: u64,
}

/// Hands out notification turns in commit order
///
/// A writer takes its ticket under the write lock and waits for its turn
/// after releasing it, so observers may read the graph while a later writer
/// is queued behind them.
struct DeliveryOrder {
    next: Mutex<u64>,
    turn: Condvar,
}

impl DeliveryOrder {
    fn new() -> Self {
        Self {
            next: Mutex::new(0),
            turn: Condvar::new(),
        }
    }

    fn wait_turn(&self, ticket: u64) -> DeliveryTurn<'_> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        while *next != ticket {
            next = self
                .turn
                .wait(next)
                .unwrap_or_else(PoisonError::into_inner);
        }
        DeliveryTurn { order: self }
    }
}

/// Passes the turn on when dropped, including when an observer panics
struct DeliveryTurn<'a> {
    order: &'a DeliveryOrder,
}

impl Drop for DeliveryTurn<'_> {
    fn drop(&mut self) {
        let mut next = self
            .order
            .next
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *next += 1;
        self.order.turn.notify_all();
    }
}

/// Shared track graph
///
/// Observers run on the mutating thread, one event at a time, in commit
/// order. They may query the graph but must not mutate it: a mutation from
/// inside `on_event` would wait for its own turn forever.
pub struct TrackGraph {
    state: RwLock<GraphState>,
    access: AccessController,
    default_budget: QueryBudget,
    events: EventBus,
    observers: RwLock<Vec<Arc<dyn GraphObserver>>>,
    delivery: DeliveryOrder,
}

impl TrackGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self::from_parts(config, GraphStore::new(), InteractionTracker::new())
    }

    /// Rebuild a graph from a snapshot; ownership comes from `config`, not
    /// from the snapshot
    pub fn restore(config: GraphConfig, snapshot: GraphSnapshot) -> Self {
        let (store, interactions) = snapshot.into_parts();
        Self::from_parts(config, store, interactions)
    }

    fn from_parts(config: GraphConfig, store: GraphStore, interactions: InteractionTracker) -> Self {
        Self {
            state: RwLock::new(GraphState {
                store,
                interactions,
                commits: 0,
            }),
            access: AccessController::new(config.owner),
            default_budget: config.default_budget,
            events: EventBus::new(config.event_capacity),
            observers: RwLock::new(Vec::new()),
            delivery: DeliveryOrder::new(),
        }
    }

    // Every mutation validates before touching state, so a panic elsewhere
    // cannot leave a half-applied change behind; a poisoned lock is safe to
    // keep using.
    fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation under the write lock; on success returns its output
    /// and the delivery ticket for its event
    fn commit<T>(&self, apply: impl FnOnce(&mut GraphState) -> Result<T>) -> Result<(T, u64)> {
        let mut state = self.write();
        let output = apply(&mut state)?;
        let ticket = state.commits;
        state.commits += 1;
        Ok((output, ticket))
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    pub fn add_observer(&self, observer: Arc<dyn GraphObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }

    fn notify(&self, ticket: u64, event: GraphEvent) {
        let _turn = self.delivery.wait_turn(ticket);

        let observers: Vec<Arc<dyn GraphObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in &observers {
            observer.on_event(&event);
        }
        self.events.emit_lossy(event);
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn add_track_node(&self, track_id: TrackId, metadata_uri: impl Into<String>) -> Result<()> {
        let metadata_uri = metadata_uri.into();
        let ((), ticket) = self.commit(|state| {
            let was_removed = state.store.was_removed(track_id);
            state.store.add_track_node(track_id, metadata_uri.clone())?;
            if was_removed {
                state.interactions.forget_track(track_id);
            }
            Ok(())
        })?;

        info!("Track {} added ({})", track_id, metadata_uri);
        self.notify(
            ticket,
            GraphEvent::TrackAdded {
                track_id,
                metadata_uri,
                timestamp: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn add_artist_node(&self, identity: Principal, metadata_uri: impl Into<String>) -> Result<()> {
        let metadata_uri = metadata_uri.into();
        let ((), ticket) = self.commit(|state| {
            state
                .store
                .add_artist_node(identity.clone(), metadata_uri.clone())
        })?;

        info!("Artist {} added", identity);
        self.notify(
            ticket,
            GraphEvent::ArtistAdded {
                identity,
                metadata_uri,
                timestamp: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn attribute_track(&self, identity: &Principal, track_id: TrackId) -> Result<u64> {
        let (track_count, ticket) =
            self.commit(|state| state.store.attribute_track(identity, track_id))?;

        info!("Track {} attributed to {} ({} tracks)", track_id, identity, track_count);
        self.notify(
            ticket,
            GraphEvent::TrackAttributed {
                identity: identity.clone(),
                track_id,
                track_count,
                timestamp: Utc::now(),
            },
        );
        Ok(track_count)
    }

    /// Owner-only; fails with `Unauthorized` before checking existence
    pub fn remove_track_node(&self, caller: &Principal, track_id: TrackId) -> Result<()> {
        let (_, ticket) = self.commit(|state| {
            state.store.remove_track_node(&self.access, caller, track_id)
        })?;

        info!("Track {} removed by {}", track_id, caller);
        self.notify(
            ticket,
            GraphEvent::TrackRemoved {
                track_id,
                removed_by: caller.clone(),
                timestamp: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn add_track_edge(&self, from: TrackId, to: TrackId, weight: u32) -> Result<()> {
        let ((), ticket) = self.commit(|state| state.store.add_track_edge(from, to, weight))?;

        info!("Edge {} -> {} weight {}", from, to, weight);
        self.notify(
            ticket,
            GraphEvent::EdgeSet {
                from,
                to,
                // validated above
                weight: weight as u8,
                timestamp: Utc::now(),
            },
        );
        Ok(())
    }

    /// Returns the track's interaction count after this interaction
    pub fn record_interaction(&self, user: &Principal, track_id: TrackId, kind: InteractionKind) -> Result<u64> {
        let (interaction_count, ticket) = self.commit(|state| {
            let GraphState {
                store,
                interactions,
                ..
            } = state;
            interactions.record_interaction(store, user, track_id, kind)
        })?;

        info!("{} {} track {} (count {})", user, kind, track_id, interaction_count);
        self.notify(
            ticket,
            GraphEvent::InteractionRecorded {
                user: user.clone(),
                track_id,
                kind,
                interaction_count,
                timestamp: Utc::now(),
            },
        );
        Ok(interaction_count)
    }

    /// Untyped variant for callers holding the wire form of the kind
    pub fn record_interaction_str(&self, user: &Principal, track_id: TrackId, kind: &str) -> Result<u64> {
        let kind: InteractionKind = kind.parse()?;
        self.record_interaction(user, track_id, kind)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Ranked recommendations under the configured default budget
    ///
    /// With a bounded default budget the list may be partial; callers that
    /// need to know should use [`TrackGraph::recommend`] and check
    /// `truncated`.
    pub fn get_recommendations(&self, user: &Principal) -> Vec<TrackId> {
        let recs = self.recommend(user, self.default_budget);
        if recs.truncated {
            debug!(
                "Recommendations for {} truncated after {} steps",
                user, recs.steps
            );
        }
        recs.track_ids()
    }

    pub fn recommend(&self, user: &Principal, budget: QueryBudget) -> Recommendations {
        let state = self.read();
        RecommendationEngine::new(&state.store, &state.interactions).recommend(user, budget)
    }

    pub fn default_budget(&self) -> QueryBudget {
        self.default_budget
    }

    pub fn track_exists(&self, track_id: TrackId) -> bool {
        self.read().store.track_exists(track_id)
    }

    pub fn artist_exists(&self, identity: &Principal) -> bool {
        self.read().store.artist_exists(identity)
    }

    pub fn edge_exists(&self, from: TrackId, to: TrackId) -> bool {
        self.read().store.edge_exists(from, to)
    }

    pub fn edge_weight(&self, from: TrackId, to: TrackId) -> Option<u8> {
        self.read().store.edge_weight(from, to)
    }

    pub fn has_interacted(&self, user: &Principal, track_id: TrackId) -> bool {
        self.read().interactions.has_interacted(user, track_id)
    }

    pub fn track(&self, track_id: TrackId) -> Option<TrackNode> {
        self.read().store.track(track_id).cloned()
    }

    pub fn artist(&self, identity: &Principal) -> Option<ArtistNode> {
        self.read().store.artist(identity).cloned()
    }

    pub fn interaction(&self, user: &Principal, track_id: TrackId) -> Option<InteractionRecord> {
        self.read().interactions.interaction(user, track_id).cloned()
    }

    pub fn is_owner(&self, identity: &Principal) -> bool {
        self.access.is_owner(identity)
    }

    pub fn owner(&self) -> &Principal {
        self.access.owner()
    }

    pub fn stats(&self) -> GraphStats {
        let state = self.read();
        GraphStats {
            tracks: state.store.track_count(),
            artists: state.store.artist_count(),
            edges: state.store.live_edge_count(),
            users: state.interactions.user_count(),
            registered_total: state.store.registered_total(),
        }
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.read();
        GraphSnapshot::capture(&state.store, &state.interactions)
    }
}

impl std::fmt::Debug for TrackGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackGraph")
            .field("owner", self.access.owner())
            .field("stats", &self.stats())
            .finish()
    }
}
