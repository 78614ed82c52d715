//! Graph change notifications
//!
//! Every committed mutation produces one [`GraphEvent`]. Collaborating
//! indexers either implement [`GraphObserver`] and register it on the graph,
//! or subscribe to the [`EventBus`] that every graph carries.
//!
//! Observers run after the write lock is released, so they may call back
//! into the graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{InteractionKind, Principal, TrackId};

/// State change notification, emitted only after the change commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GraphEvent {
    /// A track was registered
    TrackAdded {
        track_id: TrackId,
        metadata_uri: String,
        timestamp: DateTime<Utc>,
    },

    /// The owner removed a track (edges referencing it are left in place)
    TrackRemoved {
        track_id: TrackId,
        removed_by: Principal,
        timestamp: DateTime<Utc>,
    },

    /// An artist was registered
    ArtistAdded {
        identity: Principal,
        metadata_uri: String,
        timestamp: DateTime<Utc>,
    },

    /// A track was credited to an artist
    TrackAttributed {
        identity: Principal,
        track_id: TrackId,
        track_count: u64,
        timestamp: DateTime<Utc>,
    },

    /// An edge was created or its weight replaced
    EdgeSet {
        from: TrackId,
        to: TrackId,
        weight: u8,
        timestamp: DateTime<Utc>,
    },

    /// A user interaction was recorded
    InteractionRecorded {
        user: Principal,
        track_id: TrackId,
        kind: InteractionKind,
        /// Track counter after this interaction
        interaction_count: u64,
        timestamp: DateTime<Utc>,
    },
}

impl GraphEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            GraphEvent::TrackAdded { .. } => "TrackAdded",
            GraphEvent::TrackRemoved { .. } => "TrackRemoved",
            GraphEvent::ArtistAdded { .. } => "ArtistAdded",
            GraphEvent::TrackAttributed { .. } => "TrackAttributed",
            GraphEvent::EdgeSet { .. } => "EdgeSet",
            GraphEvent::InteractionRecorded { .. } => "InteractionRecorded",
        }
    }
}

/// Callback interface for collaborators that need to react to mutations
pub trait GraphObserver: Send + Sync {
    fn on_event(&self, event: &GraphEvent);
}

/// Broadcast fan-out of graph events
///
/// Built on `tokio::sync::broadcast`:
/// - publishing never blocks, a slow subscriber lags instead of stalling writers
/// - subscribers only see events emitted after they subscribed
/// - dropped receivers are cleaned up automatically
///
/// `emit` is synchronous, so the bus works from non-async code too.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GraphEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; returns the number of subscribers that received it
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: GraphEvent) -> Result<usize, broadcast::error::SendError<GraphEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where nobody is listening
    pub fn emit_lossy(&self, event: GraphEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_event() -> GraphEvent {
        GraphEvent::EdgeSet {
            from: TrackId(1),
            to: TrackId(2),
            weight: 60,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let event = edge_event();
        assert_eq!(bus.emit(event.clone()).unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        assert!(bus.emit(edge_event()).is_err());
        // Lossy variant never reports failure
        bus.emit_lossy(edge_event());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bus = EventBus::new(0);
        assert_eq!(bus.capacity(), 1);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(edge_event()).unwrap();
        assert_eq!(json["type"], "EdgeSet");
        assert_eq!(json["from"], 1);
        assert_eq!(json["weight"], 60);
    }

    #[test]
    fn test_event_type_matches_tag() {
        let event = GraphEvent::InteractionRecorded {
            user: Principal::new("u"),
            track_id: TrackId(3),
            kind: InteractionKind::Like,
            interaction_count: 1,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["kind"], "like");
    }
}
