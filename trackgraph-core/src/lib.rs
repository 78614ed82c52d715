//! # TrackGraph Core Library
//!
//! Graph-based track recommendation engine:
//! - Graph store: tracks, artists and weighted directed edges between tracks
//! - Interaction tracking: which users engaged with which tracks
//! - Owner-gated removal of tracks
//! - Recommendation query with a fixed-size candidate set and an optional
//!   iteration/time budget
//! - Change notifications for collaborating indexers
//!
//! Everything is in-memory and synchronous. [`TrackGraph`] is the shared
//! entry point; wrap it in `Arc` to use it from several threads or tasks.
//!
//! ```
//! use trackgraph_core::{GraphConfig, InteractionKind, Principal, TrackGraph, TrackId};
//!
//! let graph = TrackGraph::new(GraphConfig::new("0xowner"));
//! graph.add_track_node(TrackId(1), "ipfs://one").unwrap();
//! graph.add_track_node(TrackId(2), "ipfs://two").unwrap();
//! graph.add_track_edge(TrackId(1), TrackId(2), 75).unwrap();
//!
//! let listener = Principal::new("0xlistener");
//! graph.record_interaction(&listener, TrackId(1), InteractionKind::View).unwrap();
//!
//! assert_eq!(graph.get_recommendations(&listener), vec![TrackId(2)]);
//! ```

pub mod access;
pub mod error;
pub mod events;
pub mod graph;
pub mod interactions;
pub mod recommend;
pub mod snapshot;
pub mod store;
pub mod types;

pub use access::AccessController;
pub use error::{GraphError, Result};
pub use events::{EventBus, GraphEvent, GraphObserver};
pub use graph::{GraphConfig, GraphStats, TrackGraph};
pub use interactions::InteractionTracker;
pub use recommend::{Candidate, QueryBudget, RecommendationEngine, Recommendations, MAX_RESULTS};
pub use snapshot::GraphSnapshot;
pub use store::GraphStore;
pub use types::{
    ArtistNode, Edge, InteractionKind, InteractionRecord, Principal, TrackId, TrackNode, MAX_WEIGHT,
};
