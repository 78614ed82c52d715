//! HTTP API handlers for trackgraph-server

pub mod error;
pub mod graph;
pub mod health;
pub mod recommendations;
pub mod sse;

/// Header carrying the already-authenticated caller identity
pub const CALLER_HEADER: &str = "x-caller-identity";

pub use error::ApiError;
pub use graph::{
    add_artist, add_edge, add_track, attribute_track, get_artist, get_edge, get_track,
    remove_track,
};
pub use health::health_routes;
pub use recommendations::{get_interaction, get_recommendations, get_stats, record_interaction};
pub use sse::event_stream;
