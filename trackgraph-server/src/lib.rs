//! trackgraph-server library - HTTP front end for the track graph
//!
//! Wraps a [`TrackGraph`] in an axum router, persists snapshots to SQLite,
//! and streams graph events to subscribers over SSE.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use trackgraph_core::TrackGraph;

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<TrackGraph>,
}

impl AppState {
    pub fn new(graph: Arc<TrackGraph>) -> Self {
        Self { graph }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let graph_routes = Router::new()
        .route("/api/tracks", post(api::add_track))
        .route(
            "/api/tracks/:track_id",
            get(api::get_track).delete(api::remove_track),
        )
        .route("/api/artists", post(api::add_artist))
        .route("/api/artists/:identity", get(api::get_artist))
        .route("/api/artists/:identity/tracks", post(api::attribute_track))
        .route("/api/edges", post(api::add_edge))
        .route("/api/edges/:from/:to", get(api::get_edge));

    let user_routes = Router::new()
        .route("/api/interactions", post(api::record_interaction))
        .route("/api/interactions/:user/:track_id", get(api::get_interaction))
        .route("/api/recommendations/:user", get(api::get_recommendations))
        .route("/api/stats", get(api::get_stats));

    Router::new()
        .merge(graph_routes)
        .merge(user_routes)
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
