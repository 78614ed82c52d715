//! Track, artist and edge endpoints
//!
//! Called by the ingestion pipeline to register what it discovers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use trackgraph_core::{ArtistNode, GraphError, Principal, TrackId, TrackNode};

use super::error::ApiError;
use super::CALLER_HEADER;
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn created() -> (StatusCode, Json<StatusResponse>) {
        (
            StatusCode::CREATED,
            Json(StatusResponse {
                status: "created".to_string(),
            }),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct AddTrackRequest {
    pub track_id: u64,
    pub metadata_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct AddArtistRequest {
    pub identity: String,
    pub metadata_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct AttributeTrackRequest {
    pub track_id: u64,
}

#[derive(Debug, Serialize)]
pub struct AttributeTrackResponse {
    pub identity: Principal,
    pub track_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct AddEdgeRequest {
    pub from: u64,
    pub to: u64,
    pub weight: u32,
}

#[derive(Debug, Serialize)]
pub struct EdgeResponse {
    pub from: TrackId,
    pub to: TrackId,
    pub exists: bool,
    pub weight: Option<u8>,
}

// ============================================================================
// Tracks
// ============================================================================

/// POST /api/tracks
pub async fn add_track(
    State(state): State<AppState>,
    Json(request): Json<AddTrackRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    state
        .graph
        .add_track_node(TrackId(request.track_id), request.metadata_uri)?;
    Ok(StatusResponse::created())
}

/// GET /api/tracks/:track_id
pub async fn get_track(
    State(state): State<AppState>,
    Path(track_id): Path<u64>,
) -> Result<Json<TrackNode>, ApiError> {
    state
        .graph
        .track(TrackId(track_id))
        .map(Json)
        .ok_or_else(|| GraphError::NotFound(format!("track {}", track_id)).into())
}

/// DELETE /api/tracks/:track_id
///
/// Owner-only. The caller identity comes from the `x-caller-identity`
/// header; verifying that identity is the transport layer's job.
pub async fn remove_track(
    State(state): State<AppState>,
    Path(track_id): Path<u64>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(Principal::from)
        .ok_or(ApiError::MissingCaller)?;

    state.graph.remove_track_node(&caller, TrackId(track_id))?;
    info!("Track {} removed via API", track_id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Artists
// ============================================================================

/// POST /api/artists
pub async fn add_artist(
    State(state): State<AppState>,
    Json(request): Json<AddArtistRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    state
        .graph
        .add_artist_node(Principal::new(request.identity), request.metadata_uri)?;
    Ok(StatusResponse::created())
}

/// GET /api/artists/:identity
pub async fn get_artist(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<ArtistNode>, ApiError> {
    let identity = Principal::new(identity);
    state
        .graph
        .artist(&identity)
        .map(Json)
        .ok_or_else(|| GraphError::NotFound(format!("artist {}", identity)).into())
}

/// POST /api/artists/:identity/tracks
pub async fn attribute_track(
    State(state): State<AppState>,
    Path(identity): Path<String>,
    Json(request): Json<AttributeTrackRequest>,
) -> Result<Json<AttributeTrackResponse>, ApiError> {
    let identity = Principal::new(identity);
    let track_count = state
        .graph
        .attribute_track(&identity, TrackId(request.track_id))?;
    Ok(Json(AttributeTrackResponse {
        identity,
        track_count,
    }))
}

// ============================================================================
// Edges
// ============================================================================

/// POST /api/edges
///
/// Creates the edge or replaces its weight.
pub async fn add_edge(
    State(state): State<AppState>,
    Json(request): Json<AddEdgeRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    state
        .graph
        .add_track_edge(TrackId(request.from), TrackId(request.to), request.weight)?;
    Ok(StatusResponse::created())
}

/// GET /api/edges/:from/:to
pub async fn get_edge(
    State(state): State<AppState>,
    Path((from, to)): Path<(u64, u64)>,
) -> Json<EdgeResponse> {
    let (from, to) = (TrackId(from), TrackId(to));
    let weight = state.graph.edge_weight(from, to);
    Json(EdgeResponse {
        from,
        to,
        exists: weight.is_some(),
        weight,
    })
}
