//! Interaction, recommendation and stats endpoints
//!
//! Called by the presentation layer on behalf of users.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use trackgraph_core::{Candidate, GraphStats, InteractionRecord, Principal, QueryBudget, TrackId};

use super::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordInteractionRequest {
    pub user: String,
    pub track_id: u64,
    /// Wire form: "view", "like" or "share"
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct RecordInteractionResponse {
    pub track_id: TrackId,
    pub interaction_count: u64,
}

#[derive(Debug, Serialize)]
pub struct InteractionStatusResponse {
    pub user: Principal,
    pub track_id: TrackId,
    pub has_interacted: bool,
    pub record: Option<InteractionRecord>,
}

/// Optional per-request budget; each limit can only tighten the configured
/// default, never loosen it
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub max_steps: Option<u64>,
    pub max_millis: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user: Principal,
    pub tracks: Vec<TrackId>,
    pub candidates: Vec<Candidate>,
    pub truncated: bool,
}

/// POST /api/interactions
pub async fn record_interaction(
    State(state): State<AppState>,
    Json(request): Json<RecordInteractionRequest>,
) -> Result<Json<RecordInteractionResponse>, ApiError> {
    let user = Principal::new(request.user);
    let track_id = TrackId(request.track_id);
    let interaction_count = state
        .graph
        .record_interaction_str(&user, track_id, &request.kind)?;

    Ok(Json(RecordInteractionResponse {
        track_id,
        interaction_count,
    }))
}

/// GET /api/interactions/:user/:track_id
pub async fn get_interaction(
    State(state): State<AppState>,
    Path((user, track_id)): Path<(String, u64)>,
) -> Json<InteractionStatusResponse> {
    let user = Principal::new(user);
    let track_id = TrackId(track_id);
    let record = state.graph.interaction(&user, track_id);

    Json(InteractionStatusResponse {
        has_interacted: state.graph.has_interacted(&user, track_id),
        user,
        track_id,
        record,
    })
}

/// GET /api/recommendations/:user
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> Json<RecommendationResponse> {
    let user = Principal::new(user);
    let budget = tighten(state.graph.default_budget(), &query);

    let recs = state.graph.recommend(&user, budget);

    Json(RecommendationResponse {
        user,
        tracks: recs.track_ids(),
        candidates: recs.candidates,
        truncated: recs.truncated,
    })
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<GraphStats> {
    Json(state.graph.stats())
}

fn tighten(default: QueryBudget, query: &RecommendationQuery) -> QueryBudget {
    fn min_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    QueryBudget {
        max_steps: min_opt(default.max_steps, query.max_steps),
        max_duration: min_opt(
            default.max_duration,
            query.max_millis.map(Duration::from_millis),
        ),
    }
}
