//! HTTP mapping of graph errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use trackgraph_core::GraphError;

use super::CALLER_HEADER;

/// API errors
#[derive(Debug)]
pub enum ApiError {
    Graph(GraphError),
    MissingCaller,
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        ApiError::Graph(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Graph(GraphError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Graph(GraphError::AlreadyExists(_)) => StatusCode::CONFLICT,
            ApiError::Graph(GraphError::InvalidWeight(_)) => StatusCode::BAD_REQUEST,
            ApiError::Graph(GraphError::InvalidInteractionKind(_)) => StatusCode::BAD_REQUEST,
            ApiError::Graph(GraphError::Unauthorized(_)) => StatusCode::FORBIDDEN,
            ApiError::MissingCaller => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Graph(err) => err.to_string(),
            ApiError::MissingCaller => format!("Missing {} header", CALLER_HEADER),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
