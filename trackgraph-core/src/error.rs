//! Error types for graph mutations

use thiserror::Error;

use crate::types::{Principal, TrackId};

/// Result type for TrackGraph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors surfaced by mutating operations
///
/// Every mutation validates before it changes anything, so receiving one of
/// these means no state was committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Referenced track, artist, or edge endpoint does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate registration of a track or artist
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Edge weight outside [0, 100]
    #[error("Invalid weight: {0} (must be 0-100)")]
    InvalidWeight(u32),

    /// Interaction kind outside {view, like, share}
    #[error("Invalid interaction kind: {0:?}")]
    InvalidInteractionKind(String),

    /// Caller is not the graph owner
    #[error("Unauthorized: {0} is not the graph owner")]
    Unauthorized(Principal),
}

impl GraphError {
    pub(crate) fn track_not_found(track_id: TrackId) -> Self {
        GraphError::NotFound(format!("track {}", track_id))
    }

    pub(crate) fn artist_not_found(identity: &Principal) -> Self {
        GraphError::NotFound(format!("artist {}", identity))
    }
}
