//! Node, identity and interaction types shared by every graph component

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Upper bound (inclusive) for edge weights
pub const MAX_WEIGHT: u32 = 100;

/// Externally assigned track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TrackId {
    fn from(value: u64) -> Self {
        TrackId(value)
    }
}

/// External principal: an artist identity, a user, or the graph owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(identity: impl Into<String>) -> Self {
        Principal(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(value: &str) -> Self {
        Principal(value.to_string())
    }
}

impl From<String> for Principal {
    fn from(value: String) -> Self {
        Principal(value)
    }
}

/// Kind of user engagement with a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    View,
    Like,
    Share,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Like => "like",
            InteractionKind::Share => "share",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = GraphError;

    /// Parses the wire form; anything outside {view, like, share} is
    /// rejected with `InvalidInteractionKind`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(InteractionKind::View),
            "like" => Ok(InteractionKind::Like),
            "share" => Ok(InteractionKind::Share),
            other => Err(GraphError::InvalidInteractionKind(other.to_string())),
        }
    }
}

/// Track vertex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackNode {
    pub track_id: TrackId,
    pub metadata_uri: String,
    /// Usage counter; grows on every recorded interaction
    pub interaction_count: u64,
    /// Registration sequence number (ordering key for enumeration)
    pub seq: u64,
}

/// Artist vertex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistNode {
    pub identity: Principal,
    pub metadata_uri: String,
    pub track_count: u64,
}

/// Directed weighted relation between two tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: TrackId,
    pub to: TrackId,
    pub weight: u8,
}

/// A user's engagement with one track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user: Principal,
    pub track_id: TrackId,
    /// Most recent interaction kind
    pub kind: InteractionKind,
    pub first_at: DateTime<Utc>,
    pub last_at: DateTime<Utc>,
}
