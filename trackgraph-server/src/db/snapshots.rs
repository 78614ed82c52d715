//! Snapshot save/load

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use trackgraph_core::{
    ArtistNode, Edge, GraphSnapshot, InteractionKind, InteractionRecord, Principal, TrackId,
    TrackNode,
};

use crate::error::{Error, Result};

const REGISTERED_TOTAL_KEY: &str = "registered_total";

/// Replace the stored snapshot with `snapshot` in a single transaction
pub async fn save_snapshot(pool: &SqlitePool, snapshot: &GraphSnapshot) -> Result<()> {
    let mut tx = pool.begin().await?;

    for table in ["tracks", "artists", "edges", "removed_tracks", "interactions"] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await?;
    }

    for track in &snapshot.tracks {
        sqlx::query(
            "INSERT INTO tracks (track_id, metadata_uri, interaction_count, seq) VALUES (?, ?, ?, ?)",
        )
        .bind(track.track_id.0 as i64)
        .bind(&track.metadata_uri)
        .bind(track.interaction_count as i64)
        .bind(track.seq as i64)
        .execute(&mut *tx)
        .await?;
    }

    for artist in &snapshot.artists {
        sqlx::query("INSERT INTO artists (identity, metadata_uri, track_count) VALUES (?, ?, ?)")
            .bind(artist.identity.as_str())
            .bind(&artist.metadata_uri)
            .bind(artist.track_count as i64)
            .execute(&mut *tx)
            .await?;
    }

    for edge in &snapshot.edges {
        sqlx::query("INSERT INTO edges (from_track, to_track, weight) VALUES (?, ?, ?)")
            .bind(edge.from.0 as i64)
            .bind(edge.to.0 as i64)
            .bind(i64::from(edge.weight))
            .execute(&mut *tx)
            .await?;
    }

    for track_id in &snapshot.removed {
        sqlx::query("INSERT INTO removed_tracks (track_id) VALUES (?)")
            .bind(track_id.0 as i64)
            .execute(&mut *tx)
            .await?;
    }

    for record in &snapshot.interactions {
        sqlx::query(
            "INSERT INTO interactions (user, track_id, kind, first_at, last_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.user.as_str())
        .bind(record.track_id.0 as i64)
        .bind(record.kind.as_str())
        .bind(record.first_at)
        .bind(record.last_at)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("INSERT OR REPLACE INTO graph_meta (key, value) VALUES (?, ?)")
        .bind(REGISTERED_TOTAL_KEY)
        .bind(snapshot.registered_total.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    debug!(
        "Saved snapshot: {} tracks, {} artists, {} edges, {} interactions",
        snapshot.tracks.len(),
        snapshot.artists.len(),
        snapshot.edges.len(),
        snapshot.interactions.len()
    );
    Ok(())
}

/// Read the stored snapshot (empty if nothing was saved yet)
pub async fn load_snapshot(pool: &SqlitePool) -> Result<GraphSnapshot> {
    let registered_total = sqlx::query_scalar::<_, String>("SELECT value FROM graph_meta WHERE key = ?")
        .bind(REGISTERED_TOTAL_KEY)
        .fetch_optional(pool)
        .await?
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|e| Error::CorruptSnapshot(format!("registered_total: {}", e)))
        })
        .transpose()?
        .unwrap_or(0);

    let tracks = sqlx::query_as::<_, (i64, String, i64, i64)>(
        "SELECT track_id, metadata_uri, interaction_count, seq FROM tracks ORDER BY seq",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(track_id, metadata_uri, interaction_count, seq)| {
        // Every live track was registered before the counter moved past it
        let seq = u64::try_from(seq)
            .ok()
            .filter(|seq| *seq < registered_total)
            .ok_or_else(|| {
                Error::CorruptSnapshot(format!(
                    "track {} has seq {} (registered_total {})",
                    track_id as u64, seq, registered_total
                ))
            })?;
        Ok(TrackNode {
            track_id: TrackId(track_id as u64),
            metadata_uri,
            interaction_count: interaction_count as u64,
            seq,
        })
    })
    .collect::<Result<Vec<_>>>()?;

    let artists = sqlx::query_as::<_, (String, String, i64)>(
        "SELECT identity, metadata_uri, track_count FROM artists ORDER BY identity",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(identity, metadata_uri, track_count)| ArtistNode {
        identity: Principal::new(identity),
        metadata_uri,
        track_count: track_count as u64,
    })
    .collect();

    let edges = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT from_track, to_track, weight FROM edges ORDER BY from_track, to_track",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(from, to, weight)| {
        let weight = u8::try_from(weight)
            .ok()
            .filter(|w| u32::from(*w) <= trackgraph_core::MAX_WEIGHT)
            .ok_or_else(|| Error::CorruptSnapshot(format!("edge weight {} out of range", weight)))?;
        Ok(Edge {
            from: TrackId(from as u64),
            to: TrackId(to as u64),
            weight,
        })
    })
    .collect::<Result<Vec<_>>>()?;

    let removed = sqlx::query_as::<_, (i64,)>("SELECT track_id FROM removed_tracks ORDER BY track_id")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|(track_id,)| TrackId(track_id as u64))
        .collect();

    let interactions = sqlx::query_as::<_, (String, i64, String, DateTime<Utc>, DateTime<Utc>)>(
        "SELECT user, track_id, kind, first_at, last_at FROM interactions ORDER BY user, track_id",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(user, track_id, kind, first_at, last_at)| {
        let kind: InteractionKind = kind
            .parse()
            .map_err(|e| Error::CorruptSnapshot(format!("interaction kind: {}", e)))?;
        Ok(InteractionRecord {
            user: Principal::new(user),
            track_id: TrackId(track_id as u64),
            kind,
            first_at,
            last_at,
        })
    })
    .collect::<Result<Vec<_>>>()?;

    let snapshot = GraphSnapshot {
        registered_total,
        tracks,
        artists,
        edges,
        removed,
        interactions,
    };

    info!(
        "Loaded snapshot: {} tracks, {} artists, {} edges, {} interactions",
        snapshot.tracks.len(),
        snapshot.artists.len(),
        snapshot.edges.len(),
        snapshot.interactions.len()
    );
    Ok(snapshot)
}
