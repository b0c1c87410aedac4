//! Database models

use serde::{Deserialize, Serialize};

/// Row of the `songs` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SongRow {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub duration_ms: i64,
}

/// Row of the `playlists` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlaylistRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub current_song_id: Option<i64>,
}
