//! SQLite-backed durable store
//!
//! The [`Store`] capability set operates on the default playlist. Playlist and
//! song CRUD used at startup and by the HTTP layer are inherent methods.

use super::Store;
use crate::error::{StoreError, StoreResult};
use crate::playlist::{Song, SongId, TrackList, TrackNode};
use async_trait::async_trait;
use cueline_common::db::{PlaylistRow, SongRow};
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct DurableStore {
    pool: Pool<Sqlite>,
    default_playlist_id: RwLock<Option<i64>>,
}

fn song_from_row(row: SongRow) -> Song {
    Song {
        id: SongId(row.id),
        title: row.title,
        artist: row.artist,
        duration: Duration::from_millis(row.duration_ms.max(0) as u64),
    }
}

fn duration_ms(song: &Song) -> i64 {
    i64::try_from(song.duration.as_millis()).unwrap_or(i64::MAX)
}

impl DurableStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            default_playlist_id: RwLock::new(None),
        }
    }

    pub async fn set_default_playlist_id(&self, playlist_id: i64) {
        *self.default_playlist_id.write().await = Some(playlist_id);
        info!("Default playlist set to {}", playlist_id);
    }

    pub async fn default_playlist_id(&self) -> Option<i64> {
        *self.default_playlist_id.read().await
    }

    async fn require_default(&self) -> StoreResult<i64> {
        self.default_playlist_id()
            .await
            .ok_or(StoreError::DefaultNotSet)
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    pub async fn create_playlist(&self, name: &str, description: Option<&str>) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO playlists (name, description) VALUES (?, ?) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        info!("Created playlist '{}' ({})", name, id);
        Ok(id)
    }

    pub async fn find_playlist_id_by_name(&self, name: &str) -> StoreResult<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM playlists WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Find a playlist by name, creating it if missing
    pub async fn ensure_playlist(&self, name: &str) -> StoreResult<i64> {
        match self.find_playlist_id_by_name(name).await? {
            Some(id) => Ok(id),
            None => self.create_playlist(name, None).await,
        }
    }

    async fn playlist_row(&self, playlist_id: i64) -> StoreResult<PlaylistRow> {
        sqlx::query_as::<_, PlaylistRow>(
            "SELECT id, name, description, current_song_id FROM playlists WHERE id = ?",
        )
        .bind(playlist_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("playlist {}", playlist_id)))
    }

    /// Materialize a playlist as a fresh track list
    ///
    /// An empty playlist is valid. Without a stored current song, the head is current.
    pub async fn get_playlist_by_id(&self, playlist_id: i64) -> StoreResult<TrackList> {
        let playlist = self.playlist_row(playlist_id).await?;

        let rows = sqlx::query_as::<_, SongRow>(
            r#"
            SELECT s.id, s.title, s.artist, s.duration_ms
            FROM songs s
            JOIN playlist_songs ps ON ps.song_id = s.id
            WHERE ps.playlist_id = ?
            ORDER BY ps.song_order
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        let mut list = TrackList::from_songs(rows.into_iter().map(song_from_row));

        if let Some(current_id) = playlist.current_song_id {
            if let Some(node) = list.find_by_song(SongId(current_id)).map(TrackNode::id) {
                list.set_current(node)?;
            }
        }

        debug!(
            "Loaded playlist '{}' with {} songs",
            playlist.name,
            list.len()
        );
        Ok(list)
    }

    pub async fn update_playlist_current_song(
        &self,
        playlist_id: i64,
        song_id: Option<SongId>,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE playlists SET current_song_id = ? WHERE id = ?")
            .bind(song_id.map(|s| s.0))
            .bind(playlist_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("playlist {}", playlist_id)));
        }
        Ok(())
    }

    pub async fn delete_playlist_by_id(&self, playlist_id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(playlist_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("playlist {}", playlist_id)));
        }

        let mut default = self.default_playlist_id.write().await;
        if *default == Some(playlist_id) {
            *default = None;
        }
        info!("Deleted playlist {}", playlist_id);
        Ok(())
    }

    // ========================================================================
    // Songs
    // ========================================================================

    /// Insert a song row without linking it to any playlist
    pub async fn insert_song(&self, song: &Song) -> StoreResult<SongId> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO songs (title, artist, duration_ms) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(duration_ms(song))
        .fetch_one(&self.pool)
        .await?;
        Ok(SongId(id))
    }

    pub async fn get_song_by_id(&self, song_id: SongId) -> StoreResult<Song> {
        sqlx::query_as::<_, SongRow>("SELECT id, title, artist, duration_ms FROM songs WHERE id = ?")
            .bind(song_id.0)
            .fetch_optional(&self.pool)
            .await?
            .map(song_from_row)
            .ok_or_else(|| StoreError::NotFound(format!("song {}", song_id)))
    }

    pub async fn update_song(&self, song: &Song) -> StoreResult<()> {
        if !song.id.is_assigned() {
            return Err(StoreError::NullSong);
        }
        let result = sqlx::query("UPDATE songs SET title = ?, artist = ?, duration_ms = ? WHERE id = ?")
            .bind(&song.title)
            .bind(&song.artist)
            .bind(duration_ms(song))
            .bind(song.id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("song {}", song.id)));
        }
        Ok(())
    }

    /// Delete a song; playlist links go with it and current pointers are cleared
    pub async fn delete_song(&self, song_id: SongId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(song_id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("song {}", song_id)));
        }
        Ok(())
    }

    /// Link a song at the end of a playlist
    pub async fn add_song_to_playlist(&self, playlist_id: i64, song_id: SongId) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO playlist_songs (playlist_id, song_id, song_order)
            SELECT ?, ?, COALESCE(MAX(song_order), 0) + 1
            FROM playlist_songs WHERE playlist_id = ?
            "#,
        )
        .bind(playlist_id)
        .bind(song_id.0)
        .bind(playlist_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_song_from_playlist(&self, playlist_id: i64, song_id: SongId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM playlist_songs WHERE playlist_id = ? AND song_id = ?")
            .bind(playlist_id)
            .bind(song_id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SongNotFound(song_id.0));
        }

        sqlx::query("UPDATE playlists SET current_song_id = NULL WHERE id = ? AND current_song_id = ?")
            .bind(playlist_id)
            .bind(song_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for DurableStore {
    /// Insert the song and append it to the default playlist in one transaction
    ///
    /// The first song of an empty playlist becomes its current song.
    async fn add_song(&self, song: Song) -> StoreResult<Song> {
        let playlist_id = self.require_default().await?;

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO songs (title, artist, duration_ms) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(duration_ms(&song))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO playlist_songs (playlist_id, song_id, song_order)
            SELECT ?, ?, COALESCE(MAX(song_order), 0) + 1
            FROM playlist_songs WHERE playlist_id = ?
            "#,
        )
        .bind(playlist_id)
        .bind(id)
        .bind(playlist_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE playlists SET current_song_id = ? WHERE id = ? AND current_song_id IS NULL")
            .bind(id)
            .bind(playlist_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Durable: stored song {} in playlist {}", id, playlist_id);
        Ok(song.with_id(SongId(id)))
    }

    async fn get_playlist(&self) -> StoreResult<TrackList> {
        let playlist_id = self.require_default().await?;
        self.get_playlist_by_id(playlist_id).await
    }

    async fn set_current(&self, node: &TrackNode) -> StoreResult<()> {
        let playlist_id = self.require_default().await?;
        let song_id = node.song().id;
        if !song_id.is_assigned() {
            return Err(StoreError::NullNode);
        }

        let result = sqlx::query(
            r#"
            UPDATE playlists SET current_song_id = ?
            WHERE id = ?
              AND EXISTS (SELECT 1 FROM playlist_songs WHERE playlist_id = ? AND song_id = ?)
            "#,
        )
        .bind(song_id.0)
        .bind(playlist_id)
        .bind(playlist_id)
        .bind(song_id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing playlist from a song outside it
            self.playlist_row(playlist_id).await?;
            return Err(StoreError::NullNode);
        }

        debug!("Durable: current song -> {}", song_id);
        Ok(())
    }

    async fn get_current(&self) -> StoreResult<Option<TrackNode>> {
        let playlist_id = self.require_default().await?;
        let playlist = self.playlist_row(playlist_id).await?;

        match playlist.current_song_id {
            Some(id) => {
                let song = self.get_song_by_id(SongId(id)).await?;
                Ok(Some(TrackNode::detached(song)))
            }
            None => Ok(None),
        }
    }
}
