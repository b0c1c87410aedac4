//! Error types for cueline-player
//!
//! Three layers:
//! - [`StoreError`]: track list and store failures
//! - [`PlaybackError`]: controller commands, each store-backed kind wrapping the
//!   [`StoreError`] that caused it
//! - [`Error`]: everything the service can fail with

use thiserror::Error;

/// Track list and store failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// Song carries no durable identifier
    #[error("song is null or has no identifier")]
    NullSong,

    /// Node is unknown to this track list
    #[error("node is null or not part of this playlist")]
    NullNode,

    /// Store has no playlist loaded
    #[error("playlist not initialized")]
    NotInitialized,

    /// Requested row does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Durable store has no default playlist configured
    #[error("default playlist not set")]
    DefaultNotSet,

    /// No node in the list carries the song identifier
    #[error("song {0} not found in playlist")]
    SongNotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Store result type
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Playback command failures
///
/// Store-backed kinds carry their cause as the error source only, so chain
/// walkers print it once.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("playback is not running")]
    NotPlaying,

    #[error("playback is already paused")]
    AlreadyPaused,

    #[error("no next song in playlist")]
    NoNextSong,

    #[error("no previous song in playlist")]
    NoPrevSong,

    #[error("no current song")]
    NoCurrentSong,

    /// Rejected before reaching any store
    #[error("invalid song: {0}")]
    InvalidSong(String),

    #[error("failed to add song to durable store")]
    AddSongToDb(#[source] StoreError),

    #[error("failed to add song to cache")]
    AddSongToCache(#[source] StoreError),

    #[error("failed to set current song in cache")]
    SetCurrentInCache(#[source] StoreError),

    #[error("failed to set current song in durable store")]
    SetCurrentInDb(#[source] StoreError),

    #[error("failed to get playlist from cache")]
    GetPlaylistFromCache(#[source] StoreError),

    #[error("failed to get current node")]
    GetCurrentNode(#[source] StoreError),
}

impl PlaybackError {
    /// The store failure behind this error, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            PlaybackError::AddSongToDb(e)
            | PlaybackError::AddSongToCache(e)
            | PlaybackError::SetCurrentInCache(e)
            | PlaybackError::SetCurrentInDb(e)
            | PlaybackError::GetPlaylistFromCache(e)
            | PlaybackError::GetCurrentNode(e) => Some(e),
            _ => None,
        }
    }
}

/// Playback command result type
pub type PlaybackResult<T> = std::result::Result<T, PlaybackError>;

/// Main error type for cueline-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] cueline_common::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),
}

/// Convenience Result type using cueline-player Error
pub type Result<T> = std::result::Result<T, Error>;
