//! HTTP request handlers
//!
//! Status codes for rejected commands:
//! - AddSong: 400 for invalid input, 500 for store failures
//! - Play: 500
//! - Pause: 409
//! - Next/Prev and current song: 404
//!
//! Any command that fails inside a store answers 500.

use crate::api::server::AppContext;
use crate::error::{PlaybackError, StoreError};
use crate::playlist::{Song, SongId};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSongRequest {
    title: String,
    artist: String,
    /// Seconds
    duration: i64,
}

/// Song as exposed over HTTP; duration in whole seconds
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongResponse {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub duration: u64,
}

impl From<&Song> for SongResponse {
    fn from(song: &Song) -> Self {
        Self {
            id: song.id.0,
            title: song.title.clone(),
            artist: song.artist.clone(),
            duration: song.duration.as_secs(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransportResponse {
    pub state: String,
    pub current: Option<SongResponse>,
    pub position_ms: u64,
    pub duration_ms: u64,
}

type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", message),
        }),
    )
}

/// Map a command failure; store failures are always 500
fn playback_error(err: PlaybackError, rejected: StatusCode) -> ApiError {
    let status = match &err {
        PlaybackError::InvalidSong(_) => StatusCode::BAD_REQUEST,
        e if e.store_error().is_some() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => rejected,
    };
    if let Some(cause) = err.store_error() {
        error!("Command failed: {}: {}", err, cause);
    } else if status.is_server_error() {
        error!("Command failed: {}", err);
    } else {
        warn!("Command rejected: {}", err);
    }
    api_error(status, err)
}

fn ok() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Health & Status
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "cueline-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /status - Transport snapshot
pub async fn status(State(ctx): State<AppContext>) -> Json<TransportResponse> {
    let status = ctx.controller.status().await;
    Json(TransportResponse {
        state: status.state.to_string(),
        position_ms: status.position.as_millis() as u64,
        duration_ms: status
            .current
            .as_ref()
            .map_or(0, |s| s.duration.as_millis() as u64),
        current: status.current.as_ref().map(SongResponse::from),
    })
}

// ============================================================================
// Playlist
// ============================================================================

/// POST /songs - Append a song to the playlist
pub async fn add_song(
    State(ctx): State<AppContext>,
    body: Result<Json<AddSongRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SongResponse>)> {
    let Json(req) = body.map_err(|e| {
        warn!("AddSong: malformed body: {}", e);
        api_error(StatusCode::BAD_REQUEST, e.body_text())
    })?;

    if req.title.trim().is_empty() || req.artist.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "title and artist are required",
        ));
    }
    if req.duration <= 0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "duration must be a positive number of seconds",
        ));
    }

    info!("AddSong request: '{}' by {} ({}s)", req.title, req.artist, req.duration);

    let song = ctx
        .controller
        .add_song(&req.title, &req.artist, Duration::from_secs(req.duration as u64))
        .await
        .map_err(|e| playback_error(e, StatusCode::INTERNAL_SERVER_ERROR))?;

    Ok((StatusCode::CREATED, Json(SongResponse::from(&song))))
}

/// GET /songs/:id - Song record from the durable store
pub async fn get_song(
    State(ctx): State<AppContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SongResponse>> {
    match ctx.durable.get_song_by_id(SongId(id)).await {
        Ok(song) => Ok(Json(SongResponse::from(&song))),
        Err(StoreError::NotFound(what)) => Err(api_error(StatusCode::NOT_FOUND, what)),
        Err(e) => {
            error!("GetSong {} failed: {}", id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

/// GET /playlist - Songs head to tail
pub async fn get_playlist(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<SongResponse>>> {
    let list = ctx
        .controller
        .get_playlist()
        .await
        .map_err(|e| playback_error(e, StatusCode::INTERNAL_SERVER_ERROR))?;

    Ok(Json(list.songs().map(SongResponse::from).collect()))
}

/// GET /current - Current song
pub async fn get_current(State(ctx): State<AppContext>) -> ApiResult<Json<SongResponse>> {
    let song = ctx
        .controller
        .get_current_song()
        .await
        .map_err(|e| playback_error(e, StatusCode::NOT_FOUND))?;

    Ok(Json(SongResponse::from(&song)))
}

// ============================================================================
// Transport
// ============================================================================

/// POST /play
pub async fn play(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    ctx.controller
        .play()
        .await
        .map_err(|e| playback_error(e, StatusCode::INTERNAL_SERVER_ERROR))?;
    Ok(ok())
}

/// POST /pause
pub async fn pause(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    ctx.controller
        .pause()
        .await
        .map_err(|e| playback_error(e, StatusCode::CONFLICT))?;
    Ok(ok())
}

/// POST /next
pub async fn next(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    ctx.controller
        .next()
        .await
        .map_err(|e| playback_error(e, StatusCode::NOT_FOUND))?;
    Ok(ok())
}

/// POST /prev
pub async fn prev(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    ctx.controller
        .prev()
        .await
        .map_err(|e| playback_error(e, StatusCode::NOT_FOUND))?;
    Ok(ok())
}
