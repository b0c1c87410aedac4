//! HTTP server setup and routing

use crate::api::{handlers, sse};
use crate::error::{Error, Result};
use crate::playback::PlaybackController;
use crate::store::DurableStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub controller: PlaybackController,
    /// Direct access for song lookups that bypass the cache
    pub durable: Arc<DurableStore>,
}

/// Build the application router
///
/// Every route except `/events` is bounded by `request_timeout`.
pub fn create_router(ctx: AppContext, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/songs", post(handlers::add_song))
        .route("/songs/:id", get(handlers::get_song))
        .route("/playlist", get(handlers::get_playlist))
        .route("/current", get(handlers::get_current))
        .route("/play", post(handlers::play))
        .route("/pause", post(handlers::pause))
        .route("/next", post(handlers::next))
        .route("/prev", post(handlers::prev))
        .layer(TimeoutLayer::new(request_timeout))
        .route("/events", get(sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve until `shutdown` resolves
pub async fn run(
    listener: TcpListener,
    ctx: AppContext,
    request_timeout: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(ctx, request_timeout);

    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server listening on {}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(e.to_string()))
}
