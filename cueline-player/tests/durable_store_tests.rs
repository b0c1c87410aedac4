//! Controller against the SQLite store
//!
//! Covers what the in-memory double cannot: persistence of the current song
//! across a restart and cache warm-up from a real database.

use cueline_common::db::{init_database, init_memory_database};
use cueline_player::playback::{ControllerConfig, ManualClock, PlaybackController};
use cueline_player::store::{CacheStore, DurableStore, Store};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

async fn durable_on(pool: SqlitePool, playlist: &str) -> Arc<DurableStore> {
    let durable = Arc::new(DurableStore::new(pool));
    let id = durable.ensure_playlist(playlist).await.unwrap();
    durable.set_default_playlist_id(id).await;
    durable
}

fn controller_for(durable: Arc<DurableStore>) -> (PlaybackController, Arc<CacheStore>) {
    let cache = Arc::new(CacheStore::new());
    let controller = PlaybackController::with_clock(
        cache.clone(),
        durable,
        Arc::new(ManualClock::new()),
        ControllerConfig::default(),
    );
    (controller, cache)
}

#[tokio::test]
async fn test_add_and_skip_persist_to_database() {
    let pool = init_memory_database().await.unwrap();
    let durable = durable_on(pool.clone(), "default").await;
    let (controller, _cache) = controller_for(durable.clone());

    let a = controller.add_song("Alpha", "X", Duration::from_secs(60)).await.unwrap();
    let b = controller.add_song("Beta", "Y", Duration::from_secs(90)).await.unwrap();

    controller.next().await.unwrap();

    let current = durable.get_current().await.unwrap().unwrap();
    assert_eq!(current.song().id, b.id);

    let list = durable.get_playlist().await.unwrap();
    let ids: Vec<_> = list.songs().map(|s| s.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);

    controller.shutdown().await;
}

#[tokio::test]
async fn test_restart_warms_cache_from_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cueline.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        let durable = durable_on(pool.clone(), "evening").await;
        let (controller, _) = controller_for(durable);
        for title in ["One", "Two", "Three"] {
            controller.add_song(title, "Band", Duration::from_secs(30)).await.unwrap();
        }
        controller.next().await.unwrap();
        controller.next().await.unwrap();
        controller.shutdown().await;
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let durable = durable_on(pool, "evening").await;
    let (controller, cache) = controller_for(durable);

    assert_eq!(controller.init_cache().await.unwrap(), 3);

    let titles: Vec<_> = cache
        .get_playlist()
        .await
        .unwrap()
        .songs()
        .map(|s| s.title.clone())
        .collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
    assert_eq!(controller.get_current_song().await.unwrap().title, "Three");

    // Warm cache supports navigation straight away
    controller.prev().await.unwrap();
    assert_eq!(controller.get_current_song().await.unwrap().title, "Two");
    controller.shutdown().await;
}

#[tokio::test]
async fn test_init_cache_on_empty_playlist() {
    let pool = init_memory_database().await.unwrap();
    let durable = durable_on(pool, "default").await;
    let (controller, cache) = controller_for(durable);

    assert_eq!(controller.init_cache().await.unwrap(), 0);
    assert_eq!(cache.len().await, 0);
    controller.play().await.unwrap();
    assert_eq!(controller.clock_stats().started, 0);
}

#[tokio::test]
async fn test_init_cache_without_default_playlist_fails() {
    let pool = init_memory_database().await.unwrap();
    let durable = Arc::new(DurableStore::new(pool));
    let (controller, _) = controller_for(durable);

    let err = controller.init_cache().await.unwrap_err();
    assert!(err.to_string().contains("default playlist not set"));
}

#[tokio::test]
async fn test_playlists_are_isolated() {
    let pool = init_memory_database().await.unwrap();
    let morning = durable_on(pool.clone(), "morning").await;
    let evening = durable_on(pool, "evening").await;

    let (controller, _) = controller_for(morning.clone());
    controller.add_song("Sunrise", "Band", Duration::from_secs(10)).await.unwrap();

    assert_eq!(morning.get_playlist().await.unwrap().len(), 1);
    assert!(evening.get_playlist().await.unwrap().is_empty());
}
