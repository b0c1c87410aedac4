//! Shared test fixtures
//!
//! `MemoryDurable` stands in for the SQLite store so tests can inject write
//! failures, `FailingCache` does the same for cache reads, and `Harness` wires
//! a controller to them with a manual clock.

#![allow(dead_code)]

use async_trait::async_trait;
use cueline_common::config::DualWritePolicy;
use cueline_player::error::{StoreError, StoreResult};
use cueline_player::playback::{ControllerConfig, ManualClock, PlaybackController};
use cueline_player::playlist::{Song, SongId, TrackList, TrackNode};
use cueline_player::store::{CacheStore, Store};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// In-memory durable store with switchable failures
pub struct MemoryDurable {
    list: Mutex<TrackList>,
    next_id: AtomicI64,
    fail_add: AtomicBool,
    fail_set_current: AtomicBool,
}

impl MemoryDurable {
    pub fn new() -> Self {
        Self {
            list: Mutex::new(TrackList::new()),
            next_id: AtomicI64::new(1),
            fail_add: AtomicBool::new(false),
            fail_set_current: AtomicBool::new(false),
        }
    }

    pub fn fail_add(&self, fail: bool) {
        self.fail_add.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set_current(&self, fail: bool) {
        self.fail_set_current.store(fail, Ordering::SeqCst);
    }

    pub async fn current_title(&self) -> Option<String> {
        self.list
            .lock()
            .await
            .current()
            .map(|n| n.song().title.clone())
    }
}

fn injected() -> StoreError {
    StoreError::Database(sqlx::Error::PoolClosed)
}

#[async_trait]
impl Store for MemoryDurable {
    async fn add_song(&self, song: Song) -> StoreResult<Song> {
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let id = SongId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let stored = song.with_id(id);
        self.list.lock().await.append(stored.clone());
        Ok(stored)
    }

    async fn get_playlist(&self) -> StoreResult<TrackList> {
        Ok(self.list.lock().await.clone())
    }

    async fn set_current(&self, node: &TrackNode) -> StoreResult<()> {
        if self.fail_set_current.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let mut list = self.list.lock().await;
        let id = list
            .find_by_song(node.song().id)
            .map(TrackNode::id)
            .ok_or(StoreError::NullNode)?;
        list.set_current(id)
    }

    async fn get_current(&self) -> StoreResult<Option<TrackNode>> {
        Ok(self
            .list
            .lock()
            .await
            .current()
            .map(|n| TrackNode::detached(n.song().clone())))
    }
}

/// Cache store whose reads can be made to fail
pub struct FailingCache {
    inner: CacheStore,
    fail_reads: AtomicBool,
}

impl FailingCache {
    pub fn new() -> Self {
        Self {
            inner: CacheStore::new(),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(StoreError::NotInitialized)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for FailingCache {
    async fn add_song(&self, song: Song) -> StoreResult<Song> {
        self.inner.add_song(song).await
    }

    async fn get_playlist(&self) -> StoreResult<TrackList> {
        self.check_reads()?;
        self.inner.get_playlist().await
    }

    async fn set_current(&self, node: &TrackNode) -> StoreResult<()> {
        self.inner.set_current(node).await
    }

    async fn get_current(&self) -> StoreResult<Option<TrackNode>> {
        self.check_reads()?;
        self.inner.get_current().await
    }
}

pub struct Harness {
    pub controller: PlaybackController,
    pub cache: Arc<CacheStore>,
    pub durable: Arc<MemoryDurable>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(tick: Duration, policy: DualWritePolicy) -> Harness {
    let cache = Arc::new(CacheStore::new());
    let durable = Arc::new(MemoryDurable::new());
    let clock = Arc::new(ManualClock::new());
    let controller = PlaybackController::with_clock(
        cache.clone(),
        durable.clone(),
        clock.clone(),
        ControllerConfig {
            tick,
            dual_write_policy: policy,
            ..ControllerConfig::default()
        },
    );
    Harness {
        controller,
        cache,
        durable,
        clock,
    }
}

pub fn default_harness() -> Harness {
    harness(Duration::from_millis(100), DualWritePolicy::Preserve)
}

/// Let spawned tasks run until they block on the clock again
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Advance `clock` in `step` increments, settling after each
pub async fn advance_clock(clock: &ManualClock, total: Duration, step: Duration) {
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        clock.advance(step);
        settle().await;
        elapsed += step;
    }
}

/// Wait for cancelled clock tasks to be polled and exit
pub async fn wait_for_clock_tasks(controller: &PlaybackController) -> u64 {
    for _ in 0..200 {
        let alive = controller.clock_stats().alive;
        if alive == 0 {
            return 0;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    controller.clock_stats().alive
}

impl Harness {
    pub async fn add(&self, title: &str, secs: u64) -> Song {
        self.controller
            .add_song(title, "Test Artist", Duration::from_secs(secs))
            .await
            .expect("add_song")
    }

    /// Advance simulated time in `step` increments, settling after each
    pub async fn advance(&self, total: Duration, step: Duration) {
        advance_clock(&self.clock, total, step).await;
    }

    pub async fn cache_current_title(&self) -> Option<String> {
        self.cache
            .get_current()
            .await
            .expect("cache readable")
            .map(|n| n.song().title.clone())
    }
}
