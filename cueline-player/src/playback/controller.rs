//! Playback controller
//!
//! Owns the transport state (stopped, playing, paused and the position within
//! the current song) and serializes every command against the position clock
//! task with one async mutex.
//!
//! Track changes are written to the cache store first and the durable store
//! second. At most one position clock task owns the transport at a time; each
//! spawn gets a fresh cancellation token and generation number, and a task only
//! mutates state while its generation is the one recorded in the transport.

use super::clock::{Clock, SystemClock};
use super::position;
use crate::error::{PlaybackError, PlaybackResult, Result};
use crate::playlist::{Song, TrackList, TrackNode};
use crate::store::Store;
use chrono::Utc;
use cueline_common::config::DualWritePolicy;
use cueline_common::events::{EventBus, PlaybackState, PlayerEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Controller tuning
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Longest single wait of the position clock
    pub tick: Duration,
    pub dual_write_policy: DualWritePolicy,
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            dual_write_policy: DualWritePolicy::Preserve,
            event_capacity: 100,
        }
    }
}

/// Running position clock task
pub(super) struct ClockRun {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub(super) struct Transport {
    pub(super) playing: bool,
    pub(super) paused: bool,
    pub(super) position: Duration,
    run: Option<ClockRun>,
    next_generation: u64,
}

impl Transport {
    fn new() -> Self {
        Self {
            playing: false,
            paused: false,
            position: Duration::ZERO,
            run: None,
            next_generation: 0,
        }
    }

    pub(super) fn owns(&self, generation: u64) -> bool {
        self.run.as_ref().is_some_and(|r| r.generation == generation)
    }

    pub(super) fn state(&self) -> PlaybackState {
        if self.playing {
            PlaybackState::Playing
        } else if self.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Stopped
        }
    }
}

/// Position clock task counters
///
/// `started`/`stopped` track ownership of the transport. `alive` tracks
/// spawned futures that have not been dropped yet; a cancelled task stays
/// alive until it is next polled.
#[derive(Debug, Default)]
struct Stats {
    started: AtomicU64,
    stopped: AtomicU64,
    alive: AtomicU64,
    max_alive: AtomicU64,
}

/// Snapshot of [`PlaybackController::clock_stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockStats {
    pub started: u64,
    pub stopped: u64,
    /// Tasks owning the transport; never more than one
    pub outstanding: u64,
    /// Tasks not yet exited, owning or not
    pub alive: u64,
    pub max_alive: u64,
}

/// Counts a clock task as alive until its future is dropped
pub(super) struct AliveGuard {
    inner: Arc<Inner>,
}

impl AliveGuard {
    fn new(inner: Arc<Inner>) -> Self {
        let alive = inner.stats.alive.fetch_add(1, Ordering::SeqCst) + 1;
        inner.stats.max_alive.fetch_max(alive, Ordering::SeqCst);
        Self { inner }
    }
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.inner.stats.alive.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Snapshot of [`PlaybackController::status`]
#[derive(Debug, Clone)]
pub struct TransportStatus {
    pub state: PlaybackState,
    pub current: Option<Song>,
    pub position: Duration,
}

pub(super) struct Inner {
    pub(super) cache: Arc<dyn Store>,
    pub(super) durable: Arc<dyn Store>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) transport: Mutex<Transport>,
    pub(super) events: Arc<EventBus>,
    pub(super) tick: Duration,
    policy: DualWritePolicy,
    stats: Stats,
}

/// Handle to the playback state machine; clones share one transport
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<Inner>,
}

enum Direction {
    Next,
    Prev,
}

impl PlaybackController {
    pub fn new(cache: Arc<dyn Store>, durable: Arc<dyn Store>, config: ControllerConfig) -> Self {
        Self::with_clock(cache, durable, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        cache: Arc<dyn Store>,
        durable: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        config: ControllerConfig,
    ) -> Self {
        let tick = if config.tick.is_zero() {
            warn!("Zero tick requested, using 1s");
            Duration::from_secs(1)
        } else {
            config.tick
        };

        Self {
            inner: Arc::new(Inner {
                cache,
                durable,
                clock,
                transport: Mutex::new(Transport::new()),
                events: Arc::new(EventBus::new(config.event_capacity.max(1))),
                tick,
                policy: config.dual_write_policy,
                stats: Stats::default(),
            }),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.inner.events.subscribe()
    }

    pub fn dual_write_policy(&self) -> DualWritePolicy {
        self.inner.policy
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Copy the durable playlist into the cache, head to tail, then its current pointer
    ///
    /// Runs once before commands are served. Returns the number of songs copied.
    pub async fn init_cache(&self) -> Result<usize> {
        let _transport = self.inner.transport.lock().await;

        let list = self.inner.durable.get_playlist().await?;
        for song in list.songs() {
            self.inner.cache.add_song(song.clone()).await?;
        }
        if let Some(current) = list.current() {
            self.inner.cache.set_current(current).await?;
        }

        info!(
            "Cache initialized with {} songs (current: {})",
            list.len(),
            list.current()
                .map(|n| n.song().title.as_str())
                .unwrap_or("none")
        );
        Ok(list.len())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub async fn play(&self) -> PlaybackResult<()> {
        let mut t = self.inner.transport.lock().await;

        if t.playing {
            debug!("Play: already playing");
            return Ok(());
        }

        if t.paused {
            t.paused = false;
            t.playing = true;
            self.inner.start_clock(&mut t);
            info!("Play: resuming at {:?}", t.position);
            self.inner.emit_transition(PlaybackState::Paused, PlaybackState::Playing);
            return Ok(());
        }

        let current = self
            .inner
            .cache
            .get_current()
            .await
            .map_err(PlaybackError::GetCurrentNode)?;

        match current {
            Some(node) => {
                t.playing = true;
                self.inner.start_clock(&mut t);
                info!("Play: starting '{}'", node.song().title);
                self.inner.emit_transition(PlaybackState::Stopped, PlaybackState::Playing);
            }
            None => info!("Play: playlist is empty, nothing to play"),
        }
        Ok(())
    }

    pub async fn pause(&self) -> PlaybackResult<()> {
        let mut t = self.inner.transport.lock().await;

        if t.paused {
            warn!("Pause rejected: already paused");
            return Err(PlaybackError::AlreadyPaused);
        }
        if !t.playing {
            warn!("Pause rejected: not playing");
            return Err(PlaybackError::NotPlaying);
        }

        self.inner.stop_clock(&mut t);
        t.playing = false;
        t.paused = true;
        info!("Pause: holding at {:?}", t.position);
        self.inner.emit_transition(PlaybackState::Playing, PlaybackState::Paused);
        Ok(())
    }

    pub async fn next(&self) -> PlaybackResult<()> {
        self.skip(Direction::Next).await
    }

    pub async fn prev(&self) -> PlaybackResult<()> {
        self.skip(Direction::Prev).await
    }

    async fn skip(&self, direction: Direction) -> PlaybackResult<()> {
        let mut t = self.inner.transport.lock().await;

        let snapshot = self
            .inner
            .cache
            .get_playlist()
            .await
            .map_err(PlaybackError::GetPlaylistFromCache)?;

        let (from, to) = match neighbour(&snapshot, &direction) {
            Some(pair) => pair,
            None => {
                let err = match direction {
                    Direction::Next => PlaybackError::NoNextSong,
                    Direction::Prev => PlaybackError::NoPrevSong,
                };
                warn!("Skip rejected: {}", err);
                return Err(err);
            }
        };

        let old_state = t.state();
        self.inner.stop_clock(&mut t);
        t.playing = false;
        t.paused = false;
        t.position = Duration::ZERO;

        if let Err(e) = self.inner.move_current(&from, &to).await {
            self.inner.emit_transition(old_state, PlaybackState::Stopped);
            return Err(e);
        }

        t.playing = true;
        self.inner.start_clock(&mut t);
        info!(
            "Skip: '{}' -> '{}'",
            from.song().title,
            to.song().title
        );
        self.inner.emit_song_changed(to.song());
        self.inner.emit_transition(old_state, PlaybackState::Playing);
        Ok(())
    }

    /// Append a song: durable store first, then cache
    pub async fn add_song(
        &self,
        title: &str,
        artist: &str,
        duration: Duration,
    ) -> PlaybackResult<Song> {
        let title = title.trim();
        let artist = artist.trim();
        if title.is_empty() || artist.is_empty() {
            return Err(PlaybackError::InvalidSong(
                "title and artist must not be empty".to_string(),
            ));
        }
        if duration.is_zero() {
            return Err(PlaybackError::InvalidSong(
                "duration must be positive".to_string(),
            ));
        }

        // Held so cache order always matches durable order
        let _transport = self.inner.transport.lock().await;

        let stored = self
            .inner
            .durable
            .add_song(Song::new(title, artist, duration))
            .await
            .map_err(|e| {
                error!("AddSong: durable store failed: {}", e);
                PlaybackError::AddSongToDb(e)
            })?;

        self.inner
            .cache
            .add_song(stored.clone())
            .await
            .map_err(|e| {
                error!("AddSong: cache failed for song {}: {}", stored.id, e);
                PlaybackError::AddSongToCache(e)
            })?;

        info!("Added song {} '{}' by {}", stored.id, stored.title, stored.artist);
        self.inner.events.emit_lossy(PlayerEvent::SongAdded {
            song_id: stored.id.0,
            title: stored.title.clone(),
            artist: stored.artist.clone(),
            timestamp: Utc::now(),
        });
        Ok(stored)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_current_song(&self) -> PlaybackResult<Song> {
        let current = self
            .inner
            .cache
            .get_current()
            .await
            .map_err(PlaybackError::GetCurrentNode)?;
        current
            .map(|node| node.song().clone())
            .ok_or(PlaybackError::NoCurrentSong)
    }

    pub async fn get_playlist(&self) -> PlaybackResult<TrackList> {
        self.inner
            .cache
            .get_playlist()
            .await
            .map_err(PlaybackError::GetPlaylistFromCache)
    }

    pub async fn status(&self) -> TransportStatus {
        let t = self.inner.transport.lock().await;
        let current = match self.inner.cache.get_current().await {
            Ok(node) => node.map(|n| n.song().clone()),
            Err(e) => {
                debug!("Status: cache unavailable: {}", e);
                None
            }
        };
        TransportStatus {
            state: t.state(),
            current,
            position: t.position,
        }
    }

    pub fn clock_stats(&self) -> ClockStats {
        let started = self.inner.stats.started.load(Ordering::SeqCst);
        let stopped = self.inner.stats.stopped.load(Ordering::SeqCst);
        ClockStats {
            started,
            stopped,
            outstanding: started.saturating_sub(stopped),
            alive: self.inner.stats.alive.load(Ordering::SeqCst),
            max_alive: self.inner.stats.max_alive.load(Ordering::SeqCst),
        }
    }

    /// Stop the position clock and wait for its task to finish
    pub async fn shutdown(&self) {
        let run = {
            let mut t = self.inner.transport.lock().await;
            let old_state = t.state();
            let run = t.run.take();
            if let Some(run) = &run {
                run.token.cancel();
                self.inner.stats.stopped.fetch_add(1, Ordering::SeqCst);
            }
            t.playing = false;
            t.paused = false;
            self.inner.emit_transition(old_state, PlaybackState::Stopped);
            run
        };

        if let Some(run) = run {
            if let Err(e) = run.handle.await {
                warn!("Position clock task ended abnormally: {}", e);
            }
        }
        info!("Playback controller shut down");
    }
}

/// Current node and its neighbour in `direction`
fn neighbour(list: &TrackList, direction: &Direction) -> Option<(TrackNode, TrackNode)> {
    let current = list.current()?;
    let target = match direction {
        Direction::Next => list.successor(current.id()),
        Direction::Prev => list.predecessor(current.id()),
    }?;
    Some((current.clone(), target.clone()))
}

impl Inner {
    /// Cancel the owning clock task, if any
    pub(super) fn stop_clock(&self, t: &mut Transport) {
        if let Some(run) = t.run.take() {
            run.token.cancel();
            self.stats.stopped.fetch_add(1, Ordering::SeqCst);
            debug!("Position clock {} cancelled", run.generation);
        }
    }

    /// Release ownership held by a task that is exiting on its own
    pub(super) fn release_clock(&self, t: &mut Transport, generation: u64) {
        if t.owns(generation) {
            t.run = None;
            self.stats.stopped.fetch_add(1, Ordering::SeqCst);
            debug!("Position clock {} released", generation);
        }
    }

    fn start_clock(self: &Arc<Self>, t: &mut Transport) {
        self.stop_clock(t);

        t.next_generation += 1;
        let generation = t.next_generation;
        let token = CancellationToken::new();

        self.stats.started.fetch_add(1, Ordering::SeqCst);
        let guard = AliveGuard::new(Arc::clone(self));

        let handle = tokio::spawn(position::run(
            Arc::clone(self),
            generation,
            token.clone(),
            guard,
        ));
        t.run = Some(ClockRun {
            generation,
            token,
            handle,
        });
        debug!("Position clock {} started", generation);
    }

    /// Point both stores at `to`, cache first
    pub(super) async fn move_current(&self, from: &TrackNode, to: &TrackNode) -> PlaybackResult<()> {
        self.cache.set_current(to).await.map_err(|e| {
            error!("Failed to set current song in cache: {}", e);
            PlaybackError::SetCurrentInCache(e)
        })?;

        if let Err(e) = self.durable.set_current(to).await {
            error!("Failed to set current song in durable store: {}", e);
            if self.policy == DualWritePolicy::RollbackCache {
                match self.cache.set_current(from).await {
                    Ok(()) => info!("Cache current restored to song {}", from.song().id),
                    Err(rollback) => error!("Cache rollback failed: {}", rollback),
                }
            }
            return Err(PlaybackError::SetCurrentInDb(e));
        }
        Ok(())
    }

    pub(super) fn emit_transition(&self, old_state: PlaybackState, new_state: PlaybackState) {
        if old_state == new_state {
            return;
        }
        self.events.emit_lossy(PlayerEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: Utc::now(),
        });
    }

    pub(super) fn emit_song_changed(&self, song: &Song) {
        self.events.emit_lossy(PlayerEvent::CurrentSongChanged {
            song_id: song.id.0,
            title: song.title.clone(),
            artist: song.artist.clone(),
            timestamp: Utc::now(),
        });
    }
}
