//! Position clock task
//!
//! Advances the transport position in ticks of at most `tick`, and moves to
//! the next song when the current one runs out. The lock is taken per
//! mutation and never held across the tick wait.
//!
//! Auto-advance persists the new current song to the durable store as well as
//! the cache; if either write fails, playback stops.

use super::controller::{AliveGuard, Inner, Transport};
use chrono::Utc;
use cueline_common::events::{PlaybackState, PlayerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Releases ownership and reports whether the task may continue
fn still_valid(inner: &Inner, t: &mut Transport, generation: u64) -> bool {
    if !t.owns(generation) {
        return false;
    }
    if !t.playing {
        inner.release_clock(t, generation);
        return false;
    }
    true
}

/// Stop playback from inside the task
fn halt(inner: &Inner, t: &mut Transport, generation: u64) {
    let old_state = t.state();
    t.playing = false;
    t.position = Duration::ZERO;
    inner.release_clock(t, generation);
    inner.emit_transition(old_state, PlaybackState::Stopped);
}

pub(super) async fn run(
    inner: Arc<Inner>,
    generation: u64,
    token: CancellationToken,
    _alive: AliveGuard,
) {
    debug!("Position clock {} running", generation);

    loop {
        // Snapshot what we are playing and how far in we are
        let (song, position) = {
            let mut t = inner.transport.lock().await;
            if !still_valid(&inner, &mut t, generation) {
                return;
            }
            match inner.cache.get_current().await {
                Ok(Some(node)) => (node.song().clone(), t.position),
                Ok(None) => {
                    info!("Position clock {}: no current song, stopping", generation);
                    halt(&inner, &mut t, generation);
                    return;
                }
                Err(e) => {
                    error!("Position clock {}: cache read failed: {}", generation, e);
                    halt(&inner, &mut t, generation);
                    return;
                }
            }
        };

        let remaining = song.duration.saturating_sub(position);

        if remaining.is_zero() {
            let mut t = inner.transport.lock().await;
            if !still_valid(&inner, &mut t, generation) {
                return;
            }

            let snapshot = match inner.cache.get_playlist().await {
                Ok(list) => list,
                Err(e) => {
                    error!("Position clock {}: cache read failed: {}", generation, e);
                    halt(&inner, &mut t, generation);
                    return;
                }
            };
            let (from, to) = match snapshot.current() {
                Some(current) => (current.clone(), snapshot.successor(current.id()).cloned()),
                None => {
                    halt(&inner, &mut t, generation);
                    return;
                }
            };

            match to {
                Some(to) => {
                    if let Err(e) = inner.move_current(&from, &to).await {
                        error!("Position clock {}: auto-advance failed: {}", generation, e);
                        halt(&inner, &mut t, generation);
                        return;
                    }
                    t.position = Duration::ZERO;
                    info!("Finished '{}', now playing '{}'", from.song().title, to.song().title);
                    inner.emit_song_changed(to.song());
                }
                None => {
                    info!("Finished '{}', end of playlist", from.song().title);
                    halt(&inner, &mut t, generation);
                    return;
                }
            }
            continue;
        }

        let step = remaining.min(inner.tick);

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Position clock {} cancelled during tick", generation);
                return;
            }
            _ = inner.clock.sleep(step) => {}
        }

        let mut t = inner.transport.lock().await;
        if !still_valid(&inner, &mut t, generation) {
            return;
        }
        t.position += step;
        inner.events.emit_lossy(PlayerEvent::PlaybackProgress {
            song_id: song.id.0,
            position_ms: t.position.as_millis() as u64,
            duration_ms: song.duration.as_millis() as u64,
            timestamp: Utc::now(),
        });
    }
}
