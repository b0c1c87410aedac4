//! Event types for the Cueline event system
//!
//! The player emits these on an [`EventBus`]; the HTTP layer forwards them to
//! clients as Server-Sent Events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Transport state as seen from outside the controller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Player event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Transport moved between stopped, playing and paused
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// The current pointer moved to another song
    ///
    /// Emitted for Next/Prev commands and for auto-advance at the end of a song.
    CurrentSongChanged {
        song_id: i64,
        title: String,
        artist: String,
        timestamp: DateTime<Utc>,
    },

    /// A song was appended to the playlist
    SongAdded {
        song_id: i64,
        title: String,
        artist: String,
        timestamp: DateTime<Utc>,
    },

    /// Position clock tick
    PlaybackProgress {
        song_id: i64,
        position_ms: u64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Get event type as string (used as the SSE `event:` field)
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::CurrentSongChanged { .. } => "CurrentSongChanged",
            PlayerEvent::SongAdded { .. } => "SongAdded",
            PlayerEvent::PlaybackProgress { .. } => "PlaybackProgress",
        }
    }
}

/// Broadcast bus for [`PlayerEvent`]
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PlayerEvent::PlaybackStateChanged {
            old_state: PlaybackState::Stopped,
            new_state: PlaybackState::Playing,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlaybackStateChanged");
        assert_eq!(json["old_state"], "stopped");
        assert_eq!(json["new_state"], "playing");
        assert_eq!(event.event_type(), "PlaybackStateChanged");
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit_lossy(PlayerEvent::SongAdded {
            song_id: 7,
            title: "Blue".to_string(),
            artist: "Joni".to_string(),
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            PlayerEvent::SongAdded { song_id, .. } => assert_eq!(song_id, 7),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit_lossy(PlayerEvent::PlaybackProgress {
            song_id: 1,
            position_ms: 0,
            duration_ms: 1000,
            timestamp: Utc::now(),
        });
        assert_eq!(bus.capacity(), 4);
    }
}
