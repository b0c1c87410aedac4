//! Playlist stores
//!
//! Two implementations share one capability set:
//! - [`CacheStore`]: in-memory track list, the read path for commands
//! - [`DurableStore`]: SQLite-backed, the source of truth across restarts
//!
//! Each store owns an independent node graph. Nodes are matched across stores
//! by song id, never by node id.

mod cache;
mod durable;

pub use cache::CacheStore;
pub use durable::DurableStore;

use crate::error::StoreResult;
use crate::playlist::{Song, TrackList, TrackNode};
use async_trait::async_trait;

#[async_trait]
pub trait Store: Send + Sync {
    /// Append a song and return it as stored
    async fn add_song(&self, song: Song) -> StoreResult<Song>;

    /// Snapshot of the whole playlist
    async fn get_playlist(&self) -> StoreResult<TrackList>;

    /// Make the node's song current
    async fn set_current(&self, node: &TrackNode) -> StoreResult<()>;

    /// Current node, if any
    async fn get_current(&self) -> StoreResult<Option<TrackNode>>;
}
