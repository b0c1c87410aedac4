//! In-memory cache store

use super::Store;
use crate::error::{StoreError, StoreResult};
use crate::playlist::{NodeId, Song, TrackList, TrackNode};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// Track list held in memory behind its own lock
///
/// Readers take a shared lock and get cloned snapshots, so traversal never
/// blocks on the playback controller.
#[derive(Debug)]
pub struct CacheStore {
    list: RwLock<Option<TrackList>>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    /// Empty, initialized cache
    pub fn new() -> Self {
        Self {
            list: RwLock::new(Some(TrackList::new())),
        }
    }

    /// Cache with no playlist; every read fails with `NotInitialized`
    pub fn uninitialized() -> Self {
        Self {
            list: RwLock::new(None),
        }
    }

    pub async fn len(&self) -> usize {
        self.list.read().await.as_ref().map_or(0, TrackList::len)
    }
}

/// Resolve a node from another graph to the node of `list` carrying the same song
fn resolve(list: &TrackList, node: &TrackNode) -> StoreResult<NodeId> {
    let song_id = node.song().id;
    if !song_id.is_assigned() {
        return Err(StoreError::NullNode);
    }
    if let Some(own) = list.node(node.id()) {
        if own.song().id == song_id {
            return Ok(own.id());
        }
    }
    list.find_by_song(song_id)
        .map(TrackNode::id)
        .ok_or(StoreError::NullNode)
}

#[async_trait]
impl Store for CacheStore {
    async fn add_song(&self, song: Song) -> StoreResult<Song> {
        if !song.id.is_assigned() {
            return Err(StoreError::NullSong);
        }
        let mut guard = self.list.write().await;
        let list = guard.as_mut().ok_or(StoreError::NotInitialized)?;
        list.append(song.clone());
        debug!("Cache: appended song {} ({} songs)", song.id, list.len());
        Ok(song)
    }

    async fn get_playlist(&self) -> StoreResult<TrackList> {
        self.list
            .read()
            .await
            .clone()
            .ok_or(StoreError::NotInitialized)
    }

    async fn set_current(&self, node: &TrackNode) -> StoreResult<()> {
        let mut guard = self.list.write().await;
        let list = guard.as_mut().ok_or(StoreError::NotInitialized)?;
        let id = resolve(list, node)?;
        list.set_current(id)?;
        debug!("Cache: current song -> {}", node.song().id);
        Ok(())
    }

    async fn get_current(&self) -> StoreResult<Option<TrackNode>> {
        let guard = self.list.read().await;
        let list = guard.as_ref().ok_or(StoreError::NotInitialized)?;
        Ok(list.current().cloned())
    }
}
