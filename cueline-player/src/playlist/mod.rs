//! Track list
//!
//! A doubly linked sequence of songs with head, tail and current pointers.
//! Nodes live in an arena keyed by [`NodeId`]; links are ids, never references,
//! so a list can be cloned into an independent snapshot.
//!
//! Invariants held by every public operation:
//! - `head` is `None` iff the list is empty, and then `tail` and `current` are `None`
//! - `current`, when set, names a node reachable from `head`
//! - `tail.next` and `head.prev` are always `None`

use crate::error::{StoreError, StoreResult};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Durable song identifier
///
/// Zero means "not yet assigned by the durable store".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SongId(pub i64);

impl SongId {
    pub const UNASSIGNED: SongId = SongId(0);

    pub fn is_assigned(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for SongId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A song; never mutated once stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub duration: Duration,
}

impl Song {
    /// New song without a durable identifier
    pub fn new(title: impl Into<String>, artist: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: SongId::UNASSIGNED,
            title: title.into(),
            artist: artist.into(),
            duration,
        }
    }

    pub fn with_id(mut self, id: SongId) -> Self {
        self.id = id;
        self
    }
}

/// Arena key of a [`TrackNode`]; never reused within one list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Id carried by nodes that belong to no list
    pub const DETACHED: NodeId = NodeId(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackNode {
    id: NodeId,
    song: Song,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

impl TrackNode {
    /// A node outside any list (used for durable `get_current` results)
    pub fn detached(song: Song) -> Self {
        Self {
            id: NodeId::DETACHED,
            song,
            prev: None,
            next: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    pub fn next(&self) -> Option<NodeId> {
        self.next
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackList {
    nodes: HashMap<NodeId, TrackNode>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    current: Option<NodeId>,
    next_id: u64,
}

impl TrackList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from songs in order; `current` is the first song
    pub fn from_songs(songs: impl IntoIterator<Item = Song>) -> Self {
        let mut list = Self::new();
        for song in songs {
            list.append(song);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append a song at the tail
    ///
    /// `current` moves to the new node only when the list was empty.
    pub fn append(&mut self, song: Song) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);

        let node = TrackNode {
            id,
            song,
            prev: self.tail,
            next: None,
        };

        match self.tail {
            Some(tail) => {
                if let Some(t) = self.nodes.get_mut(&tail) {
                    t.next = Some(id);
                }
            }
            None => {
                self.head = Some(id);
                self.current = Some(id);
            }
        }
        self.tail = Some(id);
        self.nodes.insert(id, node);

        id
    }

    /// Remove the first node carrying `song_id`
    ///
    /// If it was current, `current` moves to its successor (or `None` at the tail).
    pub fn remove_by_id(&mut self, song_id: SongId) -> StoreResult<Song> {
        let id = self
            .find_by_song(song_id)
            .map(|n| n.id)
            .ok_or(StoreError::SongNotFound(song_id.0))?;

        let node = self.unlink(id).ok_or(StoreError::NullNode)?;
        if self.current == Some(id) {
            self.current = node.next;
        }

        Ok(node.song)
    }

    pub fn head(&self) -> Option<&TrackNode> {
        self.head.and_then(|id| self.nodes.get(&id))
    }

    pub fn tail(&self) -> Option<&TrackNode> {
        self.tail.and_then(|id| self.nodes.get(&id))
    }

    pub fn current(&self) -> Option<&TrackNode> {
        self.current.and_then(|id| self.nodes.get(&id))
    }

    /// Point `current` at a node of this list
    pub fn set_current(&mut self, id: NodeId) -> StoreResult<()> {
        if !self.nodes.contains_key(&id) {
            return Err(StoreError::NullNode);
        }
        self.current = Some(id);
        Ok(())
    }

    /// Relink an existing node as the head
    pub fn set_head(&mut self, id: NodeId) -> StoreResult<()> {
        if self.head == Some(id) {
            return Ok(());
        }
        let mut node = self.unlink(id).ok_or(StoreError::NullNode)?;
        node.prev = None;
        node.next = self.head;
        if let Some(old) = self.head.and_then(|h| self.nodes.get_mut(&h)) {
            old.prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Relink an existing node as the tail
    pub fn set_tail(&mut self, id: NodeId) -> StoreResult<()> {
        if self.tail == Some(id) {
            return Ok(());
        }
        let mut node = self.unlink(id).ok_or(StoreError::NullNode)?;
        node.next = None;
        node.prev = self.tail;
        if let Some(old) = self.tail.and_then(|t| self.nodes.get_mut(&t)) {
            old.next = Some(id);
        }
        self.tail = Some(id);
        if self.head.is_none() {
            self.head = Some(id);
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&TrackNode> {
        self.nodes.get(&id)
    }

    pub fn successor(&self, id: NodeId) -> Option<&TrackNode> {
        self.nodes.get(&id)?.next.and_then(|n| self.nodes.get(&n))
    }

    pub fn predecessor(&self, id: NodeId) -> Option<&TrackNode> {
        self.nodes.get(&id)?.prev.and_then(|p| self.nodes.get(&p))
    }

    pub fn find_by_song(&self, song_id: SongId) -> Option<&TrackNode> {
        self.iter().find(|n| n.song.id == song_id)
    }

    /// Nodes from head to tail
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    pub fn songs(&self) -> impl Iterator<Item = &Song> {
        self.iter().map(|n| &n.song)
    }

    /// Detach a node from its neighbours, taking it out of the arena
    ///
    /// Head and tail are fixed up; `current` is left to the caller.
    fn unlink(&mut self, id: NodeId) -> Option<TrackNode> {
        let node = self.nodes.remove(&id)?;

        match node.prev {
            Some(p) => {
                if let Some(prev) = self.nodes.get_mut(&p) {
                    prev.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => {
                if let Some(next) = self.nodes.get_mut(&n) {
                    next.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        Some(node)
    }
}

/// Head-to-tail iterator over a [`TrackList`]
pub struct Iter<'a> {
    list: &'a TrackList,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a TrackNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.nodes.get(&self.cursor?)?;
        self.cursor = node.next;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: i64, title: &str) -> Song {
        Song::new(title, "Test Artist", Duration::from_secs(2)).with_id(SongId(id))
    }

    fn titles(list: &TrackList) -> Vec<String> {
        list.songs().map(|s| s.title.clone()).collect()
    }

    /// Walks both directions and checks every structural invariant
    fn assert_consistent(list: &TrackList) {
        let forward: Vec<NodeId> = list.iter().map(|n| n.id()).collect();
        assert_eq!(forward.len(), list.len(), "every node reachable from head");

        let mut backward = Vec::new();
        let mut cursor = list.tail().map(|n| n.id());
        while let Some(id) = cursor {
            backward.push(id);
            cursor = list.node(id).and_then(|n| n.prev());
        }
        backward.reverse();
        assert_eq!(forward, backward, "prev links mirror next links");

        if list.is_empty() {
            assert!(list.head().is_none() && list.tail().is_none() && list.current().is_none());
        } else {
            assert!(list.head().unwrap().prev().is_none());
            assert!(list.tail().unwrap().next().is_none());
        }
        if let Some(current) = list.current() {
            assert!(forward.contains(&current.id()));
        }
    }

    #[test]
    fn test_empty_list() {
        let list = TrackList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_consistent(&list);
    }

    #[test]
    fn test_append_sets_current_only_when_empty() {
        let mut list = TrackList::new();
        let a = list.append(song(1, "A"));
        list.append(song(2, "B"));
        list.append(song(3, "C"));

        assert_eq!(list.current().unwrap().id(), a);
        assert_eq!(list.head().unwrap().id(), a);
        assert_eq!(list.tail().unwrap().song().title, "C");
        assert_eq!(titles(&list), vec!["A", "B", "C"]);
        assert_consistent(&list);
    }

    #[test]
    fn test_node_ids_are_not_reused() {
        let mut list = TrackList::new();
        let a = list.append(song(1, "A"));
        list.remove_by_id(SongId(1)).unwrap();
        let b = list.append(song(2, "B"));
        assert_ne!(a, b);
        assert!(list.node(a).is_none());
    }

    #[test]
    fn test_remove_current_moves_to_successor() {
        let mut list = TrackList::from_songs([song(1, "A"), song(2, "B"), song(3, "C")]);
        let b = list.find_by_song(SongId(2)).unwrap().id();
        list.set_current(b).unwrap();

        let removed = list.remove_by_id(SongId(2)).unwrap();

        assert_eq!(removed.title, "B");
        assert_eq!(list.current().unwrap().song().title, "C");
        assert_eq!(titles(&list), vec!["A", "C"]);
        let a = list.head().unwrap();
        assert_eq!(list.successor(a.id()).unwrap().song().title, "C");
        assert_consistent(&list);
    }

    #[test]
    fn test_remove_current_tail_clears_current() {
        let mut list = TrackList::from_songs([song(1, "A"), song(2, "B")]);
        let b = list.tail().unwrap().id();
        list.set_current(b).unwrap();

        list.remove_by_id(SongId(2)).unwrap();

        assert!(list.current().is_none());
        assert_eq!(list.tail().unwrap().song().title, "A");
        assert_consistent(&list);
    }

    #[test]
    fn test_remove_head_and_last() {
        let mut list = TrackList::from_songs([song(1, "A"), song(2, "B")]);
        list.remove_by_id(SongId(1)).unwrap();
        assert_eq!(list.head().unwrap().song().title, "B");
        assert_eq!(list.current().unwrap().song().title, "B");
        assert_consistent(&list);

        list.remove_by_id(SongId(2)).unwrap();
        assert!(list.is_empty());
        assert_consistent(&list);
    }

    #[test]
    fn test_remove_unknown_song() {
        let mut list = TrackList::from_songs([song(1, "A")]);
        let err = list.remove_by_id(SongId(9)).unwrap_err();
        assert!(matches!(err, StoreError::SongNotFound(9)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_set_current_rejects_foreign_node() {
        let mut list = TrackList::from_songs([song(1, "A")]);
        let other = TrackList::from_songs([song(1, "A"), song(2, "B")]);
        let foreign = other.tail().unwrap().id();

        assert!(matches!(list.set_current(foreign), Err(StoreError::NullNode)));
        assert!(matches!(list.set_current(NodeId::DETACHED), Err(StoreError::NullNode)));
        assert_eq!(list.current().unwrap().song().title, "A");
    }

    #[test]
    fn test_successor_and_predecessor() {
        let list = TrackList::from_songs([song(1, "A"), song(2, "B"), song(3, "C")]);
        let head = list.head().unwrap().id();
        let tail = list.tail().unwrap().id();

        assert!(list.predecessor(head).is_none());
        assert!(list.successor(tail).is_none());
        assert_eq!(list.successor(head).unwrap().song().title, "B");
        assert_eq!(list.predecessor(tail).unwrap().song().title, "B");
    }

    #[test]
    fn test_set_head_and_tail_relink() {
        let mut list = TrackList::from_songs([song(1, "A"), song(2, "B"), song(3, "C")]);
        let c = list.tail().unwrap().id();
        list.set_head(c).unwrap();
        assert_eq!(titles(&list), vec!["C", "A", "B"]);
        assert_consistent(&list);

        let c = list.head().unwrap().id();
        list.set_tail(c).unwrap();
        assert_eq!(titles(&list), vec!["A", "B", "C"]);
        assert_consistent(&list);

        assert!(matches!(list.set_head(NodeId::DETACHED), Err(StoreError::NullNode)));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut list = TrackList::from_songs([song(1, "A"), song(2, "B")]);
        let snapshot = list.clone();
        list.append(song(3, "C"));
        let b = list.find_by_song(SongId(2)).unwrap().id();
        list.set_current(b).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.current().unwrap().song().title, "A");
    }
}
