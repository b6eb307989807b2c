use serde::{Deserialize, Serialize};

use crate::bookmark::{Bookmark, BookmarkId};
use crate::event::ChangeEvent;

/// How pushed inserts treat an id that is already in the sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertPolicy {
    /// Prepend every insert; a redelivered event shows up twice
    #[default]
    Prepend,
    /// Drop inserts whose id is already present
    DedupById,
}

/// Client-local, ordered mirror of the signed-in user's bookmarks.
///
/// Only pushed change events and snapshots mutate the sequence. Add/remove
/// intents never touch it; the synchronizer waits for the feed to report
/// the server-side result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Synchronizer {
    bookmarks: Vec<Bookmark>,
    initialized: bool,
    policy: InsertPolicy,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: InsertPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Replace the sequence wholesale and mark the synchronizer initialized
    pub fn initialize(&mut self, snapshot: Vec<Bookmark>) {
        self.bookmarks = snapshot;
        self.initialized = true;
    }

    /// Put a record at the front of the sequence
    pub fn apply_insert(&mut self, record: Bookmark) {
        if self.policy == InsertPolicy::DedupById && self.contains(record.id) {
            tracing::debug!("Dropping duplicate insert for bookmark {}", record.id);
            return;
        }
        self.bookmarks.insert(0, record);
    }

    /// Replace the first record with the same id, keeping its position.
    /// Returns false and leaves the sequence alone when no record matches.
    pub fn apply_update(&mut self, record: Bookmark) -> bool {
        match self.bookmarks.iter_mut().find(|b| b.id == record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => {
                tracing::debug!("Ignoring update for unknown bookmark {}", record.id);
                false
            }
        }
    }

    /// Remove every record with this id, returning how many were removed
    pub fn apply_remove(&mut self, id: BookmarkId) -> usize {
        let before = self.bookmarks.len();
        self.bookmarks.retain(|b| b.id != id);
        before - self.bookmarks.len()
    }

    pub fn apply(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Insert { new } => self.apply_insert(new),
            ChangeEvent::Update { new } => {
                self.apply_update(new);
            }
            ChangeEvent::Delete { old } => {
                self.apply_remove(old.id);
            }
        }
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn contains(&self, id: BookmarkId) -> bool {
        self.bookmarks.iter().any(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn policy(&self) -> InsertPolicy {
        self.policy
    }
}
