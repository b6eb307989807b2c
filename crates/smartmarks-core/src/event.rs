use serde::{Deserialize, Serialize};

use crate::bookmark::{Bookmark, BookmarkId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Identity of a deleted row, as the feed reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: BookmarkId,
}

/// A row-level change pushed by the change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert { new: Bookmark },
    Update { new: Bookmark },
    Delete { old: DeletedRecord },
}

impl ChangeEvent {
    pub fn insert(record: Bookmark) -> Self {
        ChangeEvent::Insert { new: record }
    }

    pub fn update(record: Bookmark) -> Self {
        ChangeEvent::Update { new: record }
    }

    pub fn delete(id: BookmarkId) -> Self {
        ChangeEvent::Delete {
            old: DeletedRecord { id },
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Insert { .. } => ChangeKind::Insert,
            ChangeEvent::Update { .. } => ChangeKind::Update,
            ChangeEvent::Delete { .. } => ChangeKind::Delete,
        }
    }

    /// Id of the affected record
    pub fn record_id(&self) -> BookmarkId {
        match self {
            ChangeEvent::Insert { new } | ChangeEvent::Update { new } => new.id,
            ChangeEvent::Delete { old } => old.id,
        }
    }

    /// Owner of the affected record; delete events only carry the id
    pub fn owner(&self) -> Option<&UserId> {
        match self {
            ChangeEvent::Insert { new } | ChangeEvent::Update { new } => Some(&new.owner),
            ChangeEvent::Delete { .. } => None,
        }
    }
}

/// One item delivered by a change feed subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Change(ChangeEvent),
    /// The subscriber fell behind and `missed` events were dropped
    Gap { missed: u64 },
    /// A frame arrived that could not be decoded
    Malformed { reason: String },
}

impl FeedMessage {
    /// Decode a text frame, turning decode failures into `Malformed`.
    pub fn from_frame(frame: &str) -> Self {
        serde_json::from_str(frame).unwrap_or_else(|e| FeedMessage::Malformed {
            reason: e.to_string(),
        })
    }
}

impl From<ChangeEvent> for FeedMessage {
    fn from(event: ChangeEvent) -> Self {
        FeedMessage::Change(event)
    }
}
