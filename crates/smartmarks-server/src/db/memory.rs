use async_trait::async_trait;
use chrono::Utc;
use smartmarks_core::{Bookmark, BookmarkId, NewBookmark, UserId};
use tokio::sync::RwLock;

use super::{BookmarkRepository, DeleteOutcome};
use crate::error::AppError;

/// In-process repository used when no database is configured
#[derive(Debug, Default)]
pub struct MemoryBookmarkRepository {
    rows: RwLock<Vec<Bookmark>>,
}

impl MemoryBookmarkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl BookmarkRepository for MemoryBookmarkRepository {
    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Bookmark>, AppError> {
        let rows = self.rows.read().await;
        // Rows are appended in creation order
        Ok(rows.iter().rev().filter(|b| &b.owner == owner).cloned().collect())
    }

    async fn insert(&self, owner: &UserId, new: &NewBookmark) -> Result<Bookmark, AppError> {
        let bookmark = Bookmark {
            id: BookmarkId::new(),
            owner: owner.clone(),
            url: new.url.clone(),
            title: new.title.clone(),
            created_at: Utc::now(),
        };
        self.rows.write().await.push(bookmark.clone());
        Ok(bookmark)
    }

    async fn delete(&self, id: BookmarkId, owner: &UserId) -> Result<DeleteOutcome, AppError> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|b| b.id == id) else {
            return Ok(DeleteOutcome::Missing);
        };
        if &rows[index].owner != owner {
            return Ok(DeleteOutcome::NotOwned);
        }
        rows.remove(index);
        Ok(DeleteOutcome::Deleted)
    }
}
