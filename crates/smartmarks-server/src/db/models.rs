use chrono::{DateTime, Utc};
use smartmarks_core::{Bookmark, BookmarkId, UserId};
use uuid::Uuid;

/// Bookmark database model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookmarkRow {
    pub id: Uuid,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<BookmarkRow> for Bookmark {
    fn from(row: BookmarkRow) -> Self {
        Self {
            id: BookmarkId(row.id),
            owner: UserId::new(row.user_id),
            url: row.url,
            title: row.title,
            created_at: row.created_at,
        }
    }
}
