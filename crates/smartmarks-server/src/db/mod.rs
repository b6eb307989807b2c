pub mod memory;
pub mod models;

use async_trait::async_trait;
use smartmarks_core::{Bookmark, BookmarkId, NewBookmark, UserId};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::AppError;
use models::BookmarkRow;

pub use memory::MemoryBookmarkRepository;

/// Result of a delete scoped to an owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The id exists but belongs to someone else
    NotOwned,
    Missing,
}

/// Bookmark storage, always scoped to one owner
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    /// The owner's bookmarks, newest first
    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Bookmark>, AppError>;

    async fn insert(&self, owner: &UserId, new: &NewBookmark) -> Result<Bookmark, AppError>;

    async fn delete(&self, id: BookmarkId, owner: &UserId) -> Result<DeleteOutcome, AppError>;
}

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl BookmarkRepository for Database {
    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Bookmark>, AppError> {
        let rows = sqlx::query_as::<_, BookmarkRow>(
            r#"SELECT id, user_id, url, title, created_at FROM bookmarks WHERE user_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, owner: &UserId, new: &NewBookmark) -> Result<Bookmark, AppError> {
        let row = sqlx::query_as::<_, BookmarkRow>(
            r#"INSERT INTO bookmarks (user_id, url, title) VALUES ($1, $2, $3) RETURNING id, user_id, url, title, created_at"#,
        )
        .bind(owner.as_str())
        .bind(&new.url)
        .bind(&new.title)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, id: BookmarkId, owner: &UserId) -> Result<DeleteOutcome, AppError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = $1 AND user_id = $2")
            .bind(id.0)
            .bind(owner.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(DeleteOutcome::Deleted);
        }

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM bookmarks WHERE id = $1")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;

        Ok(match existing {
            Some(_) => DeleteOutcome::NotOwned,
            None => DeleteOutcome::Missing,
        })
    }
}
