use std::sync::Arc;

use async_trait::async_trait;
use smartmarks_core::error::Result;
use smartmarks_core::{
    Bookmark, BookmarkError, BookmarkId, ChangeEvent, MutationBoundary, NewBookmark,
    SnapshotSource, User, UserId,
};

use crate::db::{BookmarkRepository, DeleteOutcome};
use crate::realtime::FeedHub;

/// Owner-scoped bookmark operations. Successful mutations are published to
/// the owner's change feed.
pub struct BookmarkService {
    repo: Arc<dyn BookmarkRepository>,
    feed: FeedHub,
}

impl BookmarkService {
    pub fn new(repo: Arc<dyn BookmarkRepository>, feed: FeedHub) -> Self {
        Self { repo, feed }
    }

    pub async fn list(&self, owner: &UserId) -> Result<Vec<Bookmark>> {
        self.repo
            .list_for_owner(owner)
            .await
            .map_err(|e| BookmarkError::Persistence(format!("Failed to load bookmarks: {}", e)))
    }

    pub async fn create(&self, user: Option<&User>, new: NewBookmark) -> Result<Bookmark> {
        let user = user.ok_or_else(|| BookmarkError::unauthenticated("add a bookmark"))?;
        new.ensure_present()?;

        let bookmark = self.repo.insert(&user.id, &new).await.map_err(|e| {
            tracing::error!("Error adding bookmark: {:?}", e);
            BookmarkError::Persistence(format!("Failed to add bookmark: {}", e))
        })?;

        let delivered = self
            .feed
            .publish(&user.id, ChangeEvent::insert(bookmark.clone()));
        tracing::info!(
            "Bookmark {} added for {} ({} live views)",
            bookmark.id,
            user.id,
            delivered
        );
        Ok(bookmark)
    }

    pub async fn remove(&self, user: Option<&User>, id: BookmarkId) -> Result<()> {
        let user = user.ok_or_else(|| BookmarkError::unauthenticated("delete a bookmark"))?;

        let outcome = self.repo.delete(id, &user.id).await.map_err(|e| {
            tracing::error!("Error deleting bookmark: {:?}", e);
            BookmarkError::Persistence(format!("Failed to delete bookmark: {}", e))
        })?;

        match outcome {
            DeleteOutcome::Deleted => {
                self.feed.publish(&user.id, ChangeEvent::delete(id));
                tracing::info!("Bookmark {} deleted for {}", id, user.id);
                Ok(())
            }
            DeleteOutcome::NotOwned => {
                tracing::warn!("{} attempted to delete bookmark {} they do not own", user.id, id);
                Err(BookmarkError::Forbidden)
            }
            DeleteOutcome::Missing => Err(BookmarkError::NotFound),
        }
    }

    /// Mutation boundary bound to one request's user
    pub fn for_user(self: &Arc<Self>, user: Option<User>) -> UserMutations {
        UserMutations {
            service: Arc::clone(self),
            user,
        }
    }
}

#[async_trait]
impl SnapshotSource for BookmarkService {
    async fn snapshot(&self, owner: &UserId) -> Result<Vec<Bookmark>> {
        self.list(owner).await
    }
}

/// The bookmark service with an explicit user context
#[derive(Clone)]
pub struct UserMutations {
    service: Arc<BookmarkService>,
    user: Option<User>,
}

#[async_trait]
impl MutationBoundary for UserMutations {
    async fn create(&self, url: &str, title: &str) -> Result<Bookmark> {
        self.service
            .create(self.user.as_ref(), NewBookmark::new(url, title))
            .await
    }

    async fn remove(&self, id: BookmarkId) -> Result<()> {
        self.service.remove(self.user.as_ref(), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBookmarkRepository;
    use smartmarks_core::{ChangeFeed, FeedMessage};

    fn service() -> (Arc<BookmarkService>, FeedHub) {
        let feed = FeedHub::new(16);
        let repo = Arc::new(MemoryBookmarkRepository::new());
        (Arc::new(BookmarkService::new(repo, feed.clone())), feed)
    }

    #[tokio::test]
    async fn test_create_requires_user() {
        let (service, _) = service();
        let err = service
            .for_user(None)
            .create("https://x.com", "X")
            .await
            .unwrap_err();
        assert_eq!(err, BookmarkError::unauthenticated("add a bookmark"));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let (service, _) = service();
        let user = User::new("alice", "google");
        let err = service
            .for_user(Some(user))
            .create("https://x.com", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, BookmarkError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_publishes_insert() {
        let (service, feed) = service();
        let user = User::new("alice", "google");
        let mut sub = feed.subscribe(&user.id).await.unwrap();

        let created = service
            .for_user(Some(user.clone()))
            .create("https://x.com", "X")
            .await
            .unwrap();

        assert_eq!(created.owner, user.id);
        assert_eq!(
            sub.next().await,
            Some(FeedMessage::Change(ChangeEvent::insert(created)))
        );
    }

    #[tokio::test]
    async fn test_remove_foreign_bookmark_is_forbidden() {
        let (service, feed) = service();
        let alice = User::new("alice", "google");
        let bob = User::new("bob", "google");
        let mark = service
            .for_user(Some(alice.clone()))
            .create("https://x.com", "X")
            .await
            .unwrap();
        let mut alice_sub = feed.subscribe(&alice.id).await.unwrap();

        let err = service.for_user(Some(bob)).remove(mark.id).await.unwrap_err();
        assert_eq!(err, BookmarkError::Forbidden);
        assert_eq!(service.list(&alice.id).await.unwrap(), vec![mark.clone()]);

        service.for_user(Some(alice)).remove(mark.id).await.unwrap();
        assert_eq!(
            alice_sub.next().await,
            Some(FeedMessage::Change(ChangeEvent::delete(mark.id)))
        );
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let (service, _) = service();
        let err = service
            .for_user(Some(User::new("alice", "google")))
            .remove(BookmarkId::new())
            .await
            .unwrap_err();
        assert_eq!(err, BookmarkError::NotFound);
    }

    #[tokio::test]
    async fn test_remove_requires_user() {
        let (service, _) = service();
        let err = service.for_user(None).remove(BookmarkId::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "You must be logged in to delete a bookmark");
    }
}
