//! Contracts with the collaborators the view depends on.
//!
//! Each boundary is injected; nothing here reaches for ambient session
//! state. The server crate provides the production implementations.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bookmark::{Bookmark, BookmarkId, User, UserId};
use crate::error::Result;
use crate::event::FeedMessage;

/// Where the browser should go to start a provider sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInRedirect {
    pub provider: String,
    pub location: String,
}

#[async_trait]
pub trait AuthBoundary: Send + Sync {
    /// The signed-in user, if any
    async fn current_user(&self) -> Option<User>;

    async fn sign_in(&self, provider: &str) -> Result<SignInRedirect>;

    async fn sign_out(&self) -> Result<()>;
}

/// Create/delete on behalf of the current user.
///
/// Implementations carry the user context themselves; callers never pass an
/// owner.
#[async_trait]
pub trait MutationBoundary: Send + Sync {
    async fn create(&self, url: &str, title: &str) -> Result<Bookmark>;

    async fn remove(&self, id: BookmarkId) -> Result<()>;
}

/// Fresh, newest-first listing of one user's bookmarks
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, owner: &UserId) -> Result<Vec<Bookmark>>;
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open a live stream of changes to `owner`'s bookmarks
    async fn subscribe(&self, owner: &UserId) -> Result<Subscription>;
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A live change-feed stream scoped to one owner.
///
/// The release hook runs exactly once, on `release()` or on drop, after the
/// underlying stream has been dropped.
pub struct Subscription {
    owner: UserId,
    stream: BoxStream<'static, FeedMessage>,
    release: Option<ReleaseHook>,
    released: bool,
}

impl Subscription {
    pub fn new<S>(owner: UserId, stream: S) -> Self
    where
        S: Stream<Item = FeedMessage> + Send + 'static,
    {
        Self {
            owner,
            stream: stream.boxed(),
            release: None,
            released: false,
        }
    }

    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Next message, or `None` once the feed has closed
    pub async fn next(&mut self) -> Option<FeedMessage> {
        self.stream.next().await
    }

    /// Discard every message that is already queued without waiting for
    /// more. Returns how many were dropped.
    pub fn drain_ready(&mut self) -> usize {
        let mut dropped = 0;
        while let Some(Some(_)) = self.stream.next().now_or_never() {
            dropped += 1;
        }
        dropped
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stream = stream::empty().boxed();
        if let Some(hook) = self.release.take() {
            hook();
        }
        tracing::debug!("Released change feed subscription for {}", self.owner);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("owner", &self.owner)
            .field("released", &self.released)
            .finish()
    }
}
