//! Live bookmark list: a mounted synchronizer fed by one change-feed
//! subscription, plus the intent handle the add form and list items use.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bookmark::{Bookmark, BookmarkId, NewBookmark, UserId};
use crate::boundary::{ChangeFeed, MutationBoundary, SnapshotSource, Subscription};
use crate::error::Result;
use crate::event::{ChangeEvent, ChangeKind, FeedMessage};
use crate::notice::Notice;
use crate::sync::{InsertPolicy, Synchronizer};

pub const EMPTY_LIST_MESSAGE: &str = "No bookmarks yet. Add your first bookmark to get started!";

/// Collaborators a view is mounted against
#[derive(Clone)]
pub struct Boundaries {
    pub feed: Arc<dyn ChangeFeed>,
    pub mutations: Arc<dyn MutationBoundary>,
    pub snapshots: Arc<dyn SnapshotSource>,
}

/// What a single `pump` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    Applied(ChangeKind),
    /// A feed gap was detected and the sequence was reloaded
    Resnapshotted,
    Ignored,
    Closed,
}

/// What the list should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState<'a> {
    Empty(&'static str),
    Items(&'a [Bookmark]),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between a view and its detached intent handles
#[derive(Debug, Default)]
struct Shared {
    mounted: AtomicBool,
    submitting: AtomicBool,
    deleting: Mutex<Option<BookmarkId>>,
    notices: Mutex<Vec<Notice>>,
}

impl Shared {
    fn notify(&self, notice: Notice) {
        if !self.mounted.load(Ordering::SeqCst) {
            tracing::debug!("View unmounted, dropping notice: {}", notice.title);
            return;
        }
        lock(&self.notices).push(notice);
    }
}

struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct DeleteGuard<'a> {
    slot: &'a Mutex<Option<BookmarkId>>,
    id: BookmarkId,
}

impl Drop for DeleteGuard<'_> {
    fn drop(&mut self) {
        let mut slot = lock(self.slot);
        if *slot == Some(self.id) {
            *slot = None;
        }
    }
}

/// Add/remove intents, forwarded to the mutation boundary.
///
/// Intents never touch the synchronizer; the resulting change arrives
/// through the feed.
#[derive(Clone)]
pub struct Intents {
    mutations: Arc<dyn MutationBoundary>,
    shared: Arc<Shared>,
}

impl Intents {
    /// Validate and forward an add. The values reach the boundary exactly
    /// as entered.
    pub async fn request_add(&self, url: &str, title: &str) -> Result<Bookmark> {
        let new = NewBookmark::new(url, title);
        if let Err(e) = new.validate() {
            self.shared.notify(Notice::failure(&e));
            return Err(e);
        }

        self.shared.submitting.store(true, Ordering::SeqCst);
        let _guard = SubmitGuard(&self.shared.submitting);

        let result = self.mutations.create(url, title).await;
        match &result {
            Ok(bookmark) => {
                tracing::debug!("Add request accepted as {}", bookmark.id);
                self.shared.notify(Notice::bookmark_added());
            }
            Err(e) => self.shared.notify(Notice::failure(e)),
        }
        result
    }

    pub async fn request_remove(&self, id: BookmarkId) -> Result<()> {
        *lock(&self.shared.deleting) = Some(id);
        let _guard = DeleteGuard {
            slot: &self.shared.deleting,
            id,
        };

        let result = self.mutations.remove(id).await;
        match &result {
            Ok(()) => self.shared.notify(Notice::bookmark_deleted()),
            Err(e) => self.shared.notify(Notice::failure(e)),
        }
        result
    }

    /// True while an add request is in flight
    pub fn is_submitting(&self) -> bool {
        self.shared.submitting.load(Ordering::SeqCst)
    }

    /// The bookmark whose delete request is in flight
    pub fn deleting(&self) -> Option<BookmarkId> {
        *lock(&self.shared.deleting)
    }
}

/// A mounted bookmark list for one owner
pub struct BookmarkView {
    owner: UserId,
    sync: Synchronizer,
    subscription: Option<Subscription>,
    snapshots: Arc<dyn SnapshotSource>,
    intents: Intents,
    /// Ids from the last reload; an insert for one of them was already
    /// reflected by the snapshot
    reloaded: HashSet<BookmarkId>,
}

impl BookmarkView {
    /// Subscribe to `owner`'s feed and seed the list.
    ///
    /// With `snapshot == None` the initial list is fetched from the snapshot
    /// source after subscribing.
    pub async fn mount(
        owner: UserId,
        snapshot: Option<Vec<Bookmark>>,
        boundaries: Boundaries,
        policy: InsertPolicy,
    ) -> Result<Self> {
        let subscription = boundaries.feed.subscribe(&owner).await?;
        let snapshot = match snapshot {
            Some(snapshot) => snapshot,
            None => boundaries.snapshots.snapshot(&owner).await?,
        };

        let mut sync = Synchronizer::with_policy(policy);
        sync.initialize(snapshot);

        let shared = Arc::new(Shared::default());
        shared.mounted.store(true, Ordering::SeqCst);

        tracing::info!(
            "Mounted bookmark view for {} with {} bookmarks",
            owner,
            sync.len()
        );

        Ok(Self {
            owner,
            sync,
            subscription: Some(subscription),
            snapshots: boundaries.snapshots,
            intents: Intents {
                mutations: boundaries.mutations,
                shared,
            },
            reloaded: HashSet::new(),
        })
    }

    /// Wait for the next feed message and apply it
    pub async fn pump(&mut self) -> PumpOutcome {
        let Some(subscription) = self.subscription.as_mut() else {
            return PumpOutcome::Closed;
        };

        let message = subscription.next().await;
        match message {
            Some(FeedMessage::Change(ChangeEvent::Insert { new }))
                if self.reloaded.remove(&new.id) =>
            {
                tracing::debug!("Skipping insert for {} already in the reload", new.id);
                PumpOutcome::Ignored
            }
            Some(FeedMessage::Change(event)) => {
                let kind = event.kind();
                tracing::debug!("Applying {:?} for bookmark {}", kind, event.record_id());
                self.sync.apply(event);
                PumpOutcome::Applied(kind)
            }
            Some(FeedMessage::Gap { missed }) => {
                tracing::warn!(
                    "Change feed for {} skipped {} events, reloading",
                    self.owner,
                    missed
                );
                self.resnapshot().await
            }
            Some(FeedMessage::Malformed { reason }) => {
                tracing::warn!("Ignoring malformed change feed frame: {}", reason);
                PumpOutcome::Ignored
            }
            None => {
                tracing::info!("Change feed closed for {}", self.owner);
                if let Some(subscription) = self.subscription.take() {
                    subscription.release();
                }
                PumpOutcome::Closed
            }
        }
    }

    /// Pump until the feed closes
    pub async fn run(&mut self) {
        while self.pump().await != PumpOutcome::Closed {}
    }

    /// Replace the list with a fresh snapshot; on failure the current list
    /// is kept.
    ///
    /// Messages queued before the reload describe changes the snapshot
    /// already contains, so they are discarded first.
    pub async fn resnapshot(&mut self) -> PumpOutcome {
        if let Some(subscription) = self.subscription.as_mut() {
            let dropped = subscription.drain_ready();
            if dropped > 0 {
                tracing::debug!("Discarded {} queued changes before reload", dropped);
            }
        }

        match self.snapshots.snapshot(&self.owner).await {
            Ok(snapshot) => {
                self.reloaded = snapshot.iter().map(|b| b.id).collect();
                self.sync.initialize(snapshot);
                PumpOutcome::Resnapshotted
            }
            Err(e) => {
                tracing::warn!("Failed to reload bookmarks for {}: {}", self.owner, e);
                PumpOutcome::Ignored
            }
        }
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.sync.bookmarks()
    }

    pub fn list_state(&self) -> ListState<'_> {
        if self.sync.is_empty() {
            ListState::Empty(EMPTY_LIST_MESSAGE)
        } else {
            ListState::Items(self.sync.bookmarks())
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.sync.is_initialized()
    }

    /// Whether the feed subscription is still held
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn intents(&self) -> Intents {
        self.intents.clone()
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *lock(&self.intents.shared.notices))
    }

    /// Unmount: release the feed subscription and stop recording notices
    pub fn teardown(self) {
        tracing::info!("Tearing down bookmark view for {}", self.owner);
    }
}

impl Drop for BookmarkView {
    fn drop(&mut self) {
        self.intents.shared.mounted.store(false, Ordering::SeqCst);
        if let Some(subscription) = self.subscription.take() {
            subscription.release();
        }
    }
}
