pub mod bookmark;
pub mod boundary;
pub mod error;
pub mod event;
pub mod notice;
pub mod sync;
pub mod view;

pub use bookmark::{Bookmark, BookmarkId, NewBookmark, User, UserId};
pub use boundary::{
    AuthBoundary, ChangeFeed, MutationBoundary, SignInRedirect, SnapshotSource, Subscription,
};
pub use error::BookmarkError;
pub use event::{ChangeEvent, ChangeKind, DeletedRecord, FeedMessage};
pub use notice::{Notice, NoticeVariant};
pub use sync::{InsertPolicy, Synchronizer};
pub use view::{BookmarkView, Boundaries, Intents, ListState, PumpOutcome, EMPTY_LIST_MESSAGE};
