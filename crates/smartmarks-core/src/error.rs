use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced to whoever initiated a bookmark action
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookmarkError {
    /// No signed-in user; carries the attempted action
    #[error("You must be logged in to {0}")]
    Unauthenticated(String),

    /// The record exists but belongs to another user
    #[error("You do not have permission to modify this bookmark")]
    Forbidden,

    #[error("Bookmark not found")]
    NotFound,

    #[error("{0}")]
    InvalidInput(String),

    /// Store-side failure, message passed through verbatim
    #[error("{0}")]
    Persistence(String),

    #[error("Change feed error: {0}")]
    Feed(String),
}

impl BookmarkError {
    pub fn unauthenticated(action: &str) -> Self {
        BookmarkError::Unauthenticated(action.to_string())
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, BookmarkError::Unauthenticated(_))
    }
}

pub type Result<T> = std::result::Result<T, BookmarkError>;
