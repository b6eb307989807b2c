use serde::{Deserialize, Serialize};

use crate::error::BookmarkError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    #[default]
    Default,
    Destructive,
}

/// Transient user-facing notification for the outcome of an intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn bookmark_added() -> Self {
        Self {
            title: "Bookmark added".to_string(),
            description: "Your bookmark has been saved successfully.".to_string(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn bookmark_deleted() -> Self {
        Self {
            title: "Bookmark deleted".to_string(),
            description: "Your bookmark has been removed successfully.".to_string(),
            variant: NoticeVariant::Default,
        }
    }

    /// Names the failure reason
    pub fn failure(err: &BookmarkError) -> Self {
        Self {
            title: "Error".to_string(),
            description: err.to_string(),
            variant: NoticeVariant::Destructive,
        }
    }

    pub fn is_error(&self) -> bool {
        self.variant == NoticeVariant::Destructive
    }
}
