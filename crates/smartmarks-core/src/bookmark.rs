use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

use crate::error::BookmarkError;

/// Store-assigned bookmark identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(pub Uuid);

impl BookmarkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BookmarkId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for BookmarkId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity-provider subject of a signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A signed-in user as resolved by the auth boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub provider: String,
}

impl User {
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            email: None,
            provider: provider.into(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A saved URL owned by exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    #[serde(rename = "user_id")]
    pub owner: UserId,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Date shown under the title in the list
    pub fn added_on(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// Payload of an add intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
}

impl NewBookmark {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }

    /// Check the fields the store requires: both non-empty.
    pub fn ensure_present(&self) -> Result<(), BookmarkError> {
        if self.url.trim().is_empty() {
            return Err(BookmarkError::InvalidInput("URL is required".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(BookmarkError::InvalidInput("Title is required".to_string()));
        }
        Ok(())
    }

    /// Full client-side validation: present fields and an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), BookmarkError> {
        self.ensure_present()?;

        let parsed = Url::parse(self.url.trim())
            .map_err(|e| BookmarkError::InvalidInput(format!("Invalid URL: {}", e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(BookmarkError::InvalidInput(format!(
                "Unsupported URL scheme: {}",
                other
            ))),
        }
    }
}
