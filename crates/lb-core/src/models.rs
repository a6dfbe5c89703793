//! # Domain Models
//!
//! These structs represent the core entities of Leetboard.
//! Identifiers are UUID v4; all timestamps are UTC.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when a visitor never picked one.
pub const DEFAULT_USER_NAME: &str = "Anonymous";

/// Trims a requested display name, falling back to [`DEFAULT_USER_NAME`].
pub fn display_name(raw: &str) -> String {
    match raw.trim() {
        "" => DEFAULT_USER_NAME.to_string(),
        name => name.to_string(),
    }
}

/// An anonymous visitor, identified by the token stored in their cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// The opening post of a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    /// Owning session; attribution only, survives session expiry
    pub session_id: Uuid,
    pub user_name: String,
    pub title: String,
    pub content: String,
    /// Public URLs, in the order the images were supplied
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Flips false -> true exactly once
    pub is_archived: bool,
}

/// A reply inside a thread, optionally nested under another comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub session_id: Uuid,
    pub user_name: String,
    pub content: String,
    /// `None` for a top-level comment
    pub parent_id: Option<Uuid>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Only ever set by the archival cascade of the owning post
    pub is_archived: bool,
}

/// An uploaded image as received from the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub data: Bytes,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

/// Caller-supplied fields for a new thread; ID and timestamp are assigned on creation.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub session_id: Uuid,
    pub user_name: String,
    pub title: String,
    pub content: String,
    pub images: Vec<Attachment>,
}

/// Caller-supplied fields for a new comment.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub post_id: Uuid,
    pub session_id: Uuid,
    pub user_name: String,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub images: Vec<Attachment>,
}
