//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Stores report absence as `Ok(None)`; the managers turn it into `NotFound`.

use crate::error::Result;
use crate::models::{Comment, Post, Session};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence contract for anonymous sessions.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn insert_session(&self, session: &Session) -> Result<()>;
    async fn find_session(&self, id: Uuid) -> Result<Option<Session>>;
    /// Deletes every session whose `expires_at` is before `now`; returns how many.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Persistence contract for posts and comments.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    // Post Operations
    /// A blank `user_name` is stored as the default display name.
    async fn insert_post(&self, post: &Post) -> Result<()>;
    async fn find_post(&self, id: Uuid) -> Result<Option<Post>>;
    /// Posts with the given archived flag, newest first.
    async fn list_posts(&self, archived: bool) -> Result<Vec<Post>>;
    async fn rename_post_owner(&self, session_id: Uuid, name: &str) -> Result<u64>;

    // Comment Operations
    async fn insert_comment(&self, comment: &Comment) -> Result<()>;
    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>>;
    /// Comments of a post, oldest first.
    async fn list_comments(&self, post_id: Uuid, include_archived: bool) -> Result<Vec<Comment>>;
    async fn rename_comment_owner(&self, session_id: Uuid, name: &str) -> Result<u64>;
    /// Creation time of the newest non-archived comment, if any.
    async fn latest_comment_time(&self, post_id: Uuid) -> Result<Option<DateTime<Utc>>>;

    /// Flips the post and every one of its comments to archived in one transaction.
    ///
    /// Returns `Some(comments_archived)` on success and `None` when the post
    /// was not live at commit time (missing, or archived by someone else).
    /// On error nothing is changed.
    async fn archive_thread(&self, post_id: Uuid) -> Result<Option<u64>>;
}

/// Image storage under per-thread namespaces.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Saves a post image and returns its public URL.
    async fn upload_post_image(&self, post_id: Uuid, filename: &str, data: Bytes) -> Result<String>;
    /// Saves a comment image beneath its post's namespace and returns its public URL.
    async fn upload_comment_image(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        filename: &str,
        data: Bytes,
    ) -> Result<String>;
}

/// Picks an avatar for a brand new session.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AvatarAssigner: Send + Sync {
    async fn fetch_avatar(&self) -> Result<String>;
}
