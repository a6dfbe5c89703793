//! # Content Manager
//!
//! Post and comment creation with validation, read queries, and the
//! archival transition for a single thread.

use crate::archival::{self, ArchivalOutcome};
use chrono::{DateTime, Utc};
use lb_core::{
    display_name, generate_id, AppError, AttachmentStore, Comment, Conflict, ContentStore,
    NewComment, NewPost, Post, Resource, Result, Violation,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct ContentManager {
    store: Arc<dyn ContentStore>,
    attachments: Arc<dyn AttachmentStore>,
}

impl ContentManager {
    pub fn new(store: Arc<dyn ContentStore>, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self { store, attachments }
    }

    /// Creates a thread. Images are uploaded before the post row is written,
    /// so a failed upload leaves no post behind.
    pub async fn create_post(&self, draft: NewPost) -> Result<Post> {
        let id = generate_id()?;
        let created_at = Utc::now();

        if draft.title.trim().is_empty() {
            warn!("rejected post without title");
            return Err(Violation::MissingTitle.into());
        }
        if draft.session_id.is_nil() {
            warn!("rejected post without session");
            return Err(Violation::MissingSession.into());
        }

        let mut image_urls = Vec::with_capacity(draft.images.len());
        for image in draft.images {
            let url = self
                .attachments
                .upload_post_image(id, &image.filename, image.data)
                .await
                .inspect_err(|e| {
                    error!(
                        post_id = %id, filename = %image.filename, error = %e,
                        "post image upload failed"
                    )
                })?;
            image_urls.push(url);
        }

        let post = Post {
            id,
            session_id: draft.session_id,
            user_name: display_name(&draft.user_name),
            title: draft.title,
            content: draft.content,
            image_urls,
            created_at,
            is_archived: false,
        };

        self.store.insert_post(&post).await.inspect_err(|e| {
            error!(post_id = %id, error = %e, "failed to persist post");
        })?;

        info!(post_id = %post.id, images = post.image_urls.len(), "post created");
        Ok(post)
    }

    /// Adds a comment or a reply to a live thread.
    ///
    /// A thread archived between the checks below and the insert still gets
    /// the comment; it stays unarchived under an archived post.
    pub async fn create_comment(&self, draft: NewComment) -> Result<Comment> {
        let id = generate_id()?;
        let created_at = Utc::now();

        let post = self.get_post(draft.post_id).await?;
        if post.is_archived {
            debug!(post_id = %post.id, "rejected comment on archived thread");
            return Err(Conflict::ThreadArchived.into());
        }

        if let Some(parent_id) = draft.parent_id {
            let parent = self
                .store
                .find_comment(parent_id)
                .await?
                .ok_or_else(|| AppError::not_found(Resource::ParentComment, parent_id))?;
            if parent.is_archived {
                return Err(Conflict::ParentArchived.into());
            }
            if parent.post_id != post.id {
                warn!(post_id = %post.id, parent_id = %parent_id, "rejected cross-thread reply");
                return Err(Conflict::CrossThreadReply.into());
            }
        }

        if draft.content.trim().is_empty() && draft.images.is_empty() {
            return Err(Violation::EmptyComment.into());
        }

        // Uploaded files are not removed if a later upload or the insert fails.
        let mut image_urls = Vec::with_capacity(draft.images.len());
        for image in draft.images {
            let url = self
                .attachments
                .upload_comment_image(post.id, id, &image.filename, image.data)
                .await
                .inspect_err(|e| {
                    error!(
                        comment_id = %id, filename = %image.filename, error = %e,
                        "comment image upload failed"
                    )
                })?;
            image_urls.push(url);
        }

        let comment = Comment {
            id,
            post_id: post.id,
            session_id: draft.session_id,
            user_name: display_name(&draft.user_name),
            content: draft.content,
            parent_id: draft.parent_id,
            image_urls,
            created_at,
            is_archived: false,
        };

        self.store.insert_comment(&comment).await.inspect_err(|e| {
            error!(comment_id = %id, post_id = %post.id, error = %e, "failed to persist comment");
        })?;

        info!(comment_id = %comment.id, post_id = %post.id, "comment created");
        Ok(comment)
    }

    /// Lists live (`archived == false`) or archived threads, newest first.
    pub async fn list_posts(&self, archived: bool) -> Result<Vec<Post>> {
        self.store.list_posts(archived).await
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Post> {
        self.store
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Post, id))
    }

    pub async fn get_comment(&self, id: Uuid) -> Result<Comment> {
        self.store
            .find_comment(id)
            .await?
            .ok_or_else(|| AppError::not_found(Resource::Comment, id))
    }

    /// Comments of an existing thread, oldest first. A missing thread is
    /// `NotFound`; a thread without comments is an empty list.
    pub async fn list_comments(
        &self,
        post_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Comment>> {
        let post = self.get_post(post_id).await?;
        self.store.list_comments(post.id, include_archived).await
    }

    /// Runs the archival check for one post as of `now` and, if due,
    /// archives the post and all its comments atomically.
    pub async fn archive_if_due(
        &self,
        post_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ArchivalOutcome> {
        let post = self.get_post(post_id).await?;
        if post.is_archived {
            return Ok(ArchivalOutcome::AlreadyArchived);
        }

        let latest_comment = self.store.latest_comment_time(post.id).await?;
        if !archival::is_due(post.created_at, latest_comment, now) {
            return Ok(ArchivalOutcome::NotDue);
        }

        match self.store.archive_thread(post.id).await? {
            Some(comments) => {
                info!(post_id = %post.id, comments, "thread archived");
                Ok(ArchivalOutcome::Archived { comments })
            }
            // Lost the race to another archiver; the thread is archived either way.
            None => Ok(ArchivalOutcome::AlreadyArchived),
        }
    }
}
