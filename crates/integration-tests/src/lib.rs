//! Shared fixtures for the end-to-end scenarios: a fully wired board over
//! an in-memory SQLite store and a temporary upload directory.

use chrono::{DateTime, Utc};
use lb_core::{MockAvatarAssigner, NewComment, NewPost, Post};
use lb_db_sqlite::SqliteStore;
use lb_services::{ContentManager, SessionManager, Sweeper};
use lb_storage_local::LocalAttachmentStore;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_AVATAR: &str = "https://rickandmortyapi.com/api/character/avatar/1.jpeg";
pub const URL_PREFIX: &str = "/static/uploads";

pub struct Board {
    pub db: Arc<SqliteStore>,
    pub content: Arc<ContentManager>,
    pub sessions: Arc<SessionManager>,
    pub sweeper: Sweeper,
    pub uploads: TempDir,
}

impl Board {
    pub async fn new() -> Self {
        let db = Arc::new(SqliteStore::in_memory().await.expect("in-memory database"));
        let uploads = tempfile::tempdir().expect("upload dir");
        let attachments = Arc::new(LocalAttachmentStore::new(
            uploads.path().to_path_buf(),
            URL_PREFIX.to_string(),
        ));

        let mut avatars = MockAvatarAssigner::new();
        avatars.expect_fetch_avatar().returning(|| Ok(TEST_AVATAR.to_string()));

        let content = Arc::new(ContentManager::new(db.clone(), attachments));
        let sessions = Arc::new(SessionManager::new(db.clone(), db.clone(), Arc::new(avatars)));
        let sweeper = Sweeper::new(content.clone(), sessions.clone());

        Self {
            db,
            content,
            sessions,
            sweeper,
            uploads,
        }
    }

    pub async fn post(&self, session_id: Uuid, title: &str) -> Post {
        self.content
            .create_post(NewPost {
                session_id,
                title: title.to_string(),
                content: format!("{title} body"),
                ..Default::default()
            })
            .await
            .expect("create post")
    }

    pub fn comment(&self, post_id: Uuid, session_id: Uuid, content: &str) -> NewComment {
        NewComment {
            post_id,
            session_id,
            content: content.to_string(),
            ..Default::default()
        }
    }

    /// Moves a post's creation time, standing in for a post made earlier.
    pub async fn backdate_post(&self, post_id: Uuid, created_at: DateTime<Utc>) {
        sqlx::query("UPDATE posts SET created_at = ? WHERE post_id = ?")
            .bind(created_at)
            .bind(post_id)
            .execute(self.db.pool())
            .await
            .expect("backdate post");
    }

    pub async fn is_live(&self, post_id: Uuid) -> bool {
        !self.content.get_post(post_id).await.expect("post exists").is_archived
    }
}
