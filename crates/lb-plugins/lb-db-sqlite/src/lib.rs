//! # lb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `lb-core` domain models. One pool backs both the identity store and
//! the content store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lb_core::error::{AppError, Result};
use lb_core::models::{Comment, Post, Session, DEFAULT_USER_NAME};
use lb_core::traits::{ContentStore, IdentityStore};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const POST_COLUMNS: &str =
    "post_id, session_id, user_name, post_title, post_content, image_urls, created_at, is_archived";
const COMMENT_COLUMNS: &str = "comment_id, post_id, session_id, user_name, comment_content, \
     parent_comment_id, image_urls, created_at, is_archived";

pub struct SqliteStore {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::persistence(e)
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and applies migrations.
    /// `timeout` bounds both pool acquisition and lock waits.
    pub async fn connect(url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await
            .inspect_err(|e| error!(error = %e, "failed to open database"))
            .map_err(db_err)?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database. The pool is pinned to a single connection
    /// that never expires, since every connection would otherwise see its own
    /// empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_err)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| AppError::persistence(format!("migration failed: {e}")))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// Row mapping helpers

fn decode_urls(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| AppError::persistence(format!("corrupt image_urls: {e}")))
}

fn encode_urls(urls: &[String]) -> Result<String> {
    serde_json::to_string(urls).map_err(AppError::persistence)
}

fn session_from_row(row: &SqliteRow) -> std::result::Result<Session, sqlx::Error> {
    Ok(Session {
        id: row.try_get("session_id")?,
        avatar_url: row.try_get("avatar_url")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let image_urls: String = row.try_get("image_urls").map_err(db_err)?;
    Ok(Post {
        id: row.try_get("post_id").map_err(db_err)?,
        session_id: row.try_get("session_id").map_err(db_err)?,
        user_name: row.try_get("user_name").map_err(db_err)?,
        title: row.try_get("post_title").map_err(db_err)?,
        content: row.try_get("post_content").map_err(db_err)?,
        image_urls: decode_urls(&image_urls)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        is_archived: row.try_get("is_archived").map_err(db_err)?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    let image_urls: String = row.try_get("image_urls").map_err(db_err)?;
    Ok(Comment {
        id: row.try_get("comment_id").map_err(db_err)?,
        post_id: row.try_get("post_id").map_err(db_err)?,
        session_id: row.try_get("session_id").map_err(db_err)?,
        user_name: row.try_get("user_name").map_err(db_err)?,
        content: row.try_get("comment_content").map_err(db_err)?,
        parent_id: row.try_get("parent_comment_id").map_err(db_err)?,
        image_urls: decode_urls(&image_urls)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        is_archived: row.try_get("is_archived").map_err(db_err)?,
    })
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn insert_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (session_id, avatar_url, created_at, expires_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(session.id)
        .bind(&session.avatar_url)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .inspect_err(|e| error!(session_id = %session.id, error = %e, "failed to create session"))
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT session_id, avatar_url, created_at, expires_at FROM sessions \
             WHERE session_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(session_from_row).transpose().map_err(db_err)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn insert_post(&self, post: &Post) -> Result<()> {
        let sql = format!(
            "INSERT INTO posts ({POST_COLUMNS}) \
             VALUES (?, ?, COALESCE(NULLIF(TRIM(?), ''), ?), ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(post.id)
            .bind(post.session_id)
            .bind(&post.user_name)
            .bind(DEFAULT_USER_NAME)
            .bind(&post.title)
            .bind(&post.content)
            .bind(encode_urls(&post.image_urls)?)
            .bind(post.created_at)
            .bind(post.is_archived)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => post_from_row(&row).map(Some),
            None => {
                debug!(post_id = %id, "post not found");
                Ok(None)
            }
        }
    }

    async fn list_posts(&self, archived: bool) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE is_archived = ? ORDER BY created_at DESC"
        );
        sqlx::query(&sql)
            .bind(archived)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(post_from_row)
            .collect()
    }

    async fn rename_post_owner(&self, session_id: Uuid, name: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE posts SET user_name = ? WHERE session_id = ?")
            .bind(name)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        let sql = format!(
            "INSERT INTO comments ({COMMENT_COLUMNS}) \
             VALUES (?, ?, ?, COALESCE(NULLIF(TRIM(?), ''), ?), ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(comment.id)
            .bind(comment.post_id)
            .bind(comment.session_id)
            .bind(&comment.user_name)
            .bind(DEFAULT_USER_NAME)
            .bind(&comment.content)
            .bind(comment.parent_id)
            .bind(encode_urls(&comment.image_urls)?)
            .bind(comment.created_at)
            .bind(comment.is_archived)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE comment_id = ?");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(comment_from_row)
            .transpose()
    }

    async fn list_comments(&self, post_id: Uuid, include_archived: bool) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments \
             WHERE post_id = ? AND (? OR is_archived = 0) \
             ORDER BY created_at ASC"
        );
        sqlx::query(&sql)
            .bind(post_id)
            .bind(include_archived)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(comment_from_row)
            .collect()
    }

    async fn rename_comment_owner(&self, session_id: Uuid, name: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE comments SET user_name = ? WHERE session_id = ?")
            .bind(name)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn latest_comment_time(&self, post_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT created_at FROM comments WHERE post_id = ? AND is_archived = 0 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|r| r.try_get::<DateTime<Utc>, _>("created_at")).transpose().map_err(db_err)
    }

    /// Archives the post and cascades to its comments.
    ///
    /// # Developer Note
    /// Both updates share one transaction; dropping `tx` on an error path
    /// rolls back, so readers never see an archived post with live comments.
    async fn archive_thread(&self, post_id: Uuid) -> Result<Option<u64>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // 1. Flip the post, only if nobody else has
        let flipped =
            sqlx::query("UPDATE posts SET is_archived = 1 WHERE post_id = ? AND is_archived = 0")
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .inspect_err(|e| error!(post_id = %post_id, error = %e, "failed to archive post"))
                .map_err(db_err)?
                .rows_affected();

        if flipped == 0 {
            warn!(post_id = %post_id, "no live post to archive");
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        }

        // 2. Cascade to the thread's comments
        let comments = sqlx::query(
            "UPDATE comments SET is_archived = 1 WHERE post_id = ? AND is_archived = 0",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .inspect_err(|e| error!(post_id = %post_id, error = %e, "failed to archive comments"))
        .map_err(db_err)?
        .rows_affected();

        tx.commit().await.map_err(db_err)?;
        Ok(Some(comments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post_at(created_at: DateTime<Utc>) -> Post {
        Post {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            user_name: String::new(),
            title: "OP".into(),
            content: "first".into(),
            image_urls: vec!["/static/uploads/x/b.png".into(), "/static/uploads/x/a.png".into()],
            created_at,
            is_archived: false,
        }
    }

    fn comment_at(post: &Post, created_at: DateTime<Utc>) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            post_id: post.id,
            session_id: Uuid::new_v4(),
            user_name: "Rick".into(),
            content: "reply".into(),
            parent_id: None,
            image_urls: vec![],
            created_at,
            is_archived: false,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_post() {
        let store = SqliteStore::in_memory().await.unwrap();
        let post = post_at(Utc::now());
        store.insert_post(&post).await.expect("Failed to create post");

        let found = store.find_post(post.id).await.unwrap().unwrap();
        assert_eq!(found.user_name, DEFAULT_USER_NAME);
        assert_eq!(found.image_urls, post.image_urls);
        assert_eq!(found.created_at, post.created_at);
        assert!(store.find_post(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_posts_by_flag_newest_first() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = Utc::now();
        let older = post_at(now - Duration::minutes(3));
        let newer = post_at(now);
        let mut archived = post_at(now);
        archived.is_archived = true;
        for p in [&older, &newer, &archived] {
            store.insert_post(p).await.unwrap();
        }

        let live: Vec<Uuid> = store.list_posts(false).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(live, vec![newer.id, older.id]);
        let gone = store.list_posts(true).await.unwrap();
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].id, archived.id);
    }

    #[tokio::test]
    async fn test_latest_comment_time_ignores_archived() {
        let store = SqliteStore::in_memory().await.unwrap();
        let t = Utc::now() - Duration::hours(1);
        let post = post_at(t);
        store.insert_post(&post).await.unwrap();
        assert_eq!(store.latest_comment_time(post.id).await.unwrap(), None);

        let live = comment_at(&post, t + Duration::minutes(5));
        let mut stale = comment_at(&post, t + Duration::minutes(30));
        stale.is_archived = true;
        store.insert_comment(&live).await.unwrap();
        store.insert_comment(&stale).await.unwrap();

        assert_eq!(store.latest_comment_time(post.id).await.unwrap(), Some(live.created_at));
        assert_eq!(store.list_comments(post.id, false).await.unwrap().len(), 1);
        assert_eq!(store.list_comments(post.id, true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_archive_thread_cascades_once() {
        let store = SqliteStore::in_memory().await.unwrap();
        let post = post_at(Utc::now());
        store.insert_post(&post).await.unwrap();
        let first = comment_at(&post, Utc::now());
        let mut reply = comment_at(&post, Utc::now());
        reply.parent_id = Some(first.id);
        store.insert_comment(&first).await.unwrap();
        store.insert_comment(&reply).await.unwrap();

        assert_eq!(store.archive_thread(post.id).await.unwrap(), Some(2));
        assert!(store.find_post(post.id).await.unwrap().unwrap().is_archived);
        assert!(store.list_comments(post.id, true).await.unwrap().iter().all(|c| c.is_archived));

        assert_eq!(store.archive_thread(post.id).await.unwrap(), None);
        assert_eq!(store.archive_thread(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_archive_thread_rolls_back_when_cascade_fails() {
        let store = SqliteStore::in_memory().await.unwrap();
        let post = post_at(Utc::now());
        store.insert_post(&post).await.unwrap();
        store.insert_comment(&comment_at(&post, Utc::now())).await.unwrap();

        sqlx::query(
            "CREATE TRIGGER fail_cascade BEFORE UPDATE OF is_archived ON comments \
             BEGIN SELECT RAISE(ABORT, 'cascade refused'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = store.archive_thread(post.id).await.unwrap_err();
        assert_eq!(err.kind(), lb_core::ErrorKind::Persistence);
        assert!(!store.find_post(post.id).await.unwrap().unwrap().is_archived);
    }

    #[tokio::test]
    async fn test_rename_owner_counts_rows() {
        let store = SqliteStore::in_memory().await.unwrap();
        let post = post_at(Utc::now());
        store.insert_post(&post).await.unwrap();
        let mut own = comment_at(&post, Utc::now());
        own.session_id = post.session_id;
        store.insert_comment(&own).await.unwrap();
        store.insert_comment(&comment_at(&post, Utc::now())).await.unwrap();

        assert_eq!(store.rename_post_owner(post.session_id, "Morty").await.unwrap(), 1);
        assert_eq!(store.rename_comment_owner(post.session_id, "Morty").await.unwrap(), 1);
        assert_eq!(store.find_comment(own.id).await.unwrap().unwrap().user_name, "Morty");
    }

    #[tokio::test]
    async fn test_delete_expired_sessions_only() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = Utc::now();
        let session = |expires_at| Session {
            id: Uuid::new_v4(),
            avatar_url: "https://avatars.test/1.jpeg".into(),
            created_at: now - Duration::days(7),
            expires_at,
        };
        let expired = session(now - Duration::seconds(1));
        let current = session(now + Duration::days(1));
        store.insert_session(&expired).await.unwrap();
        store.insert_session(&current).await.unwrap();

        assert_eq!(store.delete_expired(now).await.unwrap(), 1);
        assert!(store.find_session(expired.id).await.unwrap().is_none());
        assert_eq!(store.find_session(current.id).await.unwrap(), Some(current));
    }
}
