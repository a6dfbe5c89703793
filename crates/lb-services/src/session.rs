//! # Session Manager
//!
//! Anonymous sessions: creation with an external avatar, lookup by cookie
//! token, expiry sweeps, and renaming a visitor across their past content.

use chrono::{DateTime, Duration, Utc};
use lb_core::{
    generate_id, AppError, AvatarAssigner, ContentStore, IdentityStore, Resource, Result, Session,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default lifetime of a session.
pub const SESSION_TTL: Duration = Duration::days(7);

/// A session looked up from a cookie, or freshly created in its place.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: Session,
    /// The caller must issue a new cookie.
    pub is_new: bool,
}

/// Rows relabelled by a rename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub posts: u64,
    pub comments: u64,
}

pub struct SessionManager {
    identities: Arc<dyn IdentityStore>,
    content: Arc<dyn ContentStore>,
    avatars: Arc<dyn AvatarAssigner>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        content: Arc<dyn ContentStore>,
        avatars: Arc<dyn AvatarAssigner>,
    ) -> Self {
        Self {
            identities,
            content,
            avatars,
            ttl: SESSION_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Creates and persists a new session. An avatar failure is returned
    /// as-is; there is no retry.
    pub async fn create_session(&self) -> Result<Session> {
        let id =
            generate_id().inspect_err(|e| error!(error = %e, "failed to generate session ID"))?;

        let avatar_url = self
            .avatars
            .fetch_avatar()
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch random avatar"))?;

        let created_at = Utc::now();
        let session = Session {
            id,
            avatar_url,
            created_at,
            expires_at: created_at + self.ttl,
        };

        self.identities.insert_session(&session).await?;
        info!(session_id = %session.id, "session created");
        Ok(session)
    }

    /// Looks up a session by its cookie token.
    ///
    /// Unparsable tokens, unknown IDs and store failures all come back as
    /// `NotFound(Session)`: the caller's answer to each is a new session.
    /// Expired sessions that have not been swept yet are still returned.
    pub async fn resolve_session(&self, token: &str) -> Result<Session> {
        let not_found = || AppError::not_found(Resource::Session, token);

        let id = Uuid::parse_str(token.trim()).map_err(|_| not_found())?;
        match self.identities.find_session(id).await {
            Ok(Some(session)) => Ok(session),
            Ok(None) => {
                debug!(session_id = %id, "session not found");
                Err(not_found())
            }
            Err(e) => {
                warn!(session_id = %id, error = %e, "session lookup failed");
                Err(not_found())
            }
        }
    }

    /// Resolves the cookie token if there is one, creating a session otherwise.
    pub async fn resolve_or_create(&self, token: Option<&str>) -> Result<ResolvedSession> {
        if let Some(token) = token {
            match self.resolve_session(token).await {
                Ok(session) => return Ok(ResolvedSession { session, is_new: false }),
                Err(AppError::NotFound(..)) => {}
                Err(e) => return Err(e),
            }
        }
        let session = self.create_session().await?;
        Ok(ResolvedSession { session, is_new: true })
    }

    /// Deletes every session that expired before `now`.
    pub async fn expire_sweep(&self, now: DateTime<Utc>) -> Result<u64> {
        let purged = self.identities.delete_expired(now).await?;
        if purged > 0 {
            info!(purged, "expired sessions deleted");
        }
        Ok(purged)
    }

    /// Relabels every post, then every comment, authored by `session_id`.
    ///
    /// A blank name changes nothing. The two updates are independent: if the
    /// second fails the posts keep their new name and the error is returned.
    pub async fn rename_session(&self, session_id: Uuid, new_name: &str) -> Result<RenameReport> {
        let name = new_name.trim();
        if name.is_empty() {
            debug!(session_id = %session_id, "blank name, nothing renamed");
            return Ok(RenameReport::default());
        }

        let posts = self
            .content
            .rename_post_owner(session_id, name)
            .await
            .inspect_err(|e| {
                error!(session_id = %session_id, error = %e, "failed to rename posts")
            })?;
        let comments = self
            .content
            .rename_comment_owner(session_id, name)
            .await
            .inspect_err(|e| {
                error!(
                    session_id = %session_id, posts, error = %e,
                    "renamed posts but not comments"
                )
            })?;

        info!(
            session_id = %session_id, new_name = %name, posts, comments,
            "user name updated for session"
        );
        Ok(RenameReport { posts, comments })
    }
}
