//! # Archival decision
//!
//! A thread is LIVE until it has been quiet for long enough, then ARCHIVED
//! forever. Quiet means: no comments and older than [`UNANSWERED_WINDOW`], or
//! newest live comment older than [`ACTIVE_WINDOW`].

use chrono::{DateTime, Duration, Utc};

/// How long a thread without comments stays live.
pub const UNANSWERED_WINDOW: Duration = Duration::minutes(10);

/// How long a thread stays live after its newest comment.
pub const ACTIVE_WINDOW: Duration = Duration::minutes(15);

/// Result of one archival check on one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivalOutcome {
    /// Nothing to do; archival is terminal.
    AlreadyArchived,
    NotDue,
    Archived { comments: u64 },
}

/// Whether a post has been quiet long enough to archive.
///
/// `latest_comment` is the newest non-archived comment, if any. When present
/// the post's own age is irrelevant. Both windows are exclusive: a post is due
/// strictly after the window has elapsed.
pub fn is_due(
    created_at: DateTime<Utc>,
    latest_comment: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match latest_comment {
        None => now - created_at > UNANSWERED_WINDOW,
        Some(last_activity) => now - last_activity > ACTIVE_WINDOW,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(min: i64, sec: i64) -> Duration {
        Duration::minutes(min) + Duration::seconds(sec)
    }

    #[test]
    fn unanswered_thread_boundaries() {
        let t = Utc::now();
        assert!(!is_due(t, None, t + at(9, 59)));
        assert!(!is_due(t, None, t + at(10, 0)));
        assert!(is_due(t, None, t + at(10, 1)));
    }

    #[test]
    fn active_thread_measures_from_latest_comment() {
        let t = Utc::now();
        let comment = t + at(5, 0);
        assert!(!is_due(t, Some(comment), t + at(19, 59)));
        assert!(is_due(t, Some(comment), t + at(20, 1)));
    }

    #[test]
    fn post_age_is_ignored_once_commented() {
        let t = Utc::now();
        // Post is a day old but the comment is fresh.
        let created = t - Duration::days(1);
        assert!(!is_due(created, Some(t), t + at(14, 0)));
    }
}
