//! Anonymous sessions end to end: issuing, resolving, renaming and expiry.

use chrono::{Duration, Utc};
use integration_tests::{Board, TEST_AVATAR};
use lb_core::{AppError, NewPost, Resource, DEFAULT_USER_NAME};
use uuid::Uuid;

#[tokio::test]
async fn new_visitor_gets_a_week_long_session() {
    let board = Board::new().await;

    let resolved = board.sessions.resolve_or_create(None).await.unwrap();
    assert!(resolved.is_new);
    let session = resolved.session;
    assert_eq!(session.avatar_url, TEST_AVATAR);
    assert_eq!(session.expires_at - session.created_at, Duration::days(7));

    let token = session.id.to_string();
    let again = board.sessions.resolve_or_create(Some(&token)).await.unwrap();
    assert!(!again.is_new);
    assert_eq!(again.session, session);

    let stranger = board.sessions.resolve_or_create(Some("not-a-cookie")).await.unwrap();
    assert!(stranger.is_new);
    assert_ne!(stranger.session.id, session.id);
}

#[tokio::test]
async fn rename_relabels_all_past_content() {
    let board = Board::new().await;
    let me = board.sessions.create_session().await.unwrap().id;
    let someone_else = board.sessions.create_session().await.unwrap().id;

    let mine = board.post(me, "my thread").await;
    assert_eq!(mine.user_name, DEFAULT_USER_NAME);
    let theirs = board.post(someone_else, "their thread").await;
    let my_comment = board
        .content
        .create_comment(board.comment(theirs.id, me, "hi"))
        .await
        .unwrap();

    let report = board.sessions.rename_session(me, "Morty").await.unwrap();
    assert_eq!((report.posts, report.comments), (1, 1));

    assert_eq!(board.content.get_post(mine.id).await.unwrap().user_name, "Morty");
    assert_eq!(board.content.get_comment(my_comment.id).await.unwrap().user_name, "Morty");
    assert_eq!(board.content.get_post(theirs.id).await.unwrap().user_name, DEFAULT_USER_NAME);

    // Content created afterwards carries whatever name the caller supplies.
    let next = board
        .content
        .create_post(NewPost {
            session_id: me,
            user_name: "Morty".into(),
            title: "second".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(next.user_name, "Morty");

    // A blank name leaves earlier content alone.
    let report = board.sessions.rename_session(me, "   ").await.unwrap();
    assert_eq!((report.posts, report.comments), (0, 0));
    assert_eq!(board.content.get_post(mine.id).await.unwrap().user_name, "Morty");
    assert_eq!(board.content.get_comment(my_comment.id).await.unwrap().user_name, "Morty");
}

#[tokio::test]
async fn expired_sessions_are_swept() {
    let board = Board::new().await;
    let session = board.sessions.create_session().await.unwrap();
    let token = session.id.to_string();
    let after_expiry = session.expires_at + Duration::seconds(1);

    // Stale but not yet swept: still resolvable.
    assert!(session.is_expired(after_expiry));
    assert_eq!(board.sessions.resolve_session(&token).await.unwrap().id, session.id);

    let report = board.sweeper.sweep(Utc::now()).await;
    assert_eq!(report.sessions_purged, Some(0));

    let report = board.sweeper.sweep(after_expiry).await;
    assert_eq!(report.sessions_purged, Some(1));

    let err = board.sessions.resolve_session(&token).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(Resource::Session, _)));

    let replaced = board.sessions.resolve_or_create(Some(&token)).await.unwrap();
    assert!(replaced.is_new);
}

#[tokio::test]
async fn unknown_session_ids_are_not_found() {
    let board = Board::new().await;
    let err = board
        .sessions
        .resolve_session(&Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(Resource::Session, _)));
}
