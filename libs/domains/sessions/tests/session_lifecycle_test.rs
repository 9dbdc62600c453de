//! Refresh-session lifecycle tests
//!
//! Drive issuance, rotation, the session cap, expiry and purge through the
//! public API with in-memory stores and a manual clock.

mod common;

use common::{Harness, PASSWORD, test_config};
use domain_sessions::*;
use std::sync::Arc;
use std::time::Duration;
use test_utils::TestDataBuilder;
use uuid::Uuid;

#[tokio::test]
async fn test_concurrent_rotation_has_one_winner() {
    let harness = Harness::new();
    let manager = harness.service.sessions();
    let issued = manager.issue(Uuid::new_v4(), Some("phone")).await.unwrap();

    let (a, b) = tokio::join!(
        manager.validate_and_rotate(&issued.raw_token, None),
        manager.validate_and_rotate(&issued.raw_token, None),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(SessionError::InvalidOrExpiredToken)))
    );
}

#[tokio::test]
async fn test_concurrent_rotation_across_tasks() {
    let harness = Harness::new();
    let manager = harness.service.sessions();
    let user = Uuid::new_v4();
    let issued = manager.issue(user, None).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            let raw = issued.raw_token.clone();
            tokio::spawn(async move { manager.validate_and_rotate(&raw, None).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(harness.active_session_count(user).await, 1);
}

#[tokio::test]
async fn test_session_cap_evicts_the_oldest() {
    let harness = Harness::new();
    let manager = harness.service.sessions();
    let user = Uuid::new_v4();

    let mut issued = Vec::new();
    for i in 0..4 {
        issued.push(manager.issue(user, Some(&format!("device-{}", i))).await.unwrap());
        harness.clock.advance(Duration::from_secs(1));
    }

    assert_eq!(harness.active_session_count(user).await, 3);

    let oldest = manager.validate_and_rotate(&issued[0].raw_token, None).await;
    assert!(matches!(oldest, Err(SessionError::InvalidOrExpiredToken)));

    let sessions: Vec<String> = manager
        .active_sessions(user)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.session_id)
        .collect();
    assert_eq!(sessions, vec!["device-3", "device-2", "device-1"]);
}

#[tokio::test]
async fn test_cap_ignores_other_users() {
    let harness = Harness::new();
    let manager = harness.service.sessions();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    for _ in 0..3 {
        manager.issue(alice, None).await.unwrap();
        manager.issue(bob, None).await.unwrap();
    }

    assert_eq!(harness.active_session_count(alice).await, 3);
    assert_eq!(harness.active_session_count(bob).await, 3);
}

#[tokio::test]
async fn test_inactivity_window_expires_the_session() {
    let harness = Harness::with_config(AuthConfig {
        sessions: SessionConfig {
            inactivity_window: Duration::from_secs(1),
            absolute_lifetime: Duration::from_secs(3600),
            ..SessionConfig::default()
        },
        ..test_config()
    });
    let manager = harness.service.sessions();
    let issued = manager.issue(Uuid::new_v4(), None).await.unwrap();

    harness.clock.advance(Duration::from_secs(2));

    let err = manager
        .validate_and_rotate(&issued.raw_token, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_rotation_slides_the_window() {
    let harness = Harness::with_config(AuthConfig {
        sessions: SessionConfig {
            inactivity_window: Duration::from_secs(10),
            ..SessionConfig::default()
        },
        ..test_config()
    });
    let manager = harness.service.sessions();
    let mut current = manager.issue(Uuid::new_v4(), None).await.unwrap();

    for _ in 0..5 {
        harness.clock.advance(Duration::from_secs(8));
        current = manager
            .validate_and_rotate(&current.raw_token, None)
            .await
            .unwrap();
    }

    assert_eq!((current.expires_at - current.issued_at).num_seconds(), 10);
}

#[tokio::test]
async fn test_login_refresh_and_replay() {
    let harness = Harness::new();
    let builder = TestDataBuilder::from_test_name("login_refresh_and_replay");
    let email = builder.email("alice");
    let account = harness.seed_account(&email).await;

    let login = harness
        .service
        .login(&email, PASSWORD, Some("laptop"))
        .await
        .unwrap();
    assert_eq!(login.token_type, "Bearer");
    assert_eq!(login.expires_in, 900);
    assert_eq!(login.session_id, "laptop");
    assert_eq!(login.user.id, account.id);

    harness.clock.advance(Duration::from_secs(5));
    let refreshed = harness
        .service
        .refresh(&login.refresh_token, Some("laptop"))
        .await
        .unwrap();
    assert_ne!(refreshed.refresh_token, login.refresh_token);
    assert_eq!(refreshed.session_id, "laptop");

    let principal = harness
        .service
        .authenticate(&refreshed.access_token)
        .await
        .unwrap();
    assert_eq!(principal.account_id, account.id);

    let replay = harness.service.refresh(&login.refresh_token, None).await;
    assert!(matches!(replay, Err(SessionError::InvalidOrExpiredToken)));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let harness = Harness::new();
    let email = TestDataBuilder::from_test_name("login_failures").email("bob");
    let account = harness.seed_account(&email).await;

    let wrong_password = harness.service.login(&email, "nope", None).await;
    assert!(matches!(wrong_password, Err(SessionError::InvalidCredentials)));

    let unknown = harness
        .service
        .login("ghost@example.test", PASSWORD, None)
        .await;
    assert!(matches!(unknown, Err(SessionError::InvalidCredentials)));

    harness
        .accounts
        .upsert(Account {
            locked: true,
            ..account
        })
        .await;
    harness.service.accounts().invalidate(&email).await;
    let locked = harness.service.login(&email, PASSWORD, None).await;
    assert!(matches!(locked, Err(SessionError::AccountDisabled(_))));
}

#[tokio::test]
async fn test_refresh_for_locked_account_revokes_everything() {
    let harness = Harness::new();
    let email = TestDataBuilder::from_test_name("refresh_locked").email("carol");
    let account = harness.seed_account(&email).await;

    let first = harness.service.login(&email, PASSWORD, None).await.unwrap();
    harness.service.login(&email, PASSWORD, None).await.unwrap();
    assert_eq!(harness.active_session_count(account.id).await, 2);

    harness
        .accounts
        .upsert(Account {
            locked: true,
            ..account.clone()
        })
        .await;

    let err = harness
        .service
        .refresh(&first.refresh_token, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::InvalidOrExpiredToken));
    assert_eq!(harness.active_session_count(account.id).await, 0);
}

#[tokio::test]
async fn test_revoke_all_for_user_session() {
    let harness = Harness::new();
    let manager = harness.service.sessions();
    let user = Uuid::new_v4();
    manager.issue(user, Some("phone")).await.unwrap();
    manager.issue(user, Some("laptop")).await.unwrap();

    assert_eq!(manager.revoke_all_for_user_session(user, " phone ").await.unwrap(), 1);
    assert_eq!(manager.revoke_all_for_user_session(user, "phone").await.unwrap(), 0);
    assert_eq!(manager.revoke_all_for_user_session(user, "").await.unwrap(), 0);
    assert_eq!(harness.active_session_count(user).await, 1);
}

#[tokio::test]
async fn test_purge_removes_expired_and_revoked_rows() {
    let harness = Harness::with_config(AuthConfig {
        sessions: SessionConfig {
            inactivity_window: Duration::from_secs(60),
            ..SessionConfig::default()
        },
        ..test_config()
    });
    let manager = harness.service.sessions();
    let user = Uuid::new_v4();

    let expiring = manager.issue(user, None).await.unwrap();
    let revoked = manager.issue(user, None).await.unwrap();
    manager.revoke_token(&revoked.raw_token).await.unwrap();
    harness.clock.advance(Duration::from_secs(61));
    let live = manager.issue(user, None).await.unwrap();

    let purged = manager.purge_now().await.unwrap();

    assert_eq!(purged, 2);
    let rows = harness.sessions.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].session_id, live.session_id);
    assert_ne!(expiring.session_id, live.session_id);
}

#[tokio::test]
async fn test_purge_job_shares_the_manager() {
    let harness = Harness::new();
    let manager: Arc<SessionManager> = harness.service.sessions();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = spawn_purge_job(manager, Duration::from_secs(3600), async move {
        let _ = rx.await;
    });
    tx.send(()).unwrap();

    handle.await.unwrap();
}
