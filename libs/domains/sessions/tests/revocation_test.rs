//! Access-token revocation tests
//!
//! Blacklist entries, revocation fences, and how logout and logout-all feed
//! them through `AuthService::authenticate`.

mod common;

use common::{Harness, PASSWORD};
use domain_sessions::*;
use serde_json::{Map, json};
use std::time::Duration;
use test_utils::TestDataBuilder;

#[tokio::test]
async fn test_issue_and_verify_round_trip() {
    let harness = Harness::new();
    let codec = harness.service.codec();

    for (subject, extra) in [
        ("alice@example.test", json!({})),
        ("bob@example.test", json!({ "role": "ADMIN", "tenant": 7 })),
        ("Ünïcode@example.test", json!({ "scopes": ["a", "b"], "nested": { "x": null } })),
    ] {
        let extra: Map<String, serde_json::Value> = extra.as_object().unwrap().clone();
        let issued = codec.issue(subject, extra.clone()).unwrap();
        let claims = codec.parse_and_verify(&issued.token).unwrap();

        assert_eq!(claims.sub, subject);
        assert_eq!(claims.extra, extra);
    }
}

#[tokio::test]
async fn test_expired_token_always_fails() {
    let harness = Harness::new();
    let codec = harness.service.codec();
    let issued = codec.issue("alice@example.test", Map::new()).unwrap();

    harness.clock.advance(Duration::from_secs(900 + 30));

    assert!(matches!(
        codec.parse_and_verify(&issued.token),
        Err(SessionError::InvalidToken(_))
    ));
    assert!(codec.is_expired(&issued.token));
    assert!(!codec.validate_for_subject(&issued.token, "alice@example.test"));
}

#[tokio::test]
async fn test_blacklist_lasts_through_expiry_leeway() {
    let harness = Harness::new();
    let email = TestDataBuilder::from_test_name("revocation_leeway").email("alice");
    harness.seed_account(&email).await;
    let pair = harness.service.login(&email, PASSWORD, None).await.unwrap();
    let principal = harness.service.authenticate(&pair.access_token).await.unwrap();

    harness
        .service
        .logout(&principal, &pair.access_token, None)
        .await
        .unwrap();

    // Past exp, but still inside the codec's 30 s clock skew.
    harness.clock.advance(Duration::from_secs(900 + 20));
    assert!(harness.service.codec().parse_and_verify(&pair.access_token).is_ok());
    assert!(matches!(
        harness.service.authenticate(&pair.access_token).await,
        Err(SessionError::InvalidToken(detail)) if detail == "token revoked"
    ));

    harness.clock.advance(Duration::from_secs(15));
    assert!(harness.ttl.is_empty().await);
    assert!(harness.service.authenticate(&pair.access_token).await.is_err());
}

#[tokio::test]
async fn test_blacklist_ignores_foreign_tokens() {
    let harness = Harness::new();
    let other = Harness::new();
    let foreign = TokenCodec::new(
        std::sync::Arc::new(SigningKey::from_bytes(&[1u8; 32]).unwrap()),
        TokenConfig::default(),
        std::sync::Arc::new(other.clock.clone()),
    )
    .issue("alice@example.test", Map::new())
    .unwrap();

    harness.service.revocation().blacklist(&foreign.token).await;

    assert!(harness.ttl.is_empty().await);
    assert!(!harness.service.revocation().is_blacklisted(&foreign.token).await);
}

#[tokio::test]
async fn test_fence_scenario() {
    let harness = Harness::new();
    let revocation = harness.service.revocation();
    let t = harness.clock.now().timestamp();

    revocation
        .set_revocation_fence(Some("iss"), "alice", t, Duration::from_secs(60))
        .await;

    assert!(revocation.is_before_fence(Some("iss"), "alice", t - 1).await);
    assert!(!revocation.is_before_fence(Some("iss"), "alice", t + 1).await);

    harness.clock.advance(Duration::from_secs(60));
    assert!(!revocation.is_before_fence(Some("iss"), "alice", t - 1).await);
}

#[tokio::test]
async fn test_logout_revokes_access_and_refresh() {
    let harness = Harness::new();
    let email = TestDataBuilder::from_test_name("logout").email("alice");
    harness.seed_account(&email).await;
    let pair = harness.service.login(&email, PASSWORD, None).await.unwrap();
    let principal = harness.service.authenticate(&pair.access_token).await.unwrap();

    harness
        .service
        .logout(&principal, &pair.access_token, Some(&pair.refresh_token))
        .await
        .unwrap();

    assert!(matches!(
        harness.service.authenticate(&pair.access_token).await,
        Err(SessionError::InvalidToken(_))
    ));
    assert!(matches!(
        harness.service.refresh(&pair.refresh_token, None).await,
        Err(SessionError::InvalidOrExpiredToken)
    ));
}

#[tokio::test]
async fn test_logout_all_fences_every_earlier_token() {
    let harness = Harness::new();
    let email = TestDataBuilder::from_test_name("logout_all").email("alice");
    let account = harness.seed_account(&email).await;

    let laptop = harness.service.login(&email, PASSWORD, Some("laptop")).await.unwrap();
    harness.clock.advance(Duration::from_secs(10));
    let phone = harness.service.login(&email, PASSWORD, Some("phone")).await.unwrap();
    let principal = harness.service.authenticate(&phone.access_token).await.unwrap();

    let revoked = harness.service.logout_all(&principal).await.unwrap();
    assert_eq!(revoked, 2);
    assert_eq!(harness.active_session_count(account.id).await, 0);

    for token in [&laptop.access_token, &phone.access_token] {
        assert!(harness.service.authenticate(token).await.is_err());
    }

    harness.clock.advance(Duration::from_secs(1));
    let fresh = harness.service.login(&email, PASSWORD, None).await.unwrap();
    assert!(harness.service.authenticate(&fresh.access_token).await.is_ok());
}

#[tokio::test]
async fn test_authenticate_rejects_locked_account_after_invalidate() {
    let harness = Harness::new();
    let email = TestDataBuilder::from_test_name("locked_after_login").email("dave");
    let account = harness.seed_account(&email).await;
    let pair = harness.service.login(&email, PASSWORD, None).await.unwrap();
    assert!(harness.service.authenticate(&pair.access_token).await.is_ok());

    harness
        .accounts
        .upsert(Account {
            locked: true,
            ..account
        })
        .await;
    harness.service.accounts().invalidate(&email).await;

    assert!(matches!(
        harness.service.authenticate(&pair.access_token).await,
        Err(SessionError::InvalidToken(_))
    ));
}

#[tokio::test]
async fn test_principal_carries_account_state() {
    let harness = Harness::new();
    let email = TestDataBuilder::from_test_name("principal").email("erin");
    let account = harness.seed_account(&email).await;
    let pair = harness.service.login(&email, PASSWORD, None).await.unwrap();

    let principal = harness.service.authenticate(&pair.access_token).await.unwrap();

    assert_eq!(principal.account_id, account.id);
    assert_eq!(principal.subject, account.email);
    assert_eq!(principal.role, Role::User);
    assert!(principal.verified);
    assert!(principal.token_id.is_some());
    assert_eq!((principal.expires_at - principal.issued_at).num_seconds(), 900);
}
