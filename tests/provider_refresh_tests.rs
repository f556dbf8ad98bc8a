// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider token manager tests.
//!
//! These pin the refresh-transparency contract: a fresh stored token is
//! served without any provider call, an expired one triggers exactly one
//! refresh, and simultaneous callers share that single refresh.

mod common;

use common::test_harness;
use std::sync::atomic::Ordering;
use stride_coach::error::AppError;
use uuid::Uuid;

#[tokio::test]
async fn test_fresh_token_needs_no_refresh() {
    let harness = test_harness();
    let user_id = Uuid::new_v4();

    harness
        .state
        .provider_tokens
        .connect(user_id, "auth-code")
        .await
        .unwrap();

    let token = harness
        .state
        .provider_tokens
        .get_valid_access_token(user_id)
        .await
        .unwrap();

    assert_eq!(token, "access-0");
    assert_eq!(harness.provider.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_token_refreshes_exactly_once() {
    let harness = test_harness();
    let user_id = Uuid::new_v4();

    // Store an already-expired grant, then let subsequent grants live.
    harness.provider.grant_ttl_secs.store(-60, Ordering::SeqCst);
    harness
        .state
        .provider_tokens
        .connect(user_id, "auth-code")
        .await
        .unwrap();
    harness.provider.grant_ttl_secs.store(3600, Ordering::SeqCst);

    let token = harness
        .state
        .provider_tokens
        .get_valid_access_token(user_id)
        .await
        .unwrap();

    assert_eq!(token, "access-1");
    assert_eq!(harness.provider.refresh_calls.load(Ordering::SeqCst), 1);

    // The refreshed triple was persisted: the next call serves it directly.
    let again = harness
        .state
        .provider_tokens
        .get_valid_access_token(user_id)
        .await
        .unwrap();
    assert_eq!(again, "access-1");
    assert_eq!(harness.provider.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unconnected_user_is_not_found() {
    let harness = test_harness();

    let result = harness
        .state
        .provider_tokens
        .get_valid_access_token(Uuid::new_v4())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_reconnect_supersedes_old_grant() {
    let harness = test_harness();
    let user_id = Uuid::new_v4();

    harness
        .state
        .provider_tokens
        .connect(user_id, "first-code")
        .await
        .unwrap();
    harness
        .state
        .provider_tokens
        .connect(user_id, "second-code")
        .await
        .unwrap();

    assert_eq!(harness.provider.exchange_calls.load(Ordering::SeqCst), 2);
    // Still exactly one row, still served without a refresh.
    let token = harness
        .state
        .provider_tokens
        .get_valid_access_token(user_id)
        .await
        .unwrap();
    assert_eq!(token, "access-0");
    assert_eq!(harness.provider.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let harness = test_harness();
    let user_id = Uuid::new_v4();

    harness.provider.grant_ttl_secs.store(-60, Ordering::SeqCst);
    harness
        .state
        .provider_tokens
        .connect(user_id, "auth-code")
        .await
        .unwrap();
    harness.provider.grant_ttl_secs.store(3600, Ordering::SeqCst);

    let manager_a = harness.state.provider_tokens.clone();
    let manager_b = harness.state.provider_tokens.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { manager_a.get_valid_access_token(user_id).await }),
        tokio::spawn(async move { manager_b.get_valid_access_token(user_id).await }),
    );

    assert_eq!(a.unwrap().unwrap(), "access-1");
    assert_eq!(b.unwrap().unwrap(), "access-1");
    // The per-user lock single-flights the refresh.
    assert_eq!(harness.provider.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let harness = test_harness();
    let user_id = Uuid::new_v4();

    harness
        .state
        .provider_tokens
        .connect(user_id, "auth-code")
        .await
        .unwrap();

    harness.state.provider_tokens.disconnect(user_id).await.unwrap();
    // A second disconnect finds no row and still succeeds.
    harness.state.provider_tokens.disconnect(user_id).await.unwrap();

    assert!(matches!(
        harness
            .state
            .provider_tokens
            .get_valid_access_token(user_id)
            .await,
        Err(AppError::NotFound(_))
    ));
}
