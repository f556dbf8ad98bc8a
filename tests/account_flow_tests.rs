// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account session lifecycle tests: signup, login, per-device refresh
//! records, refresh validation, logout.

mod common;

use common::test_harness;
use stride_coach::error::AppError;
use uuid::Uuid;

#[tokio::test]
async fn test_signup_rejects_duplicate_email() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    account
        .signup("runner@example.com", "hunter2sufficientlylong", None)
        .await
        .unwrap();

    let result = account
        .signup("runner@example.com", "anotherpassword", None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_login_wrong_password_rejected() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    account
        .signup("runner@example.com", "correct-password", None)
        .await
        .unwrap();

    let result = account.login("runner@example.com", "wrong-password").await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = account.login("nobody@example.com", "whatever").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_login_yields_working_session() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    let profile = account
        .signup("runner@example.com", "correct-password", Some("Jo".to_string()))
        .await
        .unwrap();

    let session = account
        .login("runner@example.com", "correct-password")
        .await
        .unwrap();
    assert_eq!(session.user.id, profile.id);

    // The access token works on the token-login path.
    let (user, connected) = account.login_token(&session.access_token).await.unwrap();
    assert_eq!(user.id, profile.id);
    assert!(connected.is_empty());

    // The refresh credential mints a fresh access token for this device.
    let refreshed = account
        .refresh(&session.refresh_token, session.device_id)
        .await
        .unwrap();
    assert_eq!(refreshed.user.id, profile.id);
    account.login_token(&refreshed.access_token).await.unwrap();
}

#[tokio::test]
async fn test_two_devices_are_independent_sessions() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    account
        .signup("runner@example.com", "correct-password", None)
        .await
        .unwrap();

    let device_a = account
        .login("runner@example.com", "correct-password")
        .await
        .unwrap();
    let device_b = account
        .login("runner@example.com", "correct-password")
        .await
        .unwrap();
    assert_ne!(device_a.device_id, device_b.device_id);

    // Both sessions refresh independently.
    account
        .refresh(&device_a.refresh_token, device_a.device_id)
        .await
        .unwrap();
    account
        .refresh(&device_b.refresh_token, device_b.device_id)
        .await
        .unwrap();

    // Logging out device A revokes only device A.
    account
        .logout(device_a.user.id, device_a.device_id)
        .await
        .unwrap();

    assert!(matches!(
        account
            .refresh(&device_a.refresh_token, device_a.device_id)
            .await,
        Err(AppError::TokenInvalid)
    ));
    account
        .refresh(&device_b.refresh_token, device_b.device_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_refresh_with_wrong_device_rejected() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    account
        .signup("runner@example.com", "correct-password", None)
        .await
        .unwrap();
    let session = account
        .login("runner@example.com", "correct-password")
        .await
        .unwrap();

    let result = account.refresh(&session.refresh_token, Uuid::new_v4()).await;
    assert!(matches!(result, Err(AppError::TokenInvalid)));
}

#[tokio::test]
async fn test_refresh_with_garbage_credential_rejected() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    account
        .signup("runner@example.com", "correct-password", None)
        .await
        .unwrap();
    let session = account
        .login("runner@example.com", "correct-password")
        .await
        .unwrap();

    // Not vault ciphertext at all.
    let result = account.refresh("garbage", session.device_id).await;
    assert!(matches!(result, Err(AppError::TokenInvalid)));
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    account
        .signup("runner@example.com", "correct-password", None)
        .await
        .unwrap();
    let session = account
        .login("runner@example.com", "correct-password")
        .await
        .unwrap();

    account
        .logout(session.user.id, session.device_id)
        .await
        .unwrap();
    // Second logout of the same device: no row, no error.
    account
        .logout(session.user.id, session.device_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_provider_login_creates_account_once() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    let first = account
        .provider_login("social@example.com", "google", Some("So".to_string()))
        .await
        .unwrap();
    let second = account
        .provider_login("social@example.com", "google", None)
        .await
        .unwrap();

    assert_eq!(first.user.id, second.user.id);
    assert_eq!(first.user.provider, "google");

    // Password login is impossible for a provider account.
    let result = account.login("social@example.com", "anything").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_connected_list_reflects_provider_link() {
    let harness = test_harness();
    let account = &harness.state.account_service;

    account
        .signup("runner@example.com", "correct-password", None)
        .await
        .unwrap();
    let session = account
        .login("runner@example.com", "correct-password")
        .await
        .unwrap();
    assert!(session.connected.is_empty());

    harness
        .state
        .provider_tokens
        .connect(session.user.id, "auth-code")
        .await
        .unwrap();

    let session = account
        .login("runner@example.com", "correct-password")
        .await
        .unwrap();
    assert_eq!(session.connected, vec!["strava".to_string()]);
}
