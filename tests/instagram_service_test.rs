// Integration tests for the Instagram service preconditions and status.
// The Graph client points at an unroutable address: every asserted failure
// below must fire before any network call is attempted.

use std::time::Duration;

use chrono::Utc;
use postpilot_backend_core::{
    models::company_profile::{CompanyProfile, InstagramCredentials},
    services::{GraphApiClient, InstagramService},
    utils::instagram_errors::InstagramError,
};
use serial_test::serial;
use uuid::Uuid;

mod common;
use common::{
    create_test_generated_post, create_test_scheduled_post, create_test_user, try_setup,
    unique_email, TestContext,
};

/// Service whose Graph client cannot reach anything; reaching the network
/// shows up as a Graph error instead of the expected precondition failure
fn offline_service(ctx: &TestContext) -> InstagramService {
    let graph = GraphApiClient::new(
        "http://127.0.0.1:9".to_string(),
        "v18.0".to_string(),
        "v20.0".to_string(),
        "test-app-id".to_string(),
        "test-app-secret".to_string(),
        Duration::from_secs(1),
    );
    InstagramService::with_graph_client(ctx.diesel_pool.clone(), graph)
}

async fn store_credentials(ctx: &TestContext, owner: Uuid, token: &str) {
    let mut conn = ctx.diesel_pool.get().await.unwrap();
    CompanyProfile::upsert_instagram_credentials(
        &mut conn,
        owner,
        InstagramCredentials {
            access_token: token.to_string(),
            instagram_user_id: "17800000000000000".to_string(),
            facebook_page_id: "1020304050607080".to_string(),
            instagram_username: Some("acme.moda".to_string()),
            token_expires_at: Utc::now() + chrono::Duration::seconds(5_184_000),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
#[serial]
async fn test_publish_without_profile_fails_before_any_graph_call() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("no_profile")).await;
    let post = create_test_generated_post(&ctx, user.id).await;
    let scheduled = create_test_scheduled_post(&ctx, user.id, post.id).await;

    let service = offline_service(&ctx);
    let result = service.publish_scheduled_post(user.id, scheduled.id).await;

    let err = result.unwrap_err();
    assert!(matches!(err, InstagramError::InstagramNotConnected));
    assert!(err
        .user_message()
        .starts_with("Credenciais do Instagram não configuradas"));
}

#[tokio::test]
#[serial]
async fn test_publish_unknown_post_fails_with_not_found() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("no_post")).await;

    let service = offline_service(&ctx);
    let result = service.publish_scheduled_post(user.id, Uuid::new_v4()).await;

    assert!(matches!(
        result,
        Err(InstagramError::ScheduledPostNotFound)
    ));
}

#[tokio::test]
#[serial]
async fn test_publish_rejects_basic_display_token() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("basic_display")).await;
    let post = create_test_generated_post(&ctx, user.id).await;
    let scheduled = create_test_scheduled_post(&ctx, user.id, post.id).await;
    store_credentials(&ctx, user.id, &format!("IGQV{}", "x".repeat(100))).await;

    let service = offline_service(&ctx);
    let result = service.publish_scheduled_post(user.id, scheduled.id).await;

    assert!(matches!(result, Err(InstagramError::WrongTokenType)));
}

#[tokio::test]
#[serial]
async fn test_publish_rejects_malformed_token() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("short_token")).await;
    let post = create_test_generated_post(&ctx, user.id).await;
    let scheduled = create_test_scheduled_post(&ctx, user.id, post.id).await;
    store_credentials(&ctx, user.id, "EAAGshort").await;

    let service = offline_service(&ctx);
    let result = service.publish_scheduled_post(user.id, scheduled.id).await;

    assert!(matches!(result, Err(InstagramError::TokenMalformed)));
}

#[tokio::test]
#[serial]
async fn test_publish_refuses_already_published_post() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("already_published")).await;
    let post = create_test_generated_post(&ctx, user.id).await;
    let scheduled = create_test_scheduled_post(&ctx, user.id, post.id).await;
    store_credentials(&ctx, user.id, &format!("EAAG{}", "b".repeat(120))).await;

    // Simulate a completed earlier publish
    {
        use postpilot_backend_core::models::scheduled_post::ScheduledPost;
        let mut conn = ctx.diesel_pool.get().await.unwrap();
        assert!(ScheduledPost::claim_for_publish(&mut conn, scheduled.id)
            .await
            .unwrap());
        ScheduledPost::mark_published(&mut conn, scheduled.id, "17900001111222233")
            .await
            .unwrap();
    }

    let service = offline_service(&ctx);
    let result = service.publish_scheduled_post(user.id, scheduled.id).await;

    assert!(matches!(result, Err(InstagramError::AlreadyPublished)));
}

#[tokio::test]
#[serial]
async fn test_refresh_without_stored_token_fails() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("no_token_refresh")).await;

    let service = offline_service(&ctx);
    let result = service.refresh_token(user.id).await;

    assert!(matches!(result, Err(InstagramError::TokenMissing)));
}

#[tokio::test]
#[serial]
async fn test_status_is_scoped_to_caller() {
    let Some(ctx) = try_setup().await else { return };
    let connected_user = create_test_user(&ctx, &unique_email("connected")).await;
    let other_user = create_test_user(&ctx, &unique_email("disconnected")).await;
    store_credentials(&ctx, connected_user.id, &format!("EAAG{}", "b".repeat(120))).await;

    let service = offline_service(&ctx);

    // Connected caller sees their own profile; the stored username means no
    // network lookup is needed
    let status = service.connection_status(connected_user.id).await.unwrap();
    assert!(status.connected);
    assert_eq!(status.username.as_deref(), Some("acme.moda"));
    assert_eq!(
        status.instagram_user_id.as_deref(),
        Some("17800000000000000")
    );

    // A different caller never falls back to someone else's profile
    let status = service.connection_status(other_user.id).await.unwrap();
    assert!(!status.connected);
    assert!(status.username.is_none());
    assert!(status.instagram_user_id.is_none());
}
