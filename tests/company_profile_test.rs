// Integration tests for the Instagram credential store
// A successful connect flow performs exactly one upsert; these tests pin the
// one-row-per-user guarantee and the refresh overwrite.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use postpilot_backend_core::models::company_profile::{CompanyProfile, InstagramCredentials};
use serial_test::serial;

mod common;
use common::{create_test_user, try_setup, unique_email};

fn credentials(token: &str, ig_id: &str) -> InstagramCredentials {
    InstagramCredentials {
        access_token: token.to_string(),
        instagram_user_id: ig_id.to_string(),
        facebook_page_id: "1020304050607080".to_string(),
        instagram_username: Some("acme.moda".to_string()),
        token_expires_at: Utc::now() + Duration::seconds(5_184_000),
    }
}

async fn count_profiles(ctx: &common::TestContext, owner: uuid::Uuid) -> i64 {
    use postpilot_backend_core::schema::company_profiles::dsl::*;

    let mut conn = ctx.diesel_pool.get().await.unwrap();
    company_profiles
        .filter(user_id.eq(owner))
        .count()
        .get_result::<i64>(&mut conn)
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn test_upsert_creates_exactly_one_row() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("upsert_once")).await;

    let mut conn = ctx.diesel_pool.get().await.unwrap();
    let profile = CompanyProfile::upsert_instagram_credentials(
        &mut conn,
        user.id,
        credentials("EAAGfirsttokenfirsttokenfirsttokenfirsttokenfirsttoken", "17800000000000001"),
    )
    .await
    .unwrap();
    drop(conn);

    assert!(profile.has_instagram_connection());
    assert_eq!(
        profile.instagram_user_id.as_deref(),
        Some("17800000000000001")
    );
    assert_eq!(count_profiles(&ctx, user.id).await, 1);
}

#[tokio::test]
#[serial]
async fn test_second_upsert_updates_in_place() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("upsert_twice")).await;

    let mut conn = ctx.diesel_pool.get().await.unwrap();
    CompanyProfile::upsert_instagram_credentials(
        &mut conn,
        user.id,
        credentials("EAAGfirsttokenfirsttokenfirsttokenfirsttokenfirsttoken", "17800000000000001"),
    )
    .await
    .unwrap();

    let updated = CompanyProfile::upsert_instagram_credentials(
        &mut conn,
        user.id,
        credentials("EAAGsecondtokensecondtokensecondtokensecondtokensecond", "17800000000000002"),
    )
    .await
    .unwrap();
    drop(conn);

    // Reconnecting replaces credentials instead of adding a row
    assert_eq!(count_profiles(&ctx, user.id).await, 1);
    assert_eq!(
        updated.instagram_access_token.as_deref(),
        Some("EAAGsecondtokensecondtokensecondtokensecondtokensecond")
    );
    assert_eq!(
        updated.instagram_user_id.as_deref(),
        Some("17800000000000002")
    );
}

#[tokio::test]
#[serial]
async fn test_refresh_overwrites_token_and_expiry() {
    let Some(ctx) = try_setup().await else { return };
    let user = create_test_user(&ctx, &unique_email("refresh_overwrite")).await;

    let mut conn = ctx.diesel_pool.get().await.unwrap();
    let original = CompanyProfile::upsert_instagram_credentials(
        &mut conn,
        user.id,
        credentials("EAAGfirsttokenfirsttokenfirsttokenfirsttokenfirsttoken", "17800000000000001"),
    )
    .await
    .unwrap();

    let new_expiry = Utc::now() + Duration::seconds(5_184_000);
    let refreshed = CompanyProfile::update_refreshed_token(
        &mut conn,
        user.id,
        "EAAGrenewedtokenrenewedtokenrenewedtokenrenewedtokenrenew",
        new_expiry,
    )
    .await
    .unwrap();

    assert_eq!(
        refreshed.instagram_access_token.as_deref(),
        Some("EAAGrenewedtokenrenewedtokenrenewedtokenrenewedtokenrenew")
    );
    assert!(refreshed.token_last_refreshed_at.is_some());
    // Identity fields are untouched by a refresh
    assert_eq!(refreshed.instagram_user_id, original.instagram_user_id);
    assert_eq!(refreshed.facebook_page_id, original.facebook_page_id);
}

#[tokio::test]
#[serial]
async fn test_find_expiring_only_matches_connected_profiles_in_window() {
    let Some(ctx) = try_setup().await else { return };
    let expiring_user = create_test_user(&ctx, &unique_email("expiring")).await;
    let healthy_user = create_test_user(&ctx, &unique_email("healthy")).await;

    let mut conn = ctx.diesel_pool.get().await.unwrap();
    let mut soon = credentials("EAAGexpiringtokenexpiringtokenexpiringtokenexpiringtok", "17800000000000003");
    soon.token_expires_at = Utc::now() + Duration::days(2);
    CompanyProfile::upsert_instagram_credentials(&mut conn, expiring_user.id, soon)
        .await
        .unwrap();

    let mut distant = credentials("EAAGhealthytokenhealthytokenhealthytokenhealthytokenhe", "17800000000000004");
    distant.token_expires_at = Utc::now() + Duration::days(55);
    CompanyProfile::upsert_instagram_credentials(&mut conn, healthy_user.id, distant)
        .await
        .unwrap();

    let cutoff = Utc::now() + Duration::days(7);
    let expiring = CompanyProfile::find_expiring(&mut conn, cutoff).await.unwrap();

    assert!(expiring.iter().any(|p| p.user_id == expiring_user.id));
    assert!(!expiring.iter().any(|p| p.user_id == healthy_user.id));
}
