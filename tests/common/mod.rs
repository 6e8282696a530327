// Common test utilities and helper functions
// Shared across all integration test files to avoid duplication

use chrono::{NaiveDate, NaiveTime};
use postpilot_backend_core::{
    db::{create_diesel_pool, DieselDatabaseConfig, DieselPool},
    models::{
        generated_post::{GeneratedPost, NewGeneratedPost},
        scheduled_post::{NewScheduledPost, PostStatus, ScheduledPost},
        user::{NewUser, User},
    },
};
use uuid::Uuid;

/// Environment variables the integration suite needs; tests skip themselves
/// when any is missing (CI without a database)
const REQUIRED_ENV: &[&str] = &[
    "DATABASE_URL",
    "JWT_ACCESS_SECRET",
    "INSTAGRAM_APP_ID",
    "INSTAGRAM_APP_SECRET",
];

pub struct TestContext {
    pub diesel_pool: DieselPool,
}

/// Set up the test database context, or None when the environment is not
/// configured (the test should return early)
pub async fn try_setup() -> Option<TestContext> {
    dotenv::from_filename(".env.test").ok();
    dotenv::dotenv().ok();

    for key in REQUIRED_ENV {
        if std::env::var(key).is_err() {
            eprintln!("Skipping test: {} not configured", key);
            return None;
        }
    }

    let db_config = DieselDatabaseConfig::default();
    let diesel_pool = match create_diesel_pool(db_config).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: failed to create pool: {}", e);
            return None;
        },
    };

    // Make sure the schema exists
    if let Err(e) =
        postpilot_backend_core::migrations::run_all_migrations(&diesel_pool, Default::default())
            .await
    {
        eprintln!("Skipping test: migrations failed: {}", e);
        return None;
    }

    Some(TestContext { diesel_pool })
}

/// Generate a unique email for test isolation
pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, Uuid::new_v4().simple())
}

/// Create a test user row. The password hash is a placeholder; tests that
/// exercise login hash a real password instead.
pub async fn create_test_user(ctx: &TestContext, email: &str) -> User {
    let mut conn = ctx.diesel_pool.get().await.unwrap();

    let new_user = NewUser {
        email: email.to_string(),
        password_hash: "$argon2id$test-placeholder".to_string(),
        full_name: "Test User".to_string(),
        company_name: Some("Acme Moda".to_string()),
    };

    User::create(&mut conn, new_user).await.unwrap()
}

/// Create a generated post with an image for a user
pub async fn create_test_generated_post(ctx: &TestContext, owner: Uuid) -> GeneratedPost {
    let mut conn = ctx.diesel_pool.get().await.unwrap();

    let new_post = NewGeneratedPost {
        user_id: owner,
        caption: "Coleção nova chegando!".to_string(),
        hashtags: vec!["#moda".to_string(), "#lancamento".to_string()],
        image_url: Some("https://cdn.example.com/posts/colecao.jpg".to_string()),
        alt_text: Some("Foto da nova coleção".to_string()),
    };

    GeneratedPost::create(&mut conn, new_post).await.unwrap()
}

/// Schedule a generated post for a user
pub async fn create_test_scheduled_post(
    ctx: &TestContext,
    owner: Uuid,
    generated_post_id: Uuid,
) -> ScheduledPost {
    let mut conn = ctx.diesel_pool.get().await.unwrap();

    let new_scheduled = NewScheduledPost {
        user_id: owner,
        generated_post_id,
        scheduled_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        scheduled_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
        status: PostStatus::Scheduled.as_str().to_string(),
    };

    ScheduledPost::create(&mut conn, new_scheduled).await.unwrap()
}
