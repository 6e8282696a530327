// Content Handlers
// Create generated posts, schedule them, list the schedule.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        generated_post::{GeneratedPost, GeneratedPostError, NewGeneratedPost},
        scheduled_post::{NewScheduledPost, PostStatus, ScheduledPost},
    },
    utils::trim_optional_field,
};

// Instagram allows at most 30 hashtags per post
const MAX_HASHTAGS: usize = 30;

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    // 2200 is the Instagram caption hard limit
    #[validate(length(min = 1, max = 2200, message = "Caption must be between 1 and 2200 characters"))]
    pub caption: String,

    #[serde(default)]
    pub hashtags: Vec<String>,

    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,

    pub alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePostRequest {
    pub generated_post_id: Uuid,
    /// ISO date, e.g. "2025-06-01"
    pub scheduled_date: String,
    /// "HH:MM" or "HH:MM:SS"
    pub scheduled_time: String,
}

#[derive(Debug, Serialize)]
pub struct PostsResponse<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPostData {
    pub id: Uuid,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub image_url: Option<String>,
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPostData {
    pub id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: String,
    pub instagram_media_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub post: GeneratedPostData,
}

impl From<GeneratedPost> for GeneratedPostData {
    fn from(post: GeneratedPost) -> Self {
        Self {
            id: post.id,
            caption: post.caption,
            hashtags: post.hashtags,
            image_url: post.image_url,
            alt_text: post.alt_text,
            created_at: post.created_at,
        }
    }
}

fn scheduled_post_data(scheduled: ScheduledPost, post: GeneratedPost) -> ScheduledPostData {
    ScheduledPostData {
        id: scheduled.id,
        scheduled_date: scheduled.scheduled_date,
        scheduled_time: scheduled.scheduled_time,
        status: scheduled.status,
        instagram_media_id: scheduled.instagram_media_id,
        published_at: scheduled.published_at,
        error_message: scheduled.error_message,
        post: post.into(),
    }
}

fn posts_error(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": message
        })),
    )
        .into_response()
}

fn parse_caller(auth_user: &AuthenticatedUser) -> Result<Uuid, axum::response::Response> {
    Uuid::parse_str(&auth_user.user_id)
        .map_err(|_| posts_error(StatusCode::UNAUTHORIZED, "Invalid session"))
}

/// "HH:MM" from the scheduler UI, "HH:MM:SS" from API clients
fn parse_schedule_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

// =============================================================================
// POST HANDLERS
// =============================================================================

/// POST /posts - store a generated post
pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreatePostRequest>,
) -> impl IntoResponse {
    let user = match parse_caller(&auth_user) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if let Err(validation_errors) = request.validate() {
        let message: Vec<String> = validation_errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let detail = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{}: {}", field, detail)
                })
            })
            .collect();
        return posts_error(StatusCode::BAD_REQUEST, &message.join(", "));
    }

    if request.hashtags.len() > MAX_HASHTAGS {
        return posts_error(
            StatusCode::BAD_REQUEST,
            "A post can carry at most 30 hashtags",
        );
    }

    let hashtags: Vec<String> = request
        .hashtags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return posts_error(StatusCode::INTERNAL_SERVER_ERROR, "Database connection error");
        },
    };

    let new_post = NewGeneratedPost {
        user_id: user,
        caption: request.caption.trim().to_string(),
        hashtags,
        image_url: trim_optional_field(request.image_url.as_ref()),
        alt_text: trim_optional_field(request.alt_text.as_ref()),
    };

    match GeneratedPost::create(&mut conn, new_post).await {
        Ok(post) => (
            StatusCode::CREATED,
            Json(PostsResponse {
                success: true,
                data: GeneratedPostData::from(post),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to create generated post: {}", e);
            posts_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create post")
        },
    }
}

/// POST /posts/schedule - schedule a generated post for publication
pub async fn schedule_post(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<SchedulePostRequest>,
) -> impl IntoResponse {
    let user = match parse_caller(&auth_user) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let scheduled_date = match NaiveDate::parse_from_str(&request.scheduled_date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            return posts_error(
                StatusCode::BAD_REQUEST,
                "scheduledDate must be an ISO date (YYYY-MM-DD)",
            );
        },
    };

    let scheduled_time = match parse_schedule_time(&request.scheduled_time) {
        Some(time) => time,
        None => {
            return posts_error(
                StatusCode::BAD_REQUEST,
                "scheduledTime must be HH:MM or HH:MM:SS",
            );
        },
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return posts_error(StatusCode::INTERNAL_SERVER_ERROR, "Database connection error");
        },
    };

    // The referenced post must exist and belong to the caller
    let generated = match GeneratedPost::find_for_user(&mut conn, request.generated_post_id, user)
        .await
    {
        Ok(post) => post,
        Err(GeneratedPostError::NotFound) => {
            return posts_error(StatusCode::NOT_FOUND, "Generated post not found");
        },
        Err(e) => {
            tracing::error!("Failed to load generated post: {}", e);
            return posts_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        },
    };

    let new_scheduled = NewScheduledPost {
        user_id: user,
        generated_post_id: generated.id,
        scheduled_date,
        scheduled_time,
        status: PostStatus::Scheduled.as_str().to_string(),
    };

    match ScheduledPost::create(&mut conn, new_scheduled).await {
        Ok(scheduled) => (
            StatusCode::CREATED,
            Json(PostsResponse {
                success: true,
                data: scheduled_post_data(scheduled, generated),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to schedule post: {}", e);
            posts_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to schedule post")
        },
    }
}

/// GET /posts/scheduled - list the caller's scheduled posts with content
pub async fn list_scheduled_posts(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> impl IntoResponse {
    let user = match parse_caller(&auth_user) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return posts_error(StatusCode::INTERNAL_SERVER_ERROR, "Database connection error");
        },
    };

    match ScheduledPost::list_with_posts_for_user(&mut conn, user).await {
        Ok(rows) => {
            let data: Vec<ScheduledPostData> = rows
                .into_iter()
                .map(|(scheduled, post)| scheduled_post_data(scheduled, post))
                .collect();

            (
                StatusCode::OK,
                Json(PostsResponse {
                    success: true,
                    data,
                }),
            )
                .into_response()
        },
        Err(e) => {
            tracing::error!("Failed to list scheduled posts: {}", e);
            posts_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list scheduled posts")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schedule_time_formats() {
        assert_eq!(
            parse_schedule_time("19:30"),
            NaiveTime::from_hms_opt(19, 30, 0)
        );
        assert_eq!(
            parse_schedule_time("08:05:30"),
            NaiveTime::from_hms_opt(8, 5, 30)
        );
        assert_eq!(parse_schedule_time("25:00"), None);
        assert_eq!(parse_schedule_time("noon"), None);
    }

    #[test]
    fn test_create_post_request_camel_case() {
        let request: CreatePostRequest = serde_json::from_str(
            r##"{"caption": "Oi", "hashtags": ["#a"], "imageUrl": "https://cdn.example.com/a.jpg"}"##,
        )
        .unwrap();
        assert_eq!(request.caption, "Oi");
        assert_eq!(request.image_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
    }
}
