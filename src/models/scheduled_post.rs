// Scheduled Post Database Model
// Tracks the intent to publish a generated post, through
// scheduled -> publishing -> published | failed

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::generated_post::GeneratedPost;
use crate::schema::{generated_posts, scheduled_posts};

/// Publication status of a scheduled post.
/// `Publishing` is the in-flight claim state: the orchestrator moves a row
/// here with a conditional update before touching the Graph API, so a post is
/// submitted at most once even under concurrent publish requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostStatus {
    Scheduled,
    Publishing,
    Published,
    Failed,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Scheduled => "scheduled",
            PostStatus::Publishing => "publishing",
            PostStatus::Published => "published",
            PostStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s {
            "scheduled" => Ok(PostStatus::Scheduled),
            "publishing" => Ok(PostStatus::Publishing),
            "published" => Ok(PostStatus::Published),
            "failed" => Ok(PostStatus::Failed),
            _ => Err(format!("Invalid post status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = scheduled_posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScheduledPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub generated_post_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: String,
    pub instagram_media_id: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = scheduled_posts)]
pub struct NewScheduledPost {
    pub user_id: Uuid,
    pub generated_post_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ScheduledPostError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Scheduled post not found")]
    NotFound,
}

impl ScheduledPost {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_post: NewScheduledPost,
    ) -> Result<Self, ScheduledPostError> {
        use crate::schema::scheduled_posts::dsl::*;

        diesel::insert_into(scheduled_posts)
            .values(&new_post)
            .get_result::<ScheduledPost>(conn)
            .await
            .map_err(ScheduledPostError::Database)
    }

    /// Load a scheduled post joined with its content, scoped to the owner
    pub async fn find_with_post_for_user(
        conn: &mut AsyncPgConnection,
        post_id: Uuid,
        owner: Uuid,
    ) -> Result<(Self, GeneratedPost), ScheduledPostError> {
        scheduled_posts::table
            .inner_join(generated_posts::table)
            .filter(scheduled_posts::id.eq(post_id))
            .filter(scheduled_posts::user_id.eq(owner))
            .select((ScheduledPost::as_select(), GeneratedPost::as_select()))
            .first::<(ScheduledPost, GeneratedPost)>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ScheduledPostError::NotFound,
                _ => ScheduledPostError::Database(e),
            })
    }

    /// All scheduled posts for a user, soonest first
    pub async fn list_with_posts_for_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Vec<(Self, GeneratedPost)>, ScheduledPostError> {
        scheduled_posts::table
            .inner_join(generated_posts::table)
            .filter(scheduled_posts::user_id.eq(owner))
            .order((
                scheduled_posts::scheduled_date.asc(),
                scheduled_posts::scheduled_time.asc(),
            ))
            .select((ScheduledPost::as_select(), GeneratedPost::as_select()))
            .load::<(ScheduledPost, GeneratedPost)>(conn)
            .await
            .map_err(ScheduledPostError::Database)
    }

    /// Atomically claim a post for publishing (compare-and-swap on status).
    /// Only `scheduled` and `failed` rows are claimable; `published` rows and
    /// rows another request already moved to `publishing` are not. Returns
    /// true when this caller won the claim.
    pub async fn claim_for_publish(
        conn: &mut AsyncPgConnection,
        post_id: Uuid,
    ) -> Result<bool, ScheduledPostError> {
        use crate::schema::scheduled_posts::dsl::*;

        let claimable = vec![
            PostStatus::Scheduled.as_str(),
            PostStatus::Failed.as_str(),
        ];

        let updated = diesel::update(
            scheduled_posts
                .filter(id.eq(post_id))
                .filter(status.eq_any(claimable)),
        )
        .set((
            status.eq(PostStatus::Publishing.as_str()),
            updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .await
        .map_err(ScheduledPostError::Database)?;

        Ok(updated == 1)
    }

    /// Finish a claimed publish: publishing -> published
    pub async fn mark_published(
        conn: &mut AsyncPgConnection,
        post_id: Uuid,
        media_id: &str,
    ) -> Result<Self, ScheduledPostError> {
        use crate::schema::scheduled_posts::dsl::*;

        let now = Utc::now();
        diesel::update(
            scheduled_posts
                .filter(id.eq(post_id))
                .filter(status.eq(PostStatus::Publishing.as_str())),
        )
        .set((
            status.eq(PostStatus::Published.as_str()),
            instagram_media_id.eq(media_id),
            published_at.eq(now),
            error_message.eq(None::<String>),
            updated_at.eq(now),
        ))
        .get_result::<ScheduledPost>(conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::NotFound => ScheduledPostError::NotFound,
            _ => ScheduledPostError::Database(e),
        })
    }

    /// Record a failed publish attempt: publishing -> failed
    pub async fn mark_failed(
        conn: &mut AsyncPgConnection,
        post_id: Uuid,
        message: &str,
    ) -> Result<(), ScheduledPostError> {
        use crate::schema::scheduled_posts::dsl::*;

        diesel::update(
            scheduled_posts
                .filter(id.eq(post_id))
                .filter(status.eq(PostStatus::Publishing.as_str())),
        )
        .set((
            status.eq(PostStatus::Failed.as_str()),
            error_message.eq(message),
            updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .await
        .map_err(ScheduledPostError::Database)?;

        Ok(())
    }

    pub fn status_enum(&self) -> Result<PostStatus, String> {
        PostStatus::from_string(&self.status)
    }

    pub fn is_published(&self) -> bool {
        matches!(self.status_enum(), Ok(PostStatus::Published))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_status_conversion() {
        assert_eq!(PostStatus::Scheduled.as_str(), "scheduled");
        assert_eq!(PostStatus::Publishing.as_str(), "publishing");
        assert_eq!(PostStatus::Published.as_str(), "published");
        assert_eq!(PostStatus::Failed.as_str(), "failed");

        assert_eq!(
            PostStatus::from_string("scheduled"),
            Ok(PostStatus::Scheduled)
        );
        assert_eq!(
            PostStatus::from_string("publishing"),
            Ok(PostStatus::Publishing)
        );
        assert_eq!(
            PostStatus::from_string("published"),
            Ok(PostStatus::Published)
        );
        assert_eq!(PostStatus::from_string("failed"), Ok(PostStatus::Failed));
        assert!(PostStatus::from_string("draft").is_err());
    }

    #[test]
    fn test_is_published() {
        let now = Utc::now();
        let mut post = ScheduledPost {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            generated_post_id: Uuid::new_v4(),
            scheduled_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            status: "scheduled".to_string(),
            instagram_media_id: None,
            published_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        assert!(!post.is_published());

        post.status = "published".to_string();
        assert!(post.is_published());
    }
}
