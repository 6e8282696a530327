// Generated Post Database Model
// Immutable content records referenced (not owned) by scheduled posts

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::generated_posts;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = generated_posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GeneratedPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub image_url: Option<String>,
    pub alt_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = generated_posts)]
pub struct NewGeneratedPost {
    pub user_id: Uuid,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub image_url: Option<String>,
    pub alt_text: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum GeneratedPostError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Generated post not found")]
    NotFound,
}

impl GeneratedPost {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_post: NewGeneratedPost,
    ) -> Result<Self, GeneratedPostError> {
        use crate::schema::generated_posts::dsl::*;

        diesel::insert_into(generated_posts)
            .values(&new_post)
            .get_result::<GeneratedPost>(conn)
            .await
            .map_err(GeneratedPostError::Database)
    }

    /// Find a post owned by the given user
    pub async fn find_for_user(
        conn: &mut AsyncPgConnection,
        post_id: Uuid,
        owner: Uuid,
    ) -> Result<Self, GeneratedPostError> {
        use crate::schema::generated_posts::dsl::*;

        generated_posts
            .filter(id.eq(post_id))
            .filter(user_id.eq(owner))
            .first::<GeneratedPost>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => GeneratedPostError::NotFound,
                _ => GeneratedPostError::Database(e),
            })
    }
}
