// Company Profile Database Model
// Per-user business settings and Instagram credentials (the credential store).
// Instagram fields are mutated only by the connect upsert and the refresh
// routine; partial credentials are never written.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::company_profiles;

/// Company profile - queryable from database
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = company_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CompanyProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub instagram_access_token: Option<String>,
    pub instagram_user_id: Option<String>,
    pub facebook_page_id: Option<String>,
    pub instagram_username: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub token_last_refreshed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full credential set produced by a successful connect flow.
/// Written in a single upsert - there is no partial-write path.
#[derive(Debug, Clone)]
pub struct InstagramCredentials {
    pub access_token: String,
    pub instagram_user_id: String,
    pub facebook_page_id: String,
    pub instagram_username: Option<String>,
    pub token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = company_profiles)]
struct NewCompanyProfile {
    user_id: Uuid,
    instagram_access_token: Option<String>,
    instagram_user_id: Option<String>,
    facebook_page_id: Option<String>,
    instagram_username: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    token_last_refreshed_at: Option<DateTime<Utc>>,
}

/// Errors for company profile operations
#[derive(thiserror::Error, Debug)]
pub enum CompanyProfileError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Company profile not found")]
    NotFound,
}

impl CompanyProfile {
    /// Find the profile for a user, if one exists
    pub async fn find_by_user(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Option<Self>, CompanyProfileError> {
        use crate::schema::company_profiles::dsl::*;

        company_profiles
            .filter(user_id.eq(owner))
            .first::<CompanyProfile>(conn)
            .await
            .optional()
            .map_err(CompanyProfileError::Database)
    }

    /// Insert or update the caller's profile with a complete credential set.
    /// Exactly one row exists per user afterwards (unique index on user_id).
    pub async fn upsert_instagram_credentials(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        credentials: InstagramCredentials,
    ) -> Result<Self, CompanyProfileError> {
        use crate::schema::company_profiles::dsl::*;

        let now = Utc::now();
        let new_row = NewCompanyProfile {
            user_id: owner,
            instagram_access_token: Some(credentials.access_token),
            instagram_user_id: Some(credentials.instagram_user_id),
            facebook_page_id: Some(credentials.facebook_page_id),
            instagram_username: credentials.instagram_username,
            token_expires_at: Some(credentials.token_expires_at),
            token_last_refreshed_at: Some(now),
        };

        diesel::insert_into(company_profiles)
            .values(&new_row)
            .on_conflict(user_id)
            .do_update()
            .set((
                instagram_access_token.eq(excluded(instagram_access_token)),
                instagram_user_id.eq(excluded(instagram_user_id)),
                facebook_page_id.eq(excluded(facebook_page_id)),
                instagram_username.eq(excluded(instagram_username)),
                token_expires_at.eq(excluded(token_expires_at)),
                token_last_refreshed_at.eq(excluded(token_last_refreshed_at)),
                updated_at.eq(now),
            ))
            .get_result::<CompanyProfile>(conn)
            .await
            .map_err(CompanyProfileError::Database)
    }

    /// Overwrite the stored token after a successful refresh exchange
    pub async fn update_refreshed_token(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, CompanyProfileError> {
        use crate::schema::company_profiles::dsl::*;

        let now = Utc::now();
        diesel::update(company_profiles.filter(user_id.eq(owner)))
            .set((
                instagram_access_token.eq(new_token),
                token_expires_at.eq(expires_at),
                token_last_refreshed_at.eq(now),
                updated_at.eq(now),
            ))
            .get_result::<CompanyProfile>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => CompanyProfileError::NotFound,
                _ => CompanyProfileError::Database(e),
            })
    }

    /// Profiles whose token expires before the cutoff, for the proactive
    /// refresh sweep. Only connected profiles qualify.
    pub async fn find_expiring(
        conn: &mut AsyncPgConnection,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Self>, CompanyProfileError> {
        use crate::schema::company_profiles::dsl::*;

        company_profiles
            .filter(instagram_access_token.is_not_null())
            .filter(token_expires_at.is_not_null())
            .filter(token_expires_at.lt(cutoff))
            .order(token_expires_at.asc())
            .load::<CompanyProfile>(conn)
            .await
            .map_err(CompanyProfileError::Database)
    }

    /// Connected means both a token and an Instagram Business Account id
    pub fn has_instagram_connection(&self) -> bool {
        let has_token = self
            .instagram_access_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false);
        let has_ig_id = self
            .instagram_user_id
            .as_deref()
            .map(|i| !i.is_empty())
            .unwrap_or(false);
        has_token && has_ig_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(token: Option<&str>, ig_id: Option<&str>) -> CompanyProfile {
        let now = Utc::now();
        CompanyProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            instagram_access_token: token.map(String::from),
            instagram_user_id: ig_id.map(String::from),
            facebook_page_id: None,
            instagram_username: None,
            token_expires_at: None,
            token_last_refreshed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_has_instagram_connection() {
        assert!(profile_with(Some("EAAGtoken"), Some("17800000000000000"))
            .has_instagram_connection());
        assert!(!profile_with(None, Some("17800000000000000")).has_instagram_connection());
        assert!(!profile_with(Some("EAAGtoken"), None).has_instagram_connection());
        assert!(!profile_with(Some(""), Some("17800000000000000")).has_instagram_connection());
        assert!(!profile_with(None, None).has_instagram_connection());
    }
}
